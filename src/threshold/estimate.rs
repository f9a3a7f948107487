use serde::{Deserialize, Serialize};

use crate::foundation::error::{HoldframeError, HoldframeResult};
use crate::frame::buffers::DepthBuffer;

/// Heuristic used to pick the far threshold.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdMethod {
    /// Largest sample.
    Max,
    /// Most frequent non-zero sample.
    Mode,
    /// 3x3 mean at the buffer center.
    #[default]
    SmoothedCenter,
}

/// Allowed far-threshold window, inclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ThresholdBounds {
    min: u16,
    max: u16,
}

impl ThresholdBounds {
    /// Create bounds; `min > max` is rejected.
    pub fn new(min: u16, max: u16) -> HoldframeResult<Self> {
        if min > max {
            return Err(HoldframeError::invalid_geometry(format!(
                "threshold bounds are inverted: min {min} > max {max}"
            )));
        }
        Ok(Self { min, max })
    }

    /// Lower bound.
    pub fn min(self) -> u16 {
        self.min
    }

    /// Upper bound.
    pub fn max(self) -> u16 {
        self.max
    }

    /// Clamp `v` into the window.
    pub fn clamp(self, v: u16) -> u16 {
        v.clamp(self.min, self.max)
    }
}

/// All three heuristic values for one depth buffer, unclamped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ThresholdEstimate {
    /// Result of [`depth_max`].
    pub max: u16,
    /// Result of [`depth_mode`].
    pub mode: u16,
    /// Result of [`smoothed_center`].
    pub smoothed_center: u16,
}

impl ThresholdEstimate {
    /// Compute every heuristic over `depth`.
    pub fn compute(depth: &DepthBuffer) -> Self {
        Self {
            max: depth_max(depth.samples()),
            mode: depth_mode(depth.samples()),
            smoothed_center: smoothed_center(depth),
        }
    }

    /// Value selected by `method`.
    pub fn select(&self, method: ThresholdMethod) -> u16 {
        match method {
            ThresholdMethod::Max => self.max,
            ThresholdMethod::Mode => self.mode,
            ThresholdMethod::SmoothedCenter => self.smoothed_center,
        }
    }
}

/// Largest sample; 0 for an empty slice.
pub fn depth_max(samples: &[u16]) -> u16 {
    samples.iter().copied().max().unwrap_or(0)
}

/// Most frequent non-zero sample, 0 when every sample is zero.
///
/// Ties go to the value that first reached the winning count in a left-to-right scan.
pub fn depth_mode(samples: &[u16]) -> u16 {
    let mut counts = vec![0u32; usize::from(u16::MAX) + 1];
    let mut best = 0u16;
    let mut best_count = 0u32;
    for &s in samples {
        if s == 0 {
            continue;
        }
        let c = &mut counts[usize::from(s)];
        *c += 1;
        if *c > best_count {
            best_count = *c;
            best = s;
        }
    }
    best
}

/// 3x3 mean (weights 1/9, zero padding) sampled at `(W/2, H/2)`, rounded to nearest.
pub fn smoothed_center(depth: &DepthBuffer) -> u16 {
    let size = depth.size();
    let cx = (size.width / 2) as i32;
    let cy = (size.height / 2) as i32;
    let mut sum = 0u32;
    for dy in -1..=1 {
        for dx in -1..=1 {
            sum += u32::from(depth.get(cx + dx, cy + dy).unwrap_or(0));
        }
    }
    // sum / 9 never lands on .5, so adding 4 rounds to nearest.
    ((sum + 4) / 9) as u16
}

/// Far threshold from the smoothed-center heuristic, clamped to `bounds`.
///
/// The max and mode heuristics are computed too and logged at trace level.
#[tracing::instrument(level = "debug", skip(depth), fields(size = %depth.size()))]
pub fn estimate_far_threshold(depth: &DepthBuffer, bounds: ThresholdBounds) -> u16 {
    estimate_far_threshold_with(depth, bounds, ThresholdMethod::SmoothedCenter)
}

/// Far threshold from `method`, clamped to `bounds`.
pub fn estimate_far_threshold_with(
    depth: &DepthBuffer,
    bounds: ThresholdBounds,
    method: ThresholdMethod,
) -> u16 {
    let estimate = ThresholdEstimate::compute(depth);
    tracing::trace!(?estimate, ?method, "depth threshold heuristics");
    bounds.clamp(estimate.select(method))
}

/// Near threshold `offset` below `far`, saturating at 0.
pub fn derive_near_threshold(far: u16, offset: u16) -> u16 {
    far.saturating_sub(offset)
}

#[cfg(test)]
#[path = "../../tests/unit/threshold/estimate.rs"]
mod tests;
