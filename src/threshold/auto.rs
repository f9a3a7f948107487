use std::time::{Duration, Instant};

use crate::foundation::core::DepthRange;
use crate::frame::buffers::DepthBuffer;
use crate::threshold::estimate::{
    ThresholdBounds, ThresholdMethod, derive_near_threshold, estimate_far_threshold_with,
};

/// Throttled automatic near/far threshold selection.
#[derive(Clone, Debug)]
pub struct AutoThreshold {
    method: ThresholdMethod,
    bounds: ThresholdBounds,
    near_offset: u16,
    interval: Duration,
    last: Option<Instant>,
}

impl AutoThreshold {
    /// Create a throttle that re-estimates at most once per `interval`.
    pub fn new(
        method: ThresholdMethod,
        bounds: ThresholdBounds,
        near_offset: u16,
        interval: Duration,
    ) -> Self {
        Self {
            method,
            bounds,
            near_offset,
            interval,
            last: None,
        }
    }

    /// Heuristic in use.
    pub fn method(&self) -> ThresholdMethod {
        self.method
    }

    /// Re-estimate from `depth` if at least one interval has passed since the last estimate.
    pub fn observe(&mut self, now: Instant, depth: &DepthBuffer) -> Option<DepthRange> {
        if let Some(last) = self.last
            && now.saturating_duration_since(last) < self.interval
        {
            return None;
        }
        self.last = Some(now);
        let far = estimate_far_threshold_with(depth, self.bounds, self.method);
        let near = derive_near_threshold(far, self.near_offset);
        tracing::debug!(near, far, "auto threshold updated");
        Some(DepthRange::new(near, far))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/threshold/auto.rs"]
mod tests;
