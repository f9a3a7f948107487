use std::time::Instant;

use crate::filter::backend::{BackendKind, CompositingBackend};
use crate::filter::cpu::SequentialBackend;
use crate::filter::halo::{HaloOffsets, MAX_HALO_SIZE, generate_halo};
use crate::filter::rule::CompositeInputs;
use crate::foundation::core::DepthRange;
use crate::foundation::error::{HoldframeError, HoldframeResult};
use crate::frame::buffers::{DepthBuffer, DepthToColorMap, PixelBuffer};

/// Per-call filter parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FilterParams {
    /// Accepted depth window, inclusive.
    pub range: DepthRange,
    /// Halo size passed to [`generate_halo`]. Values above [`MAX_HALO_SIZE`] are rejected by
    /// [`CompositingFilterEngine::filter`].
    pub halo_size: i32,
}

impl FilterParams {
    /// Build parameters from near/far thresholds.
    pub fn new(near: u16, far: u16, halo_size: i32) -> Self {
        Self {
            range: DepthRange::new(near, far),
            halo_size,
        }
    }
}

/// Held-frame state of a [`CompositingFilterEngine`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum FilterState {
    /// The next `filter` call adopts its live frame as the held frame.
    #[default]
    Uninitialized,
    /// The most recent composite (or an explicit seed).
    Seeded(PixelBuffer),
}

/// Depth-gated last-frame-hold filter.
///
/// Each call shows live pixels whose depth neighbourhood is inside the accepted range and
/// falls back to the held frame everywhere else; the output then becomes the new held frame.
pub struct CompositingFilterEngine {
    backend: Box<dyn CompositingBackend>,
    state: FilterState,
    halo: HaloOffsets,
}

impl std::fmt::Debug for CompositingFilterEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositingFilterEngine")
            .field("backend", &self.backend.kind())
            .field("seeded", &matches!(self.state, FilterState::Seeded(_)))
            .field("halo_size", &self.halo.halo_size())
            .finish()
    }
}

impl Default for CompositingFilterEngine {
    fn default() -> Self {
        Self::new(Box::new(SequentialBackend::new()))
    }
}

impl CompositingFilterEngine {
    /// Create an engine in the `Uninitialized` state.
    pub fn new(backend: Box<dyn CompositingBackend>) -> Self {
        Self {
            backend,
            state: FilterState::Uninitialized,
            halo: generate_halo(0),
        }
    }

    /// Backend this engine dispatches to.
    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind()
    }

    /// Current state.
    pub fn state(&self) -> &FilterState {
        &self.state
    }

    /// The held frame, if seeded.
    pub fn held_frame(&self) -> Option<&PixelBuffer> {
        match &self.state {
            FilterState::Uninitialized => None,
            FilterState::Seeded(held) => Some(held),
        }
    }

    /// Forget the held frame; the next live frame seeds it.
    pub fn reset(&mut self) {
        self.state = FilterState::Uninitialized;
    }

    /// Replace the held frame with `seed`.
    pub fn reset_with(&mut self, seed: PixelBuffer) {
        self.state = FilterState::Seeded(seed);
    }

    /// Composite `color` over the held frame and return the result.
    ///
    /// On error the held frame is left untouched. A `halo_size` above [`MAX_HALO_SIZE`] is an
    /// [`HoldframeError::InvalidGeometry`].
    pub fn filter(
        &mut self,
        color: &PixelBuffer,
        depth: &DepthBuffer,
        map: &DepthToColorMap,
        params: FilterParams,
    ) -> HoldframeResult<PixelBuffer> {
        if params.halo_size > MAX_HALO_SIZE {
            return Err(HoldframeError::invalid_geometry(format!(
                "halo size {} exceeds {MAX_HALO_SIZE}",
                params.halo_size
            )));
        }
        if self.halo.halo_size() != params.halo_size {
            self.halo = generate_halo(params.halo_size);
        }

        let started = Instant::now();
        let out = {
            let held = match &self.state {
                FilterState::Seeded(held) => held,
                FilterState::Uninitialized => color,
            };
            if held.size() != color.size() {
                return Err(HoldframeError::invalid_geometry(format!(
                    "held frame is {}, live frame is {}",
                    held.size(),
                    color.size()
                )));
            }
            let inputs = CompositeInputs {
                live: color,
                held,
                depth,
                map,
                halo: self.halo.as_slice(),
                range: params.range,
            };
            inputs.validate()?;
            self.backend.composite(&inputs)?
        };

        tracing::debug!(
            backend = %self.backend.kind(),
            elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
            "filtering done"
        );
        self.state = FilterState::Seeded(out.clone());
        Ok(out)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/filter/engine.rs"]
mod tests;
