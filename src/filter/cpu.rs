use crate::filter::backend::{BackendKind, CompositingBackend};
use crate::filter::rule::{CompositeInputs, choose_pixel};
use crate::foundation::error::HoldframeResult;
use crate::frame::buffers::PixelBuffer;

/// Reference backend: one pass over the color pixels on the calling thread.
#[derive(Debug, Default)]
pub struct SequentialBackend;

impl SequentialBackend {
    /// Create the backend.
    pub fn new() -> Self {
        Self
    }
}

impl CompositingBackend for SequentialBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Cpu
    }

    fn composite(&mut self, inputs: &CompositeInputs<'_>) -> HoldframeResult<PixelBuffer> {
        let mut out = inputs.held.clone();
        for i in 0..inputs.live.len_pixels() {
            let px = choose_pixel(inputs, i);
            out.set_pixel(i, px);
        }
        Ok(out)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/filter/cpu.rs"]
mod tests;
