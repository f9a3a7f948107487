use serde::{Deserialize, Serialize};

use crate::filter::rule::CompositeInputs;
use crate::foundation::error::{HoldframeError, HoldframeResult};
use crate::frame::buffers::PixelBuffer;

/// An implementation of the per-pixel compositing rule.
///
/// Backends are stateless with respect to the held frame; [`crate::CompositingFilterEngine`]
/// owns that. All backends must produce byte-identical output for identical inputs.
pub trait CompositingBackend: Send {
    /// Which implementation this is.
    fn kind(&self) -> BackendKind;

    /// Apply the rule to every color pixel of `inputs` and return the composite.
    ///
    /// Inputs are already validated by the caller.
    fn composite(&mut self, inputs: &CompositeInputs<'_>) -> HoldframeResult<PixelBuffer>;
}

/// Available backend kinds.
///
/// - `Cpu` is always available.
/// - `Gpu` requires the `gpu` cargo feature and a usable adapter at runtime.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Sequential per-pixel loop.
    #[default]
    Cpu,
    /// wgpu compute kernel.
    Gpu,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cpu => f.write_str("cpu"),
            Self::Gpu => f.write_str("gpu"),
        }
    }
}

impl std::str::FromStr for BackendKind {
    type Err = HoldframeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cpu" => Ok(Self::Cpu),
            "gpu" => Ok(Self::Gpu),
            other => Err(HoldframeError::validation(format!(
                "unknown backend '{other}' (expected 'cpu' or 'gpu')"
            ))),
        }
    }
}

/// What to do when the requested backend cannot be created.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BackendPolicy {
    /// Surface [`HoldframeError::BackendUnavailable`].
    #[default]
    Strict,
    /// Log a warning and use the sequential backend instead.
    FallbackToSequential,
}

/// Create a compositing backend.
pub fn create_backend(
    kind: BackendKind,
    policy: BackendPolicy,
) -> HoldframeResult<Box<dyn CompositingBackend>> {
    match kind {
        BackendKind::Cpu => Ok(Box::new(crate::filter::cpu::SequentialBackend::new())),
        BackendKind::Gpu => match create_gpu_backend() {
            Ok(backend) => Ok(backend),
            Err(err) => match policy {
                BackendPolicy::Strict => Err(err),
                BackendPolicy::FallbackToSequential => {
                    tracing::warn!(error = %err, "gpu backend unavailable, using cpu");
                    Ok(Box::new(crate::filter::cpu::SequentialBackend::new()))
                }
            },
        },
    }
}

#[cfg(feature = "gpu")]
fn create_gpu_backend() -> HoldframeResult<Box<dyn CompositingBackend>> {
    Ok(Box::new(crate::filter::gpu::GpuBackend::new()?))
}

#[cfg(not(feature = "gpu"))]
fn create_gpu_backend() -> HoldframeResult<Box<dyn CompositingBackend>> {
    Err(HoldframeError::backend_unavailable(
        "built without the `gpu` feature",
    ))
}

#[cfg(test)]
#[path = "../../tests/unit/filter/backend.rs"]
mod tests;
