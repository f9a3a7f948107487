pub(crate) mod backend;
pub(crate) mod cpu;
pub(crate) mod engine;
#[cfg(feature = "gpu")]
pub(crate) mod gpu;
pub(crate) mod halo;
pub(crate) mod rule;
