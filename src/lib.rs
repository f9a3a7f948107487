//! holdframe is a depth-gated "last frame hold" compositor for depth cameras, plus the
//! recording plumbing around it.
//!
//! For every color pixel the filter looks up the matching depth sample and a small halo
//! around it. If the whole halo lies inside a `[near, far]` window the live pixel is shown,
//! otherwise the pixel from the previous composite is kept. The result is a frame where only
//! objects inside the depth window move while everything else stays frozen.
//!
//! - Build a [`CompositingFilterEngine`] over a [`CompositingBackend`] (sequential CPU, or a
//!   `wgpu` compute kernel with the `gpu` feature)
//! - Drive it from sensor callbacks with a [`CaptureCoordinator`]
//! - Record composites and audio through a [`RecordingPipeline`] into an [`EncoderSink`]
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod config;
mod foundation;

/// Encoder sinks.
pub mod encode;
pub(crate) mod filter;
pub(crate) mod frame;
pub(crate) mod record;
pub(crate) mod session;
pub(crate) mod source;
pub(crate) mod stream;
pub(crate) mod threshold;

pub use crate::config::{
    AudioStreamConfig, AutoThresholdConfig, FilterConfig, HoldframeConfig, RecordingConfig,
};
pub use crate::foundation::core::{BGRA_BYTES, Bgra8, DepthRange, Fps, FrameSize};
pub use crate::foundation::error::{HoldframeError, HoldframeResult};
pub use crate::foundation::math::{SplitMix64, round_half_away};

pub use crate::encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts};
pub use crate::encode::sink::{
    AudioFormat, AudioSample, EncoderSink, InMemoryHandle, InMemorySink, Recorded, SampleFormat,
    SamplePair, SequenceGuard, SinkConfig, VideoSample,
};
pub use crate::encode::wav::WavByteWriter;
pub use crate::filter::backend::{BackendKind, BackendPolicy, CompositingBackend, create_backend};
pub use crate::filter::cpu::SequentialBackend;
pub use crate::filter::engine::{CompositingFilterEngine, FilterParams, FilterState};
#[cfg(feature = "gpu")]
pub use crate::filter::gpu::GpuBackend;
pub use crate::filter::halo::{HaloOffset, HaloOffsets, MAX_HALO_SIZE, generate_halo};
pub use crate::filter::rule::{
    CompositeInputs, choose_pixel, depth_coordinate, halo_all_within, is_live_valid,
};
pub use crate::frame::buffers::{DepthBuffer, DepthSpacePoint, DepthToColorMap, PixelBuffer};
pub use crate::record::pipeline::{DrainStats, RecordingOpts, RecordingPipeline, RecordingState};
pub use crate::session::coordinator::{
    CaptureCoordinator, CoordinatorHandle, CoordinatorStats, SensorFrame, spawn_coordinator,
};
pub use crate::session::fps::FpsCounter;
pub use crate::source::synthetic::{BACKGROUND_DEPTH, FOREGROUND_DEPTH, SyntheticSource};
pub use crate::stream::handoff::{BoundedHandoffStream, DEFAULT_HANDOFF_TIMEOUT};
pub use crate::stream::recorder::{AudioEnd, AudioRecordingSummary, AudioStreamRecorder};
pub use crate::threshold::auto::AutoThreshold;
pub use crate::threshold::estimate::{
    ThresholdBounds, ThresholdEstimate, ThresholdMethod, depth_max, depth_mode,
    derive_near_threshold, estimate_far_threshold, estimate_far_threshold_with, smoothed_center,
};
