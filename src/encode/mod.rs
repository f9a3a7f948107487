//! Encoder sinks.
//!
//! Sinks consume paired video/audio samples in arrival order and are driven by the recording
//! pipeline's drain worker.

/// `ffmpeg`-based sink (MP4 output via system `ffmpeg`, sidecar WAV for audio).
pub mod ffmpeg;
/// Encoder sink trait, sample types and the in-memory sink.
pub mod sink;
/// Raw PCM bytes to WAV via `hound`.
pub mod wav;
