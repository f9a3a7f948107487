use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::foundation::core::{Fps, FrameSize};
use crate::foundation::error::{HoldframeError, HoldframeResult};
use crate::frame::buffers::PixelBuffer;

/// PCM sample encoding of raw audio buffers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleFormat {
    /// 32-bit IEEE float, little endian.
    #[default]
    F32,
    /// 16-bit signed integer, little endian.
    I16,
}

impl SampleFormat {
    /// Bytes per single-channel sample.
    pub fn bytes_per_sample(self) -> usize {
        match self {
            Self::F32 => 4,
            Self::I16 => 2,
        }
    }
}

/// Raw audio layout delivered by the audio source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioFormat {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Interleaved channel count.
    pub channels: u16,
    /// Sample encoding.
    pub sample_format: SampleFormat,
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            channels: 1,
            sample_format: SampleFormat::F32,
        }
    }
}

impl AudioFormat {
    /// Reject zero rates and channel counts.
    pub fn validate(&self) -> HoldframeResult<()> {
        if self.sample_rate == 0 {
            return Err(HoldframeError::validation("audio sample_rate must be non-zero"));
        }
        if self.channels == 0 {
            return Err(HoldframeError::validation("audio channels must be non-zero"));
        }
        Ok(())
    }
}

/// Configuration provided to an [`EncoderSink`] when a recording starts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SinkConfig {
    /// Video frame size.
    pub size: FrameSize,
    /// Video frame rate.
    pub fps: Fps,
    /// Audio layout, or `None` for a video-only recording.
    pub audio: Option<AudioFormat>,
}

/// One filtered frame with its per-stream arrival position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VideoSample {
    /// Arrival position in the video stream, starting at 0.
    pub seq: u64,
    /// Composite frame.
    pub frame: PixelBuffer,
}

/// One raw audio buffer with its per-stream arrival position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AudioSample {
    /// Arrival position in the audio stream, starting at 0.
    pub seq: u64,
    /// Raw PCM bytes in the session's [`AudioFormat`].
    pub data: Vec<u8>,
}

/// What the drain worker hands to the sink in one call.
///
/// Pairing is best effort: the oldest queued audio buffer goes with the oldest queued frame,
/// with no timestamp matching. Audio-only pairs carry audio that outran the video, and the
/// tail flushed at the end of a session.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SamplePair {
    /// Video sample, if any.
    pub video: Option<VideoSample>,
    /// Audio sample, if any.
    pub audio: Option<AudioSample>,
}

/// Encoder contract.
///
/// `begin` is called once, then `write_sample` with per-stream strictly increasing `seq`,
/// then `end` once. After `end` no further writes are accepted.
pub trait EncoderSink: Send {
    /// Open the output.
    fn begin(&mut self, cfg: SinkConfig) -> HoldframeResult<()>;
    /// Write one pair.
    fn write_sample(&mut self, pair: &SamplePair) -> HoldframeResult<()>;
    /// Flush and close the output.
    fn end(&mut self) -> HoldframeResult<()>;
}

/// Tracks per-stream ordering and the finalized flag for sink implementations.
#[derive(Clone, Debug, Default)]
pub struct SequenceGuard {
    last_video: Option<u64>,
    last_audio: Option<u64>,
    started: bool,
    finalized: bool,
}

impl SequenceGuard {
    /// Mark the sink started.
    pub fn start(&mut self) -> HoldframeResult<()> {
        if self.finalized {
            return Err(HoldframeError::encode_open("sink is already finalized"));
        }
        if self.started {
            return Err(HoldframeError::encode_open("sink was already started"));
        }
        self.started = true;
        Ok(())
    }

    /// Validate `pair` against the previous one and record its positions.
    pub fn admit(&mut self, pair: &SamplePair) -> HoldframeResult<()> {
        if self.finalized {
            return Err(HoldframeError::encode_write("sink is already finalized"));
        }
        if !self.started {
            return Err(HoldframeError::encode_write("sink not started"));
        }
        if pair.video.is_none() && pair.audio.is_none() {
            return Err(HoldframeError::encode_write("empty sample pair"));
        }
        if let Some(v) = &pair.video
            && self.last_video.is_some_and(|last| v.seq <= last)
        {
            return Err(HoldframeError::encode_write(
                "sink received out-of-order video sample",
            ));
        }
        if let Some(a) = &pair.audio
            && self.last_audio.is_some_and(|last| a.seq <= last)
        {
            return Err(HoldframeError::encode_write(
                "sink received out-of-order audio sample",
            ));
        }
        if let Some(v) = &pair.video {
            self.last_video = Some(v.seq);
        }
        if let Some(a) = &pair.audio {
            self.last_audio = Some(a.seq);
        }
        Ok(())
    }

    /// Mark the sink finalized.
    pub fn finish(&mut self) -> HoldframeResult<()> {
        if self.finalized {
            return Err(HoldframeError::encode_write("sink is already finalized"));
        }
        self.finalized = true;
        Ok(())
    }
}

/// What an [`InMemorySink`] has seen.
#[derive(Clone, Debug, Default)]
pub struct Recorded {
    /// Configuration passed to `begin`.
    pub config: Option<SinkConfig>,
    /// Accepted pairs in write order.
    pub pairs: Vec<SamplePair>,
    /// Whether `end` was called.
    pub ended: bool,
}

impl Recorded {
    /// Video sequence numbers in write order.
    pub fn video_seqs(&self) -> Vec<u64> {
        self.pairs
            .iter()
            .filter_map(|p| p.video.as_ref().map(|v| v.seq))
            .collect()
    }

    /// Audio sequence numbers in write order.
    pub fn audio_seqs(&self) -> Vec<u64> {
        self.pairs
            .iter()
            .filter_map(|p| p.audio.as_ref().map(|a| a.seq))
            .collect()
    }
}

/// Cloneable view into an [`InMemorySink`]'s recording, usable after the sink was moved.
#[derive(Clone, Debug, Default)]
pub struct InMemoryHandle(Arc<Mutex<Recorded>>);

impl InMemoryHandle {
    fn lock(&self) -> MutexGuard<'_, Recorded> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Snapshot of everything recorded so far.
    pub fn snapshot(&self) -> Recorded {
        self.lock().clone()
    }
}

/// In-memory sink for tests and debugging.
#[derive(Debug, Default)]
pub struct InMemorySink {
    recorded: InMemoryHandle,
    guard: SequenceGuard,
    fail_begin: bool,
    failing_video: Vec<u64>,
}

impl InMemorySink {
    /// Create a new in-memory sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose `begin` always fails.
    pub fn failing_begin() -> Self {
        Self {
            fail_begin: true,
            ..Self::default()
        }
    }

    /// Make writes of the listed video sequence numbers fail.
    pub fn with_failing_video(mut self, seqs: impl IntoIterator<Item = u64>) -> Self {
        self.failing_video = seqs.into_iter().collect();
        self
    }

    /// Handle for inspecting the recording.
    pub fn handle(&self) -> InMemoryHandle {
        self.recorded.clone()
    }
}

impl EncoderSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> HoldframeResult<()> {
        if self.fail_begin {
            return Err(HoldframeError::encode_open("in-memory sink refused to open"));
        }
        self.guard.start()?;
        let mut rec = self.recorded.lock();
        rec.config = Some(cfg);
        rec.pairs.clear();
        rec.ended = false;
        Ok(())
    }

    fn write_sample(&mut self, pair: &SamplePair) -> HoldframeResult<()> {
        self.guard.admit(pair)?;
        if let Some(v) = &pair.video
            && self.failing_video.contains(&v.seq)
        {
            return Err(HoldframeError::encode_write(format!(
                "injected failure for video sample {}",
                v.seq
            )));
        }
        self.recorded.lock().pairs.push(pair.clone());
        Ok(())
    }

    fn end(&mut self) -> HoldframeResult<()> {
        self.guard.finish()?;
        self.recorded.lock().ended = true;
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/sink.rs"]
mod tests;
