use std::path::{Path, PathBuf};
use std::thread::JoinHandle;

use anyhow::Context as _;

use crate::encode::sink::AudioFormat;
use crate::encode::wav::WavByteWriter;
use crate::foundation::error::{HoldframeError, HoldframeResult};
use crate::stream::handoff::BoundedHandoffStream;

const CHUNK_BYTES: usize = 1024;

/// Why an audio recording stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AudioEnd {
    /// The producer closed the stream.
    Closed,
    /// No data arrived within the stream timeout.
    Silent,
}

/// Result of [`AudioStreamRecorder::record_to`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AudioRecordingSummary {
    /// Raw bytes copied from the stream.
    pub bytes: u64,
    /// Samples written to the WAV file, each channel counted separately.
    pub samples: u32,
    /// How the recording ended.
    pub end: AudioEnd,
}

/// Copies a [`BoundedHandoffStream`] into a WAV file until end of stream.
#[derive(Clone, Debug)]
pub struct AudioStreamRecorder {
    stream: BoundedHandoffStream,
    format: AudioFormat,
}

impl AudioStreamRecorder {
    /// Record `stream`, whose bytes are PCM in `format`.
    pub fn new(stream: BoundedHandoffStream, format: AudioFormat) -> Self {
        Self { stream, format }
    }

    /// Copy the stream into `path` in 1 KiB chunks.
    ///
    /// A read timeout is treated as the source going silent: the file is finalized with what
    /// was received and the call succeeds.
    #[tracing::instrument(level = "debug", skip(self), fields(path = %path.display()))]
    pub fn record_to(&self, path: &Path) -> HoldframeResult<AudioRecordingSummary> {
        let mut wav = WavByteWriter::create(path, self.format)?;
        let mut chunk = [0u8; CHUNK_BYTES];
        let mut bytes = 0u64;
        let end = loop {
            match self.stream.read(&mut chunk) {
                Ok(0) => break AudioEnd::Closed,
                Ok(n) => {
                    wav.write_bytes(&chunk[..n])?;
                    bytes += n as u64;
                }
                Err(HoldframeError::Timeout(after)) => {
                    tracing::warn!(?after, "audio source went silent, finalizing");
                    break AudioEnd::Silent;
                }
                Err(other) => return Err(other),
            }
        };
        let samples = wav.finalize()?;
        tracing::debug!(bytes, samples, ?end, "audio stream recorded");
        Ok(AudioRecordingSummary {
            bytes,
            samples,
            end,
        })
    }

    /// Run [`record_to`](Self::record_to) on a dedicated thread.
    pub fn spawn(
        self,
        path: PathBuf,
    ) -> HoldframeResult<JoinHandle<HoldframeResult<AudioRecordingSummary>>> {
        let handle = std::thread::Builder::new()
            .name("holdframe-audio-recorder".to_string())
            .spawn(move || self.record_to(&path))
            .context("failed to spawn audio recorder thread")?;
        Ok(handle)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/stream/recorder.rs"]
mod tests;
