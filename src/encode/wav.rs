use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::Context as _;

use crate::encode::sink::{AudioFormat, SampleFormat};
use crate::foundation::error::{HoldframeError, HoldframeResult};

/// Streams raw little-endian PCM bytes into a WAV file.
///
/// Buffers do not need to end on a sample boundary; trailing partial bytes are carried into
/// the next write. A partial sample left over at `finalize` is discarded.
pub struct WavByteWriter {
    writer: hound::WavWriter<BufWriter<File>>,
    format: AudioFormat,
    carry: Vec<u8>,
}

impl std::fmt::Debug for WavByteWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WavByteWriter")
            .field("format", &self.format)
            .field("carry", &self.carry.len())
            .finish_non_exhaustive()
    }
}

impl WavByteWriter {
    /// Create (or truncate) `path` and write a WAV header for `format`.
    pub fn create(path: &Path, format: AudioFormat) -> HoldframeResult<Self> {
        format.validate()?;
        let spec = hound::WavSpec {
            channels: format.channels,
            sample_rate: format.sample_rate,
            bits_per_sample: match format.sample_format {
                SampleFormat::F32 => 32,
                SampleFormat::I16 => 16,
            },
            sample_format: match format.sample_format {
                SampleFormat::F32 => hound::SampleFormat::Float,
                SampleFormat::I16 => hound::SampleFormat::Int,
            },
        };
        let writer = hound::WavWriter::create(path, spec)
            .with_context(|| format!("failed to create wav file '{}'", path.display()))?;
        Ok(Self {
            writer,
            format,
            carry: Vec::new(),
        })
    }

    /// Audio layout this writer was created with.
    pub fn format(&self) -> AudioFormat {
        self.format
    }

    /// Append raw PCM bytes.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> HoldframeResult<()> {
        let width = self.format.sample_format.bytes_per_sample();
        self.carry.extend_from_slice(bytes);
        let whole = self.carry.len() - self.carry.len() % width;
        for chunk in self.carry[..whole].chunks_exact(width) {
            let res = match self.format.sample_format {
                SampleFormat::F32 => self.writer.write_sample(f32::from_le_bytes([
                    chunk[0], chunk[1], chunk[2], chunk[3],
                ])),
                SampleFormat::I16 => self
                    .writer
                    .write_sample(i16::from_le_bytes([chunk[0], chunk[1]])),
            };
            res.map_err(|e| HoldframeError::encode_write(format!("wav write failed: {e}")))?;
        }
        self.carry.drain(..whole);
        Ok(())
    }

    /// Samples written so far, counting each channel separately.
    pub fn samples_written(&self) -> u32 {
        self.writer.len()
    }

    /// Patch the header and close the file. Returns the number of samples written.
    pub fn finalize(self) -> HoldframeResult<u32> {
        let written = self.writer.len();
        if !self.carry.is_empty() {
            tracing::debug!(bytes = self.carry.len(), "dropping partial trailing audio sample");
        }
        self.writer
            .finalize()
            .map_err(|e| HoldframeError::encode_write(format!("wav finalize failed: {e}")))?;
        Ok(written)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/wav.rs"]
mod tests;
