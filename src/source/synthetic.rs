use crate::encode::sink::{AudioFormat, SampleFormat};
use crate::foundation::core::{Fps, FrameSize};
use crate::foundation::math::SplitMix64;
use crate::frame::buffers::{DepthBuffer, DepthSpacePoint, DepthToColorMap, PixelBuffer};
use crate::session::coordinator::SensorFrame;

/// Depth of the static background wall.
pub const BACKGROUND_DEPTH: u16 = 3000;
/// Depth of the moving foreground object.
pub const FOREGROUND_DEPTH: u16 = 1000;

const TONE_HZ: f32 = 440.0;

/// Deterministic stand-in for a depth camera with a microphone.
///
/// A disc at [`FOREGROUND_DEPTH`] sweeps left to right in front of a wall at
/// [`BACKGROUND_DEPTH`]. A few depth samples drop out to 0 each frame, and the outer
/// sixteenth of color columns on each side has no depth correspondence.
#[derive(Clone, Debug)]
pub struct SyntheticSource {
    color_size: FrameSize,
    depth_size: FrameSize,
    fps: Fps,
    audio: AudioFormat,
    rng: SplitMix64,
    frame: u64,
    audio_pos: u64,
    map: DepthToColorMap,
}

impl SyntheticSource {
    /// Create a source; identical arguments produce identical streams.
    pub fn new(color_size: FrameSize, depth_size: FrameSize, fps: Fps, seed: u64) -> Self {
        Self {
            color_size,
            depth_size,
            fps,
            audio: AudioFormat::default(),
            rng: SplitMix64::new(seed),
            frame: 0,
            audio_pos: 0,
            map: build_map(color_size, depth_size),
        }
    }

    /// Emit audio in `format` instead of the default.
    pub fn with_audio_format(mut self, format: AudioFormat) -> Self {
        self.audio = format;
        self
    }

    /// Color frame size.
    pub fn color_size(&self) -> FrameSize {
        self.color_size
    }

    /// Depth frame size.
    pub fn depth_size(&self) -> FrameSize {
        self.depth_size
    }

    /// Audio layout produced by [`next_audio`](Self::next_audio).
    pub fn audio_format(&self) -> AudioFormat {
        self.audio
    }

    /// Frame rate.
    pub fn fps(&self) -> Fps {
        self.fps
    }

    /// Frames produced so far.
    pub fn frames_emitted(&self) -> u64 {
        self.frame
    }

    /// Disc center and radius in depth space for frame `n`.
    fn disc(&self, n: u64) -> (f32, f32, f32) {
        let w = self.depth_size.width as f32;
        let h = self.depth_size.height as f32;
        let period = (u64::from(self.fps.num) * 4 / u64::from(self.fps.den)).max(1);
        let t = (n % period) as f32 / period as f32;
        (w * (0.15 + 0.7 * t), h * 0.5, h.min(w) * 0.2)
    }

    /// Next color + depth + map callback.
    pub fn next_frame(&mut self) -> SensorFrame {
        let (cx, cy, r) = self.disc(self.frame);
        let r2 = r * r;
        let mut depth = DepthBuffer::from_fn(self.depth_size, |x, y| {
            let dx = x as f32 - cx;
            let dy = y as f32 - cy;
            if dx * dx + dy * dy <= r2 {
                FOREGROUND_DEPTH
            } else {
                BACKGROUND_DEPTH
            }
        });
        let dropouts = self.depth_size.pixel_count() / 200;
        let samples = depth.samples_mut();
        for _ in 0..dropouts {
            let i = self.rng.below(samples.len() as u32) as usize;
            samples[i] = 0;
        }

        let sx = self.depth_size.width as f32 / self.color_size.width as f32;
        let sy = self.depth_size.height as f32 / self.color_size.height as f32;
        let shade = (self.frame % 64) as u8;
        let color = PixelBuffer::from_fn(self.color_size, |x, y| {
            let dx = x as f32 * sx - cx;
            let dy = y as f32 * sy - cy;
            if dx * dx + dy * dy <= r2 {
                [40, 60, 220, 255]
            } else {
                [
                    (x % 256) as u8,
                    (y % 256) as u8,
                    shade.wrapping_mul(4),
                    255,
                ]
            }
        });

        self.frame += 1;
        SensorFrame {
            color: Some(color),
            depth: Some(depth),
            map: Some(self.map.clone()),
        }
    }

    /// Next `frames` audio frames of a quiet sine tone, as raw little-endian bytes.
    pub fn next_audio(&mut self, frames: usize) -> Vec<u8> {
        let channels = usize::from(self.audio.channels);
        let width = self.audio.sample_format.bytes_per_sample();
        let mut out = Vec::with_capacity(frames * channels * width);
        let rate = self.audio.sample_rate.max(1) as f32;
        for _ in 0..frames {
            let phase = (self.audio_pos as f32 / rate) * TONE_HZ * std::f32::consts::TAU;
            let v = 0.25 * phase.sin();
            for _ in 0..channels {
                match self.audio.sample_format {
                    SampleFormat::F32 => out.extend_from_slice(&v.to_le_bytes()),
                    SampleFormat::I16 => {
                        out.extend_from_slice(&((v * f32::from(i16::MAX)) as i16).to_le_bytes())
                    }
                }
            }
            self.audio_pos += 1;
        }
        out
    }
}

fn build_map(color: FrameSize, depth: FrameSize) -> DepthToColorMap {
    let sx = depth.width as f32 / color.width as f32;
    let sy = depth.height as f32 / color.height as f32;
    let border = color.width / 16;
    DepthToColorMap::from_fn(color, |x, y| {
        if x < border || x >= color.width - border {
            DepthSpacePoint::UNMAPPED
        } else {
            DepthSpacePoint::new(x as f32 * sx, y as f32 * sy)
        }
    })
}

#[cfg(test)]
#[path = "../../tests/unit/source/synthetic.rs"]
mod tests;
