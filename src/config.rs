use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::encode::sink::AudioFormat;
use crate::filter::backend::{BackendKind, BackendPolicy};
use crate::filter::engine::FilterParams;
use crate::filter::halo::MAX_HALO_SIZE;
use crate::foundation::core::Fps;
use crate::foundation::error::{HoldframeError, HoldframeResult};
use crate::record::pipeline::RecordingOpts;
use crate::threshold::auto::AutoThreshold;
use crate::threshold::estimate::{ThresholdBounds, ThresholdMethod};

/// Filter settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilterConfig {
    /// Near threshold.
    pub near_mm: u16,
    /// Far threshold.
    pub far_mm: u16,
    /// Halo size.
    pub halo_size: i32,
    /// Compositing backend.
    pub backend: BackendKind,
    /// Use the CPU backend when the GPU one cannot be created.
    pub fallback_to_cpu: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            near_mm: 500,
            far_mm: 1500,
            halo_size: 3,
            backend: BackendKind::Cpu,
            fallback_to_cpu: true,
        }
    }
}

/// Automatic threshold settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AutoThresholdConfig {
    /// Whether thresholds follow the scene.
    pub enabled: bool,
    /// Far-threshold heuristic.
    pub method: ThresholdMethod,
    /// Lowest far threshold.
    pub min_mm: u16,
    /// Highest far threshold.
    pub max_mm: u16,
    /// Near threshold distance below far.
    pub near_offset_mm: u16,
    /// Minimum time between estimates.
    pub interval_ms: u64,
}

impl Default for AutoThresholdConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            method: ThresholdMethod::SmoothedCenter,
            min_mm: 500,
            max_mm: 4500,
            near_offset_mm: 500,
            interval_ms: 1000,
        }
    }
}

/// Recording settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RecordingConfig {
    /// Output frame rate.
    pub fps: Fps,
    /// Video queue length.
    pub video_queue_capacity: usize,
    /// Audio queue length.
    pub audio_queue_capacity: usize,
    /// Audio buffers held back for pairing with upcoming video frames.
    pub max_pending_audio: usize,
    /// Raw audio layout.
    pub audio: AudioFormat,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        let opts = RecordingOpts::default();
        Self {
            fps: Fps::default(),
            video_queue_capacity: opts.video_queue_capacity,
            audio_queue_capacity: opts.audio_queue_capacity,
            max_pending_audio: opts.max_pending_audio,
            audio: AudioFormat::default(),
        }
    }
}

/// Audio hand-off stream settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AudioStreamConfig {
    /// Read timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for AudioStreamConfig {
    fn default() -> Self {
        Self { timeout_ms: 5000 }
    }
}

/// Top-level configuration, loaded from JSON. Missing fields take their defaults.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HoldframeConfig {
    /// Filter settings.
    pub filter: FilterConfig,
    /// Automatic threshold settings.
    pub auto_threshold: AutoThresholdConfig,
    /// Recording settings.
    pub recording: RecordingConfig,
    /// Audio hand-off stream settings.
    pub audio_stream: AudioStreamConfig,
}

impl HoldframeConfig {
    /// Parse from a JSON reader and validate.
    pub fn from_reader<R: std::io::Read>(r: R) -> HoldframeResult<Self> {
        let cfg: Self = serde_json::from_reader(r)
            .map_err(|e| HoldframeError::validation(format!("parse config JSON: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse from a JSON string and validate.
    pub fn from_json_str(s: &str) -> HoldframeResult<Self> {
        Self::from_reader(s.as_bytes())
    }

    /// Parse from a JSON file and validate.
    pub fn from_path(path: impl AsRef<Path>) -> HoldframeResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            HoldframeError::validation(format!("open config JSON '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    /// Check value domains.
    pub fn validate(&self) -> HoldframeResult<()> {
        let f = &self.filter;
        if f.near_mm > f.far_mm {
            return Err(HoldframeError::validation(format!(
                "filter.near_mm ({}) must not exceed filter.far_mm ({})",
                f.near_mm, f.far_mm
            )));
        }
        if !(0..=MAX_HALO_SIZE).contains(&f.halo_size) {
            return Err(HoldframeError::validation(format!(
                "filter.halo_size must be in 0..={MAX_HALO_SIZE}, got {}",
                f.halo_size
            )));
        }

        let a = &self.auto_threshold;
        if a.min_mm > a.max_mm {
            return Err(HoldframeError::validation(format!(
                "auto_threshold.min_mm ({}) must not exceed auto_threshold.max_mm ({})",
                a.min_mm, a.max_mm
            )));
        }

        let r = &self.recording;
        Fps::new(r.fps.num, r.fps.den)?;
        if r.video_queue_capacity == 0 || r.audio_queue_capacity == 0 {
            return Err(HoldframeError::validation(
                "recording queue capacities must be non-zero",
            ));
        }
        r.audio.validate()?;

        if self.audio_stream.timeout_ms == 0 {
            return Err(HoldframeError::validation(
                "audio_stream.timeout_ms must be non-zero",
            ));
        }
        Ok(())
    }

    /// Initial filter parameters.
    pub fn filter_params(&self) -> FilterParams {
        FilterParams::new(self.filter.near_mm, self.filter.far_mm, self.filter.halo_size)
    }

    /// Backend creation policy.
    pub fn backend_policy(&self) -> BackendPolicy {
        if self.filter.fallback_to_cpu {
            BackendPolicy::FallbackToSequential
        } else {
            BackendPolicy::Strict
        }
    }

    /// Automatic threshold throttle, if enabled.
    pub fn auto_threshold(&self) -> HoldframeResult<Option<AutoThreshold>> {
        let a = &self.auto_threshold;
        if !a.enabled {
            return Ok(None);
        }
        Ok(Some(AutoThreshold::new(
            a.method,
            ThresholdBounds::new(a.min_mm, a.max_mm)?,
            a.near_offset_mm,
            Duration::from_millis(a.interval_ms),
        )))
    }

    /// Recording queue sizing.
    pub fn recording_opts(&self) -> RecordingOpts {
        RecordingOpts {
            video_queue_capacity: self.recording.video_queue_capacity,
            audio_queue_capacity: self.recording.audio_queue_capacity,
            max_pending_audio: self.recording.max_pending_audio,
        }
    }

    /// Hand-off stream read timeout.
    pub fn handoff_timeout(&self) -> Duration {
        Duration::from_millis(self.audio_stream.timeout_ms)
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
