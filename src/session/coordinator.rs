use std::sync::Arc;
use std::sync::mpsc::{self, SyncSender, TrySendError};
use std::thread::JoinHandle;
use std::time::Instant;

use anyhow::Context as _;

use crate::filter::engine::{CompositingFilterEngine, FilterParams};
use crate::foundation::error::{HoldframeError, HoldframeResult};
use crate::frame::buffers::{DepthBuffer, DepthToColorMap, PixelBuffer};
use crate::record::pipeline::RecordingPipeline;
use crate::session::fps::FpsCounter;
use crate::threshold::auto::AutoThreshold;

/// One sensor callback. Any part may be missing on a given callback.
#[derive(Clone, Debug, Default)]
pub struct SensorFrame {
    /// Live color frame.
    pub color: Option<PixelBuffer>,
    /// Depth frame.
    pub depth: Option<DepthBuffer>,
    /// Color-to-depth mapping computed for `depth`.
    pub map: Option<DepthToColorMap>,
}

/// Counters kept by a [`CaptureCoordinator`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CoordinatorStats {
    /// Color frames received.
    pub color_frames: u64,
    /// Composites produced (including degraded ones).
    pub composites: u64,
    /// Filter failures answered with the held frame.
    pub degraded: u64,
    /// Color frames skipped because no depth or mapping was cached yet.
    pub skipped: u64,
    /// Composites handed to the recording pipeline.
    pub recorded: u64,
}

/// Glue between a sensor, the filter engine and the recording pipeline.
///
/// Depth and mapping are cached across callbacks, so color frames are filtered against the
/// most recent depth data even when they arrive alone.
#[derive(Debug)]
pub struct CaptureCoordinator {
    engine: CompositingFilterEngine,
    params: FilterParams,
    auto: Option<AutoThreshold>,
    depth: Option<DepthBuffer>,
    map: Option<DepthToColorMap>,
    recorder: Option<Arc<RecordingPipeline>>,
    fps: FpsCounter,
    stats: CoordinatorStats,
}

impl CaptureCoordinator {
    /// Create a coordinator with fixed thresholds.
    pub fn new(engine: CompositingFilterEngine, params: FilterParams) -> Self {
        Self {
            engine,
            params,
            auto: None,
            depth: None,
            map: None,
            recorder: None,
            fps: FpsCounter::new(),
            stats: CoordinatorStats::default(),
        }
    }

    /// Re-estimate thresholds from incoming depth frames.
    pub fn with_auto_threshold(mut self, auto: AutoThreshold) -> Self {
        self.auto = Some(auto);
        self
    }

    /// Forward composites and audio to `recorder` while it is recording.
    pub fn with_recorder(mut self, recorder: Arc<RecordingPipeline>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    /// Current filter parameters.
    pub fn params(&self) -> FilterParams {
        self.params
    }

    /// Replace filter parameters (e.g. from a UI slider).
    pub fn set_params(&mut self, params: FilterParams) {
        self.params = params;
    }

    /// The filter engine.
    pub fn engine(&self) -> &CompositingFilterEngine {
        &self.engine
    }

    /// Mutable access to the filter engine (for `reset`).
    pub fn engine_mut(&mut self) -> &mut CompositingFilterEngine {
        &mut self.engine
    }

    /// Filtered frames per second over the last full second.
    pub fn fps(&self) -> u32 {
        self.fps.fps()
    }

    /// Counters.
    pub fn stats(&self) -> CoordinatorStats {
        self.stats
    }

    /// Handle one sensor callback received at `now`.
    ///
    /// Returns the composite when a color frame was filtered. If filtering fails and a held
    /// frame exists, the held frame is returned instead and the failure is logged.
    pub fn on_frame(
        &mut self,
        frame: SensorFrame,
        now: Instant,
    ) -> HoldframeResult<Option<PixelBuffer>> {
        if let Some(depth) = frame.depth {
            if let Some(range) = self.auto.as_mut().and_then(|a| a.observe(now, &depth)) {
                self.params.range = range;
            }
            self.depth = Some(depth);
        }
        if let Some(map) = frame.map {
            self.map = Some(map);
        }
        let Some(color) = frame.color else {
            return Ok(None);
        };
        self.stats.color_frames += 1;
        if let Some(fps) = self.fps.tick(now) {
            tracing::debug!(fps, "capture rate");
        }

        let (Some(depth), Some(map)) = (self.depth.as_ref(), self.map.as_ref()) else {
            self.stats.skipped += 1;
            tracing::trace!("color frame skipped, no depth yet");
            return Ok(None);
        };

        let out = match self.engine.filter(&color, depth, map, self.params) {
            Ok(out) => out,
            Err(err) => match self.engine.held_frame() {
                Some(held) => {
                    self.stats.degraded += 1;
                    tracing::warn!(error = %err, "filter failed, showing held frame");
                    held.clone()
                }
                None => return Err(err),
            },
        };
        self.stats.composites += 1;

        if let Some(recorder) = &self.recorder
            && recorder.push_video(out.clone())
        {
            self.stats.recorded += 1;
        }
        Ok(Some(out))
    }

    /// Forward a raw audio buffer to the recorder. Returns `true` if it was queued.
    pub fn on_audio(&self, data: Vec<u8>) -> bool {
        self.recorder
            .as_ref()
            .is_some_and(|recorder| recorder.push_audio(data))
    }
}

/// Handle to a coordinator running on its own thread.
#[derive(Debug)]
pub struct CoordinatorHandle {
    tx: SyncSender<SensorFrame>,
    recorder: Option<Arc<RecordingPipeline>>,
    join: JoinHandle<CaptureCoordinator>,
}

impl CoordinatorHandle {
    /// Offer a sensor callback without blocking. Returns `false` if the frame was dropped.
    pub fn submit(&self, frame: SensorFrame) -> bool {
        match self.tx.try_send(frame) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::warn!("coordinator busy, sensor frame dropped");
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// Hand over a sensor callback, waiting for queue space. For offline sources that must
    /// not lose frames. Returns `false` if the coordinator thread is gone.
    pub fn submit_blocking(&self, frame: SensorFrame) -> bool {
        self.tx.send(frame).is_ok()
    }

    /// Forward audio straight to the recorder; audio never waits behind video.
    pub fn submit_audio(&self, data: Vec<u8>) -> bool {
        self.recorder
            .as_ref()
            .is_some_and(|recorder| recorder.push_audio(data))
    }

    /// Stop accepting frames, process what is queued and return the coordinator.
    pub fn finish(self) -> HoldframeResult<CaptureCoordinator> {
        drop(self.tx);
        self.join
            .join()
            .map_err(|_| HoldframeError::state("coordinator thread panicked"))
    }
}

/// Run `coordinator` on a dedicated thread fed by a bounded queue of `capacity` frames.
///
/// Every composite is passed to `on_composite`. Filter errors without a held frame are logged
/// and the frame is skipped.
pub fn spawn_coordinator<F>(
    mut coordinator: CaptureCoordinator,
    capacity: usize,
    mut on_composite: F,
) -> HoldframeResult<CoordinatorHandle>
where
    F: FnMut(PixelBuffer) + Send + 'static,
{
    let (tx, rx) = mpsc::sync_channel::<SensorFrame>(capacity);
    let recorder = coordinator.recorder.clone();
    let join = std::thread::Builder::new()
        .name("holdframe-capture".to_string())
        .spawn(move || {
            for frame in rx.iter() {
                match coordinator.on_frame(frame, Instant::now()) {
                    Ok(Some(out)) => on_composite(out),
                    Ok(None) => {}
                    Err(err) => tracing::warn!(error = %err, "frame could not be filtered"),
                }
            }
            coordinator
        })
        .context("failed to spawn capture coordinator thread")?;
    Ok(CoordinatorHandle { tx, recorder, join })
}

#[cfg(test)]
#[path = "../../tests/unit/session/coordinator.rs"]
mod tests;
