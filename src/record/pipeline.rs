use std::collections::VecDeque;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TrySendError};
use std::sync::{Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::Context as _;

use crate::encode::sink::{AudioSample, EncoderSink, SamplePair, SinkConfig, VideoSample};
use crate::foundation::error::{HoldframeError, HoldframeResult};
use crate::frame::buffers::PixelBuffer;

/// Lifecycle of a [`RecordingPipeline`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordingState {
    /// No session.
    Idle,
    /// Opening the sink; pushes are rejected.
    Activating,
    /// Accepting samples.
    Recording,
    /// Flushing queued samples; pushes are rejected.
    Draining,
}

/// Queue sizing for a recording session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecordingOpts {
    /// Bounded video queue length.
    pub video_queue_capacity: usize,
    /// Bounded audio queue length.
    pub audio_queue_capacity: usize,
    /// Audio buffers the drain worker holds back for upcoming video frames. Older buffers
    /// beyond this are written without video.
    pub max_pending_audio: usize,
}

impl Default for RecordingOpts {
    fn default() -> Self {
        Self {
            video_queue_capacity: 256,
            audio_queue_capacity: 1024,
            max_pending_audio: 8,
        }
    }
}

/// Counters reported when a session finishes draining.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DrainStats {
    /// Video frames written together with an audio buffer.
    pub paired: u64,
    /// Video frames written without audio.
    pub video_only: u64,
    /// Audio buffers written without video: backlog beyond `max_pending_audio`, and the tail
    /// flushed at the end of the session.
    pub audio_only: u64,
    /// Writes the sink rejected (sample dropped, session continued).
    pub write_failures: u64,
    /// Frames dropped because the video queue was full.
    pub dropped_video: u64,
    /// Buffers dropped because the audio queue was full.
    pub dropped_audio: u64,
}

struct Session {
    video_tx: SyncSender<VideoSample>,
    audio_tx: SyncSender<AudioSample>,
    next_video: u64,
    next_audio: u64,
    dropped_video: u64,
    dropped_audio: u64,
    worker: JoinHandle<WorkerReport>,
}

struct Inner {
    state: RecordingState,
    session: Option<Session>,
}

struct WorkerReport {
    stats: DrainStats,
    end: HoldframeResult<()>,
}

/// Bounded video/audio queues drained into an [`EncoderSink`] by a dedicated worker.
///
/// All methods take `&self`; share the pipeline between the capture side and the UI side
/// with an `Arc`. Producers never block: a full queue drops the new sample.
pub struct RecordingPipeline {
    opts: RecordingOpts,
    inner: Mutex<Inner>,
}

impl std::fmt::Debug for RecordingPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingPipeline")
            .field("opts", &self.opts)
            .field("state", &self.state())
            .finish()
    }
}

impl Default for RecordingPipeline {
    fn default() -> Self {
        Self::new(RecordingOpts::default())
    }
}

impl RecordingPipeline {
    /// Create an idle pipeline.
    pub fn new(opts: RecordingOpts) -> Self {
        Self {
            opts,
            inner: Mutex::new(Inner {
                state: RecordingState::Idle,
                session: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Current state.
    pub fn state(&self) -> RecordingState {
        self.lock().state
    }

    /// `true` while samples are accepted.
    pub fn is_recording(&self) -> bool {
        self.state() == RecordingState::Recording
    }

    /// Open a sink from `factory` and start accepting samples.
    ///
    /// Fails with [`HoldframeError::State`] unless idle, and with
    /// [`HoldframeError::EncodeOpenFailed`] if the sink cannot be created or started; the
    /// pipeline is idle again afterwards.
    #[tracing::instrument(level = "info", skip(self, factory), fields(size = %cfg.size))]
    pub fn activate<F>(&self, cfg: SinkConfig, factory: F) -> HoldframeResult<()>
    where
        F: FnOnce() -> HoldframeResult<Box<dyn EncoderSink>>,
    {
        {
            let mut inner = self.lock();
            if inner.state != RecordingState::Idle {
                return Err(HoldframeError::state(format!(
                    "cannot activate recording while {:?}",
                    inner.state
                )));
            }
            inner.state = RecordingState::Activating;
        }

        let opened = factory().and_then(|mut sink| {
            sink.begin(cfg)?;
            Ok(sink)
        });
        let sink = match opened {
            Ok(sink) => sink,
            Err(err) => {
                self.lock().state = RecordingState::Idle;
                return Err(match err {
                    HoldframeError::EncodeOpenFailed(_) => err,
                    other => HoldframeError::encode_open(other.to_string()),
                });
            }
        };

        let (video_tx, video_rx) = mpsc::sync_channel(self.opts.video_queue_capacity);
        let (audio_tx, audio_rx) = mpsc::sync_channel(self.opts.audio_queue_capacity);
        let worker = std::thread::Builder::new()
            .name("holdframe-drain".to_string())
            .spawn({
                let max_pending = self.opts.max_pending_audio;
                move || drain_worker(sink, video_rx, audio_rx, max_pending)
            })
            .context("failed to spawn drain worker");
        let worker = match worker {
            Ok(worker) => worker,
            Err(err) => {
                self.lock().state = RecordingState::Idle;
                return Err(err.into());
            }
        };

        let mut inner = self.lock();
        inner.session = Some(Session {
            video_tx,
            audio_tx,
            next_video: 0,
            next_audio: 0,
            dropped_video: 0,
            dropped_audio: 0,
            worker,
        });
        inner.state = RecordingState::Recording;
        tracing::info!("recording started");
        Ok(())
    }

    /// Queue a filtered frame. Returns `false` when not recording or the queue is full.
    pub fn push_video(&self, frame: PixelBuffer) -> bool {
        let mut inner = self.lock();
        if inner.state != RecordingState::Recording {
            return false;
        }
        let Some(session) = inner.session.as_mut() else {
            return false;
        };
        let seq = session.next_video;
        match session.video_tx.try_send(VideoSample { seq, frame }) {
            Ok(()) => {
                session.next_video += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                session.dropped_video += 1;
                tracing::warn!(dropped = session.dropped_video, "video queue full, frame dropped");
                false
            }
            Err(TrySendError::Disconnected(_)) => {
                tracing::warn!("drain worker is gone, frame dropped");
                false
            }
        }
    }

    /// Queue a raw audio buffer. Returns `false` when not recording or the queue is full.
    pub fn push_audio(&self, data: Vec<u8>) -> bool {
        let mut inner = self.lock();
        if inner.state != RecordingState::Recording {
            return false;
        }
        let Some(session) = inner.session.as_mut() else {
            return false;
        };
        let seq = session.next_audio;
        match session.audio_tx.try_send(AudioSample { seq, data }) {
            Ok(()) => {
                session.next_audio += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                session.dropped_audio += 1;
                tracing::warn!(dropped = session.dropped_audio, "audio queue full, buffer dropped");
                false
            }
            Err(TrySendError::Disconnected(_)) => {
                tracing::warn!("drain worker is gone, audio dropped");
                false
            }
        }
    }

    /// Stop accepting samples, write everything already queued, close the sink and go idle.
    ///
    /// Terminates once the finite backlog is written; nothing is enqueued after draining
    /// starts.
    #[tracing::instrument(level = "info", skip(self))]
    pub fn deactivate(&self) -> HoldframeResult<DrainStats> {
        let session = {
            let mut inner = self.lock();
            if inner.state != RecordingState::Recording {
                return Err(HoldframeError::state(format!(
                    "cannot deactivate recording while {:?}",
                    inner.state
                )));
            }
            inner.state = RecordingState::Draining;
            inner.session.take()
        };
        let Some(session) = session else {
            self.lock().state = RecordingState::Idle;
            return Err(HoldframeError::state("recording session missing"));
        };

        let Session {
            video_tx,
            audio_tx,
            dropped_video,
            dropped_audio,
            worker,
            ..
        } = session;
        drop(video_tx);
        drop(audio_tx);
        let report = worker.join();
        self.lock().state = RecordingState::Idle;

        let report = report.map_err(|_| HoldframeError::state("drain worker panicked"))?;
        let stats = DrainStats {
            dropped_video,
            dropped_audio,
            ..report.stats
        };
        report.end?;
        tracing::info!(?stats, "recording drained");
        Ok(stats)
    }
}

impl Drop for RecordingPipeline {
    fn drop(&mut self) {
        if self.is_recording()
            && let Err(err) = self.deactivate()
        {
            tracing::warn!(error = %err, "recording did not drain cleanly on drop");
        }
    }
}

// Upper bound on how long queued audio waits while no video arrives.
const AUDIO_POLL: Duration = Duration::from_millis(10);

fn drain_worker(
    mut sink: Box<dyn EncoderSink>,
    video_rx: Receiver<VideoSample>,
    audio_rx: Receiver<AudioSample>,
    max_pending: usize,
) -> WorkerReport {
    let mut stats = DrainStats::default();
    let mut pending: VecDeque<AudioSample> = VecDeque::new();

    // Audio is moved out of its channel on every wake-up, so the audio queue only fills when
    // the sink itself stalls. Disconnects once `deactivate` drops the sender and the video
    // backlog is empty.
    loop {
        let video = match video_rx.recv_timeout(AUDIO_POLL) {
            Ok(video) => Some(video),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => break,
        };
        pending.extend(audio_rx.try_iter());
        if let Some(video) = video {
            let audio = pending.pop_front();
            write_pair(
                sink.as_mut(),
                &mut stats,
                SamplePair {
                    video: Some(video),
                    audio,
                },
            );
        }
        while pending.len() > max_pending
            && let Some(audio) = pending.pop_front()
        {
            write_audio_only(sink.as_mut(), &mut stats, audio);
        }
    }

    pending.extend(audio_rx.iter());
    while let Some(audio) = pending.pop_front() {
        write_audio_only(sink.as_mut(), &mut stats, audio);
    }

    let end = sink.end();
    if let Err(err) = &end {
        tracing::warn!(error = %err, "encoder sink failed to close");
    }
    WorkerReport { stats, end }
}

fn write_audio_only(sink: &mut dyn EncoderSink, stats: &mut DrainStats, audio: AudioSample) {
    write_pair(
        sink,
        stats,
        SamplePair {
            video: None,
            audio: Some(audio),
        },
    );
}

fn write_pair(sink: &mut dyn EncoderSink, stats: &mut DrainStats, pair: SamplePair) {
    match sink.write_sample(&pair) {
        Ok(()) => match (&pair.video, &pair.audio) {
            (Some(_), Some(_)) => stats.paired += 1,
            (Some(_), None) => stats.video_only += 1,
            _ => stats.audio_only += 1,
        },
        Err(err) => {
            stats.write_failures += 1;
            tracing::warn!(error = %err, "sample dropped");
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/record/pipeline.rs"]
mod tests;
