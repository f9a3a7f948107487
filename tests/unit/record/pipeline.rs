use super::*;
use crate::encode::sink::{AudioFormat, InMemorySink};
use crate::foundation::core::{Fps, FrameSize};

fn size() -> FrameSize {
    FrameSize::new(2, 2).unwrap()
}

fn cfg() -> SinkConfig {
    SinkConfig {
        size: size(),
        fps: Fps::default(),
        audio: Some(AudioFormat::default()),
    }
}

fn frame(v: u8) -> PixelBuffer {
    PixelBuffer::filled(size(), [v, v, v, 255])
}

/// Blocks inside the first write until released, so queue occupancy is deterministic.
struct GateSink {
    inner: InMemorySink,
    entered: mpsc::Sender<()>,
    release: mpsc::Receiver<()>,
    first: bool,
}

impl EncoderSink for GateSink {
    fn begin(&mut self, cfg: SinkConfig) -> HoldframeResult<()> {
        self.inner.begin(cfg)
    }

    fn write_sample(&mut self, pair: &SamplePair) -> HoldframeResult<()> {
        if self.first {
            self.first = false;
            let _ = self.entered.send(());
            let _ = self.release.recv();
        }
        self.inner.write_sample(pair)
    }

    fn end(&mut self) -> HoldframeResult<()> {
        self.inner.end()
    }
}

#[test]
fn starts_idle_and_rejects_pushes() {
    let p = RecordingPipeline::default();
    assert_eq!(p.state(), RecordingState::Idle);
    assert!(!p.push_video(frame(0)));
    assert!(!p.push_audio(vec![0; 4]));
    assert!(matches!(p.deactivate(), Err(HoldframeError::State(_))));
}

#[test]
fn activate_deactivate_writes_everything_in_order() {
    let p = RecordingPipeline::default();
    let sink = InMemorySink::new();
    let handle = sink.handle();
    p.activate(cfg(), move || Ok(Box::new(sink) as Box<dyn EncoderSink>))
        .unwrap();
    assert!(p.is_recording());

    for i in 0..3u8 {
        assert!(p.push_audio(vec![i; 8]));
    }
    for i in 0..5u8 {
        assert!(p.push_video(frame(i)));
    }
    let stats = p.deactivate().unwrap();
    assert_eq!(p.state(), RecordingState::Idle);

    assert_eq!(stats.paired, 3);
    assert_eq!(stats.video_only, 2);
    assert_eq!(stats.audio_only, 0);
    assert_eq!(stats.write_failures, 0);

    let rec = handle.snapshot();
    assert!(rec.ended);
    assert_eq!(rec.video_seqs(), vec![0, 1, 2, 3, 4]);
    assert_eq!(rec.audio_seqs(), vec![0, 1, 2]);
    // Oldest video goes with oldest audio.
    let first = &rec.pairs[0];
    assert_eq!(first.video.as_ref().unwrap().frame, frame(0));
    assert_eq!(first.audio.as_ref().unwrap().data, vec![0; 8]);
}

#[test]
fn leftover_audio_is_flushed_as_audio_only() {
    let p = RecordingPipeline::default();
    let sink = InMemorySink::new();
    let handle = sink.handle();
    p.activate(cfg(), move || Ok(Box::new(sink) as Box<dyn EncoderSink>))
        .unwrap();
    for i in 0..4u8 {
        assert!(p.push_audio(vec![i; 2]));
    }
    assert!(p.push_video(frame(9)));
    let stats = p.deactivate().unwrap();
    assert_eq!(stats.paired, 1);
    assert_eq!(stats.audio_only, 3);
    assert_eq!(handle.snapshot().audio_seqs(), vec![0, 1, 2, 3]);
}

#[test]
fn double_activate_is_a_state_error() {
    let p = RecordingPipeline::default();
    p.activate(cfg(), || Ok(Box::new(InMemorySink::new()) as Box<dyn EncoderSink>))
        .unwrap();
    let err = p
        .activate(cfg(), || Ok(Box::new(InMemorySink::new()) as Box<dyn EncoderSink>))
        .unwrap_err();
    assert!(matches!(err, HoldframeError::State(_)));
    p.deactivate().unwrap();
}

#[test]
fn open_failure_surfaces_and_returns_to_idle() {
    let p = RecordingPipeline::default();
    let err = p
        .activate(cfg(), || {
            Ok(Box::new(InMemorySink::failing_begin()) as Box<dyn EncoderSink>)
        })
        .unwrap_err();
    assert!(matches!(err, HoldframeError::EncodeOpenFailed(_)));
    assert_eq!(p.state(), RecordingState::Idle);

    let err = p
        .activate(cfg(), || Err(HoldframeError::validation("no codec")))
        .unwrap_err();
    assert!(matches!(err, HoldframeError::EncodeOpenFailed(_)));
    assert_eq!(p.state(), RecordingState::Idle);
}

#[test]
fn write_failures_are_counted_and_stream_continues() {
    let p = RecordingPipeline::default();
    let sink = InMemorySink::new().with_failing_video([1, 3]);
    let handle = sink.handle();
    p.activate(cfg(), move || Ok(Box::new(sink) as Box<dyn EncoderSink>))
        .unwrap();
    for i in 0..5u8 {
        assert!(p.push_video(frame(i)));
    }
    let stats = p.deactivate().unwrap();
    assert_eq!(stats.write_failures, 2);
    assert_eq!(stats.video_only, 3);
    assert_eq!(handle.snapshot().video_seqs(), vec![0, 2, 4]);
}

#[test]
fn full_queue_drops_new_samples_without_blocking() {
    let p = RecordingPipeline::new(RecordingOpts {
        video_queue_capacity: 2,
        audio_queue_capacity: 1,
        ..RecordingOpts::default()
    });
    let (entered_tx, entered_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let sink = GateSink {
        inner: InMemorySink::new(),
        entered: entered_tx,
        release: release_rx,
        first: true,
    };
    let handle = sink.inner.handle();
    p.activate(cfg(), move || Ok(Box::new(sink) as Box<dyn EncoderSink>))
        .unwrap();

    assert!(p.push_video(frame(0)));
    entered_rx.recv().unwrap();
    // Worker is parked inside the first write; the queue holds two more.
    assert!(p.push_video(frame(1)));
    assert!(p.push_video(frame(2)));
    assert!(!p.push_video(frame(3)));
    assert!(p.push_audio(vec![1]));
    assert!(!p.push_audio(vec![2]));

    release_tx.send(()).unwrap();
    let stats = p.deactivate().unwrap();
    assert_eq!(stats.dropped_video, 1);
    assert_eq!(stats.dropped_audio, 1);
    let rec = handle.snapshot();
    assert_eq!(rec.video_seqs(), vec![0, 1, 2]);
    assert_eq!(rec.audio_seqs(), vec![0]);
}

#[test]
fn audio_faster_than_video_is_not_dropped() {
    let p = RecordingPipeline::new(RecordingOpts {
        video_queue_capacity: 64,
        audio_queue_capacity: 64,
        max_pending_audio: 4,
    });
    let sink = InMemorySink::new();
    let handle = sink.handle();
    p.activate(cfg(), move || Ok(Box::new(sink) as Box<dyn EncoderSink>))
        .unwrap();

    // Two audio buffers per video frame, over three times the audio queue length.
    for i in 0..100u8 {
        assert!(p.push_audio(vec![i; 4]));
        assert!(p.push_audio(vec![i; 4]));
        assert!(p.push_video(frame(i)));
        std::thread::sleep(std::time::Duration::from_millis(1));
    }
    let stats = p.deactivate().unwrap();

    assert_eq!(stats.dropped_audio, 0);
    assert_eq!(stats.dropped_video, 0);
    assert_eq!(stats.paired + stats.video_only, 100);
    assert_eq!(stats.paired + stats.audio_only, 200);
    let rec = handle.snapshot();
    assert_eq!(rec.audio_seqs(), (0..200).collect::<Vec<u64>>());
}

#[test]
fn audio_backlog_beyond_limit_is_written_without_video() {
    let p = RecordingPipeline::new(RecordingOpts {
        max_pending_audio: 2,
        ..RecordingOpts::default()
    });
    let sink = InMemorySink::new();
    let handle = sink.handle();
    p.activate(cfg(), move || Ok(Box::new(sink) as Box<dyn EncoderSink>))
        .unwrap();
    for i in 0..6u8 {
        assert!(p.push_audio(vec![i]));
    }
    // No video: the worker must still move the audio along.
    let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
    while handle.snapshot().audio_seqs().len() < 4 && std::time::Instant::now() < deadline {
        std::thread::sleep(std::time::Duration::from_millis(5));
    }
    assert_eq!(handle.snapshot().audio_seqs(), vec![0, 1, 2, 3]);

    assert!(p.push_video(frame(1)));
    let stats = p.deactivate().unwrap();
    // Oldest held-back buffer pairs with the frame; the other one is flushed at the end.
    assert_eq!(stats.paired, 1);
    assert_eq!(stats.audio_only, 5);
    assert_eq!(handle.snapshot().audio_seqs(), (0..6).collect::<Vec<u64>>());
}

#[test]
fn pipeline_can_record_again_after_draining() {
    let p = RecordingPipeline::default();
    for round in 0..2u8 {
        let sink = InMemorySink::new();
        let handle = sink.handle();
        p.activate(cfg(), move || Ok(Box::new(sink) as Box<dyn EncoderSink>))
            .unwrap();
        assert!(p.push_video(frame(round)));
        p.deactivate().unwrap();
        assert_eq!(handle.snapshot().video_seqs(), vec![0]);
    }
}
