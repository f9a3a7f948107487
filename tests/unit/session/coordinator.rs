use super::*;
use crate::encode::sink::{EncoderSink, InMemorySink, SinkConfig};
use crate::foundation::core::{DepthRange, Fps, FrameSize};
use crate::frame::buffers::DepthSpacePoint;
use crate::threshold::estimate::{ThresholdBounds, ThresholdMethod};
use std::time::Duration;

fn size() -> FrameSize {
    FrameSize::new(2, 2).unwrap()
}

fn sensor(color: u8, depth: u16) -> SensorFrame {
    SensorFrame {
        color: Some(PixelBuffer::filled(size(), [color, color, color, 255])),
        depth: Some(DepthBuffer::filled(size(), depth)),
        map: Some(DepthToColorMap::from_fn(size(), |x, y| {
            DepthSpacePoint::new(x as f32, y as f32)
        })),
    }
}

fn coordinator() -> CaptureCoordinator {
    CaptureCoordinator::new(
        CompositingFilterEngine::default(),
        FilterParams::new(500, 1500, 0),
    )
}

#[test]
fn color_without_depth_is_skipped() {
    let mut c = coordinator();
    let frame = SensorFrame {
        color: Some(PixelBuffer::filled(size(), [1, 1, 1, 255])),
        ..SensorFrame::default()
    };
    assert_eq!(c.on_frame(frame, Instant::now()).unwrap(), None);
    assert_eq!(c.stats().skipped, 1);
}

#[test]
fn cached_depth_is_reused_for_color_only_frames() {
    let mut c = coordinator();
    let now = Instant::now();
    let first = c.on_frame(sensor(10, 1000), now).unwrap().unwrap();
    assert_eq!(first.pixel(0), [10, 10, 10, 255]);

    let color_only = SensorFrame {
        color: Some(PixelBuffer::filled(size(), [20, 20, 20, 255])),
        ..SensorFrame::default()
    };
    let second = c.on_frame(color_only, now).unwrap().unwrap();
    assert_eq!(second.pixel(3), [20, 20, 20, 255]);
    assert_eq!(c.stats().composites, 2);
}

#[test]
fn out_of_range_depth_holds_previous_composite() {
    let mut c = coordinator();
    let now = Instant::now();
    c.on_frame(sensor(10, 1000), now).unwrap();
    let out = c.on_frame(sensor(99, 3000), now).unwrap().unwrap();
    assert_eq!(out.pixel(0), [10, 10, 10, 255]);
}

#[test]
fn filter_failure_degrades_to_held_frame() {
    let mut c = coordinator();
    let now = Instant::now();
    c.on_frame(sensor(10, 1000), now).unwrap();
    // A 4x1 color frame no longer matches the held frame or the cached map.
    let odd = SensorFrame {
        color: Some(PixelBuffer::filled(FrameSize::new(4, 1).unwrap(), [7, 7, 7, 255])),
        ..SensorFrame::default()
    };
    let out = c.on_frame(odd, now).unwrap().unwrap();
    assert_eq!(out, PixelBuffer::filled(size(), [10, 10, 10, 255]));
    assert_eq!(c.stats().degraded, 1);
}

#[test]
fn filter_failure_without_held_frame_is_an_error() {
    let mut c = coordinator();
    let mut frame = sensor(10, 1000);
    frame.map = Some(DepthToColorMap::unmapped(FrameSize::new(1, 1).unwrap()));
    assert!(c.on_frame(frame, Instant::now()).is_err());
}

#[test]
fn auto_threshold_updates_range() {
    let auto = AutoThreshold::new(
        ThresholdMethod::SmoothedCenter,
        ThresholdBounds::new(500, 4500).unwrap(),
        500,
        Duration::from_secs(1),
    );
    let mut c = coordinator().with_auto_threshold(auto);
    let depth_only = SensorFrame {
        depth: Some(DepthBuffer::filled(FrameSize::new(5, 5).unwrap(), 3000)),
        ..SensorFrame::default()
    };
    assert_eq!(c.on_frame(depth_only, Instant::now()).unwrap(), None);
    assert_eq!(c.params().range, DepthRange::new(2500, 3000));
}

#[test]
fn composites_and_audio_reach_the_recorder() {
    let recorder = Arc::new(RecordingPipeline::default());
    let sink = InMemorySink::new();
    let handle = sink.handle();
    recorder
        .activate(
            SinkConfig {
                size: size(),
                fps: Fps::default(),
                audio: None,
            },
            move || Ok(Box::new(sink) as Box<dyn EncoderSink>),
        )
        .unwrap();

    let mut c = coordinator().with_recorder(recorder.clone());
    assert!(c.on_audio(vec![0; 4]));
    c.on_frame(sensor(5, 1000), Instant::now()).unwrap();
    assert_eq!(c.stats().recorded, 1);

    let stats = recorder.deactivate().unwrap();
    assert_eq!(stats.paired, 1);
    assert_eq!(handle.snapshot().video_seqs(), vec![0]);
    // Not recording any more.
    assert!(!c.on_audio(vec![0; 4]));
}

#[test]
fn spawned_coordinator_processes_queued_frames() {
    let (tx, rx) = mpsc::channel();
    let handle = spawn_coordinator(coordinator(), 8, move |out| {
        let _ = tx.send(out);
    })
    .unwrap();
    assert!(handle.submit(sensor(1, 1000)));
    assert!(handle.submit_blocking(sensor(2, 1000)));
    assert!(!handle.submit_audio(vec![1]));
    let c = handle.finish().unwrap();
    assert_eq!(c.stats().composites, 2);
    let outs: Vec<PixelBuffer> = rx.iter().collect();
    assert_eq!(outs.len(), 2);
    assert_eq!(outs[1].pixel(0), [2, 2, 2, 255]);
}
