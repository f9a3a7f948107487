use super::*;
use crate::foundation::core::FrameSize;

#[test]
fn sidecar_audio_path_replaces_extension() {
    let opts = FfmpegSinkOpts::new("out/session.mp4");
    assert_eq!(opts.audio_path(), PathBuf::from("out/session.wav"));
    assert!(opts.overwrite);
}

#[test]
fn odd_frame_sizes_fail_to_open() {
    let mut sink = FfmpegSink::new(FfmpegSinkOpts::new(std::env::temp_dir().join("odd.mp4")));
    let err = sink
        .begin(SinkConfig {
            size: FrameSize::new(3, 2).unwrap(),
            fps: Fps::default(),
            audio: None,
        })
        .unwrap_err();
    assert!(matches!(err, HoldframeError::EncodeOpenFailed(_)));
}

#[test]
fn writes_before_begin_fail() {
    let mut sink = FfmpegSink::new(FfmpegSinkOpts::new("never.mp4"));
    assert!(sink.write_sample(&SamplePair::default()).is_err());
    assert!(sink.end().is_err());
}
