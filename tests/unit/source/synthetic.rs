use super::*;

fn source(seed: u64) -> SyntheticSource {
    SyntheticSource::new(
        FrameSize::new(64, 48).unwrap(),
        FrameSize::new(32, 24).unwrap(),
        Fps::default(),
        seed,
    )
}

#[test]
fn same_seed_same_stream() {
    let mut a = source(7);
    let mut b = source(7);
    for _ in 0..3 {
        let fa = a.next_frame();
        let fb = b.next_frame();
        assert_eq!(fa.color, fb.color);
        assert_eq!(fa.depth, fb.depth);
    }
    assert_eq!(a.next_audio(32), b.next_audio(32));
    assert_eq!(a.frames_emitted(), 3);
}

#[test]
fn frames_have_configured_sizes_and_both_depth_planes() {
    let mut s = source(1);
    let f = s.next_frame();
    assert_eq!(f.color.unwrap().size(), s.color_size());
    let depth = f.depth.unwrap();
    assert_eq!(depth.size(), s.depth_size());
    assert!(depth.samples().contains(&FOREGROUND_DEPTH));
    assert!(depth.samples().contains(&BACKGROUND_DEPTH));
}

#[test]
fn map_has_unmapped_border_and_scaled_interior() {
    let mut s = source(1);
    let map = s.next_frame().map.unwrap();
    assert!(!map.point(0).is_mapped());
    assert!(!map.point(63).is_mapped());
    let p = map.point(10 * 64 + 10);
    assert_eq!(p, DepthSpacePoint::new(5.0, 5.0));
}

#[test]
fn audio_length_matches_format() {
    let mut s = source(1);
    assert_eq!(s.next_audio(100).len(), 400);
    let mut s = source(1).with_audio_format(AudioFormat {
        sample_rate: 8_000,
        channels: 2,
        sample_format: SampleFormat::I16,
    });
    assert_eq!(s.next_audio(100).len(), 400);
}
