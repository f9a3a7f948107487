use super::*;

#[test]
fn reports_frames_counted_in_each_window() {
    let t0 = Instant::now();
    let mut c = FpsCounter::new();
    for i in 0..30u64 {
        assert_eq!(c.tick(t0 + Duration::from_millis(i * 33)), None);
    }
    assert_eq!(c.fps(), 0);
    assert_eq!(c.tick(t0 + Duration::from_millis(1000)), Some(31));
    assert_eq!(c.fps(), 31);
    // New window starts at the closing tick.
    assert_eq!(c.tick(t0 + Duration::from_millis(1500)), None);
    assert_eq!(c.tick(t0 + Duration::from_millis(2000)), Some(2));
}
