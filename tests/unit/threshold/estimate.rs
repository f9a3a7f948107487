use super::*;
use crate::foundation::core::FrameSize;

fn depth(w: u32, h: u32, samples: Vec<u16>) -> DepthBuffer {
    DepthBuffer::new(FrameSize::new(w, h).unwrap(), samples).unwrap()
}

#[test]
fn max_of_samples() {
    assert_eq!(depth_max(&[3, 900, 12, 899]), 900);
    assert_eq!(depth_max(&[]), 0);
}

#[test]
fn mode_ignores_zero_and_prefers_first_to_reach_count() {
    assert_eq!(depth_mode(&[0, 0, 0, 7, 7, 9]), 7);
    // 5 and 6 both reach two; 6 gets there first.
    assert_eq!(depth_mode(&[5, 6, 6, 5]), 6);
    // Equal counts of one: first sample wins.
    assert_eq!(depth_mode(&[4, 3, 2]), 4);
    assert_eq!(depth_mode(&[0, 0]), 0);
}

#[test]
fn smoothed_center_of_uniform_buffer_is_the_value() {
    let d = DepthBuffer::filled(FrameSize::new(5, 5).unwrap(), 1234);
    assert_eq!(smoothed_center(&d), 1234);
}

#[test]
fn smoothed_center_uses_integer_center_and_zero_padding() {
    // 2x2: center is (1, 1); only (0,0),(1,0),(0,1),(1,1) exist.
    let d = depth(2, 2, vec![900, 900, 900, 900]);
    assert_eq!(smoothed_center(&d), 400);
    // 1x1: single sample, eight zero taps.
    let d = depth(1, 1, vec![95]);
    assert_eq!(smoothed_center(&d), 11);
}

#[test]
fn smoothed_center_rounds_to_nearest() {
    // Sum 5 over 9 taps is 0.55..., rounds up.
    let d = depth(3, 3, vec![0, 0, 0, 0, 5, 0, 0, 0, 0]);
    assert_eq!(smoothed_center(&d), 1);
    // Sum 4 is 0.44..., rounds down.
    let d = depth(3, 3, vec![0, 0, 0, 0, 4, 0, 0, 0, 0]);
    assert_eq!(smoothed_center(&d), 0);
}

#[test]
fn all_zero_buffer_clamps_to_min() {
    let d = DepthBuffer::filled(FrameSize::new(4, 4).unwrap(), 0);
    let bounds = ThresholdBounds::new(500, 4500).unwrap();
    assert_eq!(estimate_far_threshold(&d, bounds), 500);
    let est = ThresholdEstimate::compute(&d);
    assert_eq!(est, ThresholdEstimate { max: 0, mode: 0, smoothed_center: 0 });
}

#[test]
fn far_threshold_is_clamped_to_max() {
    let d = DepthBuffer::filled(FrameSize::new(3, 3).unwrap(), 8000);
    let bounds = ThresholdBounds::new(500, 4500).unwrap();
    assert_eq!(estimate_far_threshold(&d, bounds), 4500);
}

#[test]
fn method_selects_heuristic() {
    let d = depth(3, 3, vec![100, 100, 100, 100, 1000, 100, 100, 100, 3000]);
    let bounds = ThresholdBounds::new(0, u16::MAX).unwrap();
    assert_eq!(estimate_far_threshold_with(&d, bounds, ThresholdMethod::Max), 3000);
    assert_eq!(estimate_far_threshold_with(&d, bounds, ThresholdMethod::Mode), 100);
    // (7 * 100 + 1000 + 3000) / 9 = 522.2
    assert_eq!(
        estimate_far_threshold_with(&d, bounds, ThresholdMethod::SmoothedCenter),
        522
    );
}

#[test]
fn inverted_bounds_are_rejected() {
    assert!(matches!(
        ThresholdBounds::new(10, 5),
        Err(HoldframeError::InvalidGeometry(_))
    ));
}

#[test]
fn near_threshold_saturates() {
    assert_eq!(derive_near_threshold(1500, 500), 1000);
    assert_eq!(derive_near_threshold(300, 500), 0);
}

#[test]
fn method_serde_is_snake_case() {
    assert_eq!(
        serde_json::to_string(&ThresholdMethod::SmoothedCenter).unwrap(),
        "\"smoothed_center\""
    );
}
