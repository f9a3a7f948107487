use super::*;

#[test]
fn params_layout_is_eight_words() {
    assert_eq!(std::mem::size_of::<Params>(), 32);
}

#[test]
fn kernel_source_declares_all_bindings() {
    for binding in 0..=6 {
        assert!(
            HOLD_FILTER_WGSL.contains(&format!("@binding({binding})")),
            "missing binding {binding}"
        );
    }
    assert!(HOLD_FILTER_WGSL.contains(&format!("@workgroup_size({WORKGROUP_SIZE})")));
}

#[test]
fn kernel_rounding_does_not_add_a_half() {
    assert!(HOLD_FILTER_WGSL.contains("let t = trunc(v);"));
    assert!(!HOLD_FILTER_WGSL.contains("abs(v) + 0.5"));
}

#[test]
fn sentinel_is_outside_kernel_coordinate_limit() {
    assert!(UNMAPPED_SENTINEL.abs() >= 1.0e9);
    assert!(HOLD_FILTER_WGSL.contains("const COORD_LIMIT: f32 = 1.0e9;"));
}
