use super::*;

fn size(w: u32, h: u32) -> FrameSize {
    FrameSize::new(w, h).unwrap()
}

#[test]
fn pixel_buffer_rejects_wrong_length() {
    assert!(PixelBuffer::new(size(2, 2), vec![0; 15]).is_err());
    assert!(PixelBuffer::new(size(2, 2), vec![0; 16]).is_ok());
}

#[test]
fn pixel_accessors_use_bgra_order() {
    let mut buf = PixelBuffer::filled(size(2, 1), [1, 2, 3, 4]);
    buf.set_pixel(1, [10, 20, 30, 40]);
    assert_eq!(buf.pixel(0), [1, 2, 3, 4]);
    assert_eq!(buf.pixel(1), [10, 20, 30, 40]);
    assert_eq!(buf.to_rgba8(), vec![3, 2, 1, 4, 30, 20, 10, 40]);
}

#[test]
fn from_fn_is_row_major() {
    let buf = PixelBuffer::from_fn(size(3, 2), |x, y| [x as u8, y as u8, 0, 255]);
    assert_eq!(buf.pixel(4), [1, 1, 0, 255]);
}

#[test]
fn depth_get_is_bounds_checked() {
    let depth = DepthBuffer::new(size(2, 2), vec![1, 2, 3, 4]).unwrap();
    assert_eq!(depth.get(1, 1), Some(4));
    assert_eq!(depth.get(2, 0), None);
    assert_eq!(depth.get(-1, 0), None);
    assert!(DepthBuffer::new(size(2, 2), vec![0; 3]).is_err());
}

#[test]
fn sentinel_and_non_finite_points_are_unmapped() {
    assert!(!DepthSpacePoint::UNMAPPED.is_mapped());
    assert!(!DepthSpacePoint::new(f32::NEG_INFINITY, 2.0).is_mapped());
    assert!(!DepthSpacePoint::new(1.0, f32::NAN).is_mapped());
    assert!(DepthSpacePoint::new(-3.0, 2.0).is_mapped());
}

#[test]
fn map_length_must_match_color_size() {
    assert!(DepthToColorMap::new(size(2, 2), vec![DepthSpacePoint::UNMAPPED; 3]).is_err());
    let m = DepthToColorMap::unmapped(size(2, 2));
    assert_eq!(m.points().len(), 4);
    assert!(!m.point(3).is_mapped());
}
