use super::*;
use crate::filter::halo::generate_halo;
use crate::foundation::core::{DepthRange, FrameSize};
use crate::frame::buffers::{DepthBuffer, DepthSpacePoint, DepthToColorMap};

#[test]
fn composite_mixes_live_and_held_per_pixel() {
    let color = FrameSize::new(4, 1).unwrap();
    let live = PixelBuffer::from_fn(color, |x, _| [x as u8, 0, 0, 255]);
    let held = PixelBuffer::filled(color, [200, 200, 200, 255]);
    let depth = DepthBuffer::new(FrameSize::new(4, 1).unwrap(), vec![1000, 100, 1000, 1000]).unwrap();
    let map = DepthToColorMap::from_fn(color, |x, _| {
        if x == 3 {
            DepthSpacePoint::UNMAPPED
        } else {
            DepthSpacePoint::new(x as f32, 0.0)
        }
    });
    let halo = generate_halo(0);
    let inputs = CompositeInputs {
        live: &live,
        held: &held,
        depth: &depth,
        map: &map,
        halo: halo.as_slice(),
        range: DepthRange::new(500, 1500),
    };
    let out = SequentialBackend::new().composite(&inputs).unwrap();
    // Empty halo: only the unmapped pixel falls back.
    assert_eq!(out.pixel(0), [0, 0, 0, 255]);
    assert_eq!(out.pixel(1), [1, 0, 0, 255]);
    assert_eq!(out.pixel(2), [2, 0, 0, 255]);
    assert_eq!(out.pixel(3), [200, 200, 200, 255]);
}

#[test]
fn composite_with_center_only_halo_respects_range() {
    let color = FrameSize::new(2, 1).unwrap();
    let live = PixelBuffer::filled(color, [1, 2, 3, 4]);
    let held = PixelBuffer::filled(color, [5, 6, 7, 8]);
    let depth = DepthBuffer::new(color, vec![1000, 100]).unwrap();
    let map = DepthToColorMap::from_fn(color, |x, y| DepthSpacePoint::new(x as f32, y as f32));
    let halo = [crate::filter::halo::HaloOffset::new(0, 0)];
    let inputs = CompositeInputs {
        live: &live,
        held: &held,
        depth: &depth,
        map: &map,
        halo: &halo,
        range: DepthRange::new(500, 1500),
    };
    let out = SequentialBackend::new().composite(&inputs).unwrap();
    assert_eq!(out.pixel(0), [1, 2, 3, 4]);
    assert_eq!(out.pixel(1), [5, 6, 7, 8]);
}
