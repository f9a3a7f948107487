//! The per-pixel decision rule shared by every backend.
//!
//! For color pixel `i` the output is the held pixel, unless the mapped depth coordinate is in
//! bounds and every halo neighbour of it has a depth inside the accepted range, in which case
//! the live pixel is shown. Out-of-bounds neighbours count as invalid.

use crate::filter::halo::HaloOffset;
use crate::foundation::core::{Bgra8, DepthRange};
use crate::foundation::error::{HoldframeError, HoldframeResult};
use crate::foundation::math::round_half_away;
use crate::frame::buffers::{DepthBuffer, DepthSpacePoint, DepthToColorMap, PixelBuffer};

/// Borrowed inputs of one compositing pass.
#[derive(Clone, Copy, Debug)]
pub struct CompositeInputs<'a> {
    /// The incoming camera frame.
    pub live: &'a PixelBuffer,
    /// The last composite (fallback source).
    pub held: &'a PixelBuffer,
    /// Depth samples.
    pub depth: &'a DepthBuffer,
    /// Color-pixel to depth-space map.
    pub map: &'a DepthToColorMap,
    /// Halo neighbourhood.
    pub halo: &'a [HaloOffset],
    /// Accepted depth window.
    pub range: DepthRange,
}

impl CompositeInputs<'_> {
    /// Check that live, held and map agree on the color frame size.
    pub fn validate(&self) -> HoldframeResult<()> {
        let size = self.live.size();
        if self.held.size() != size {
            return Err(HoldframeError::invalid_geometry(format!(
                "held frame is {}, live frame is {size}",
                self.held.size()
            )));
        }
        if self.map.color_size() != size {
            return Err(HoldframeError::invalid_geometry(format!(
                "depth-to-color map is for {}, live frame is {size}",
                self.map.color_size()
            )));
        }
        Ok(())
    }
}

/// Round a depth-space point to integer depth coordinates. `None` for unmapped points.
#[inline]
pub fn depth_coordinate(p: DepthSpacePoint) -> Option<(i32, i32)> {
    if !p.is_mapped() {
        return None;
    }
    Some((round_half_away(p.x), round_half_away(p.y)))
}

/// `true` when every halo neighbour of `(cx, cy)` is in bounds and inside `range`.
#[inline]
pub fn halo_all_within(
    depth: &DepthBuffer,
    cx: i32,
    cy: i32,
    halo: &[HaloOffset],
    range: DepthRange,
) -> bool {
    halo.iter().all(|o| {
        depth
            .get(cx.saturating_add(o.dx), cy.saturating_add(o.dy))
            .is_some_and(|d| range.contains(d))
    })
}

/// Decide whether the live pixel mapped to `p` may be shown.
#[inline]
pub fn is_live_valid(
    p: DepthSpacePoint,
    depth: &DepthBuffer,
    halo: &[HaloOffset],
    range: DepthRange,
) -> bool {
    let Some((dx, dy)) = depth_coordinate(p) else {
        return false;
    };
    depth.size().contains(dx, dy) && halo_all_within(depth, dx, dy, halo, range)
}

/// Output pixel for color index `i`.
#[inline]
pub fn choose_pixel(inputs: &CompositeInputs<'_>, i: usize) -> Bgra8 {
    if is_live_valid(inputs.map.point(i), inputs.depth, inputs.halo, inputs.range) {
        inputs.live.pixel(i)
    } else {
        inputs.held.pixel(i)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/filter/rule.rs"]
mod tests;
