use crate::foundation::core::{BGRA_BYTES, Bgra8, FrameSize};
use crate::foundation::error::{HoldframeError, HoldframeResult};

/// A BGRA8 color frame, tightly packed, row-major.
///
/// Owned by whichever stage currently holds it; hand-off into a queue moves it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    size: FrameSize,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Wrap raw BGRA8 bytes. `data.len()` must equal `width * height * 4`.
    pub fn new(size: FrameSize, data: Vec<u8>) -> HoldframeResult<Self> {
        let expected = size.pixel_count() * BGRA_BYTES;
        if data.len() != expected {
            return Err(HoldframeError::invalid_geometry(format!(
                "pixel buffer for {size} needs {expected} bytes, got {}",
                data.len()
            )));
        }
        Ok(Self { size, data })
    }

    /// A buffer with every pixel set to `px`.
    pub fn filled(size: FrameSize, px: Bgra8) -> Self {
        Self {
            size,
            data: px.repeat(size.pixel_count()),
        }
    }

    /// Build a buffer by evaluating `f(x, y)` for every pixel.
    pub fn from_fn(size: FrameSize, mut f: impl FnMut(u32, u32) -> Bgra8) -> Self {
        let mut data = Vec::with_capacity(size.pixel_count() * BGRA_BYTES);
        for y in 0..size.height {
            for x in 0..size.width {
                data.extend_from_slice(&f(x, y));
            }
        }
        Self { size, data }
    }

    /// Frame dimensions.
    pub fn size(&self) -> FrameSize {
        self.size
    }

    /// Number of pixels.
    pub fn len_pixels(&self) -> usize {
        self.size.pixel_count()
    }

    /// Pixel at linear index `i`.
    #[inline]
    pub fn pixel(&self, i: usize) -> Bgra8 {
        let o = i * BGRA_BYTES;
        [
            self.data[o],
            self.data[o + 1],
            self.data[o + 2],
            self.data[o + 3],
        ]
    }

    /// Overwrite the pixel at linear index `i`.
    #[inline]
    pub fn set_pixel(&mut self, i: usize, px: Bgra8) {
        let o = i * BGRA_BYTES;
        self.data[o..o + BGRA_BYTES].copy_from_slice(&px);
    }

    /// Raw BGRA8 bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Copy into a new RGBA8 byte vector (for image encoders).
    pub fn to_rgba8(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.data.len());
        for px in self.data.chunks_exact(BGRA_BYTES) {
            out.extend_from_slice(&[px[2], px[1], px[0], px[3]]);
        }
        out
    }
}

/// A 16-bit depth frame (sensor units), row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DepthBuffer {
    size: FrameSize,
    data: Vec<u16>,
}

impl DepthBuffer {
    /// Wrap raw depth samples. `data.len()` must equal `width * height`.
    pub fn new(size: FrameSize, data: Vec<u16>) -> HoldframeResult<Self> {
        if data.len() != size.pixel_count() {
            return Err(HoldframeError::invalid_geometry(format!(
                "depth buffer for {size} needs {} samples, got {}",
                size.pixel_count(),
                data.len()
            )));
        }
        Ok(Self { size, data })
    }

    /// A buffer with every sample set to `depth`.
    pub fn filled(size: FrameSize, depth: u16) -> Self {
        Self {
            size,
            data: vec![depth; size.pixel_count()],
        }
    }

    /// Build a buffer by evaluating `f(x, y)` for every sample.
    pub fn from_fn(size: FrameSize, mut f: impl FnMut(u32, u32) -> u16) -> Self {
        let mut data = Vec::with_capacity(size.pixel_count());
        for y in 0..size.height {
            for x in 0..size.width {
                data.push(f(x, y));
            }
        }
        Self { size, data }
    }

    /// Frame dimensions.
    pub fn size(&self) -> FrameSize {
        self.size
    }

    /// All samples in row-major order.
    pub fn samples(&self) -> &[u16] {
        &self.data
    }

    /// Mutable samples in row-major order.
    pub fn samples_mut(&mut self) -> &mut [u16] {
        &mut self.data
    }

    /// Sample at `(x, y)`, or `None` when out of bounds.
    #[inline]
    pub fn get(&self, x: i32, y: i32) -> Option<u16> {
        if !self.size.contains(x, y) {
            return None;
        }
        Some(self.data[self.size.index_of(x as u32, y as u32)])
    }
}

/// A floating point coordinate in depth-buffer space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DepthSpacePoint {
    /// Column in depth space.
    pub x: f32,
    /// Row in depth space.
    pub y: f32,
}

impl DepthSpacePoint {
    /// The "no depth correspondence" sentinel reported by coordinate mappers.
    pub const UNMAPPED: Self = Self {
        x: f32::NEG_INFINITY,
        y: f32::NEG_INFINITY,
    };

    /// Create a point.
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// `false` for the sentinel and for any point with a non-finite coordinate.
    #[inline]
    pub fn is_mapped(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Per-color-pixel lookup into depth space.
#[derive(Clone, Debug, PartialEq)]
pub struct DepthToColorMap {
    color_size: FrameSize,
    points: Vec<DepthSpacePoint>,
}

impl DepthToColorMap {
    /// Wrap mapped points. `points.len()` must equal the color pixel count.
    pub fn new(color_size: FrameSize, points: Vec<DepthSpacePoint>) -> HoldframeResult<Self> {
        if points.len() != color_size.pixel_count() {
            return Err(HoldframeError::invalid_geometry(format!(
                "depth-to-color map for {color_size} needs {} points, got {}",
                color_size.pixel_count(),
                points.len()
            )));
        }
        Ok(Self { color_size, points })
    }

    /// A map where no color pixel has a depth correspondence.
    pub fn unmapped(color_size: FrameSize) -> Self {
        Self {
            color_size,
            points: vec![DepthSpacePoint::UNMAPPED; color_size.pixel_count()],
        }
    }

    /// Build a map by evaluating `f(x, y)` for every color pixel.
    pub fn from_fn(
        color_size: FrameSize,
        mut f: impl FnMut(u32, u32) -> DepthSpacePoint,
    ) -> Self {
        let mut points = Vec::with_capacity(color_size.pixel_count());
        for y in 0..color_size.height {
            for x in 0..color_size.width {
                points.push(f(x, y));
            }
        }
        Self { color_size, points }
    }

    /// Color frame dimensions this map was built for.
    pub fn color_size(&self) -> FrameSize {
        self.color_size
    }

    /// Point for color pixel `i`.
    #[inline]
    pub fn point(&self, i: usize) -> DepthSpacePoint {
        self.points[i]
    }

    /// All points in color row-major order.
    pub fn points(&self) -> &[DepthSpacePoint] {
        &self.points
    }
}

#[cfg(test)]
#[path = "../../tests/unit/frame/buffers.rs"]
mod tests;
