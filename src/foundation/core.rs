use crate::foundation::error::{HoldframeError, HoldframeResult};

/// One BGRA8 color sample, in memory order `[b, g, r, a]`.
pub type Bgra8 = [u8; 4];

/// Bytes per BGRA8 pixel.
pub const BGRA_BYTES: usize = 4;

/// Pixel dimensions of a buffer. Fixed for the lifetime of a video stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct FrameSize {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl FrameSize {
    /// Create a validated size with both dimensions non-zero.
    pub fn new(width: u32, height: u32) -> HoldframeResult<Self> {
        if width == 0 || height == 0 {
            return Err(HoldframeError::invalid_geometry(format!(
                "frame size must be non-zero, got {width}x{height}"
            )));
        }
        Ok(Self { width, height })
    }

    /// Number of pixels (`width * height`).
    pub fn pixel_count(self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// Return `true` when the signed coordinate lies inside the buffer.
    pub fn contains(self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.width && (y as u32) < self.height
    }

    /// Linear index of `(x, y)`. Caller guarantees the coordinate is in bounds.
    pub fn index_of(self, x: u32, y: u32) -> usize {
        (y as usize) * (self.width as usize) + (x as usize)
    }
}

impl std::fmt::Display for FrameSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Frames-per-second represented as a rational `num/den`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    /// Numerator (frames).
    pub num: u32,
    /// Denominator (seconds), must be non-zero.
    pub den: u32,
}

impl Fps {
    /// Create a validated FPS value.
    pub fn new(num: u32, den: u32) -> HoldframeResult<Self> {
        if den == 0 {
            return Err(HoldframeError::validation("Fps den must be > 0"));
        }
        if num == 0 {
            return Err(HoldframeError::validation("Fps num must be > 0"));
        }
        Ok(Self { num, den })
    }

    /// Convert to floating-point FPS.
    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }
}

impl Default for Fps {
    fn default() -> Self {
        Self { num: 30, den: 1 }
    }
}

/// Inclusive depth window `[near, far]` in sensor units (millimetres for Kinect v2).
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DepthRange {
    /// Smallest accepted depth.
    pub near: u16,
    /// Largest accepted depth.
    pub far: u16,
}

impl DepthRange {
    /// Create a range. `near > far` is allowed and simply accepts nothing.
    pub fn new(near: u16, far: u16) -> Self {
        Self { near, far }
    }

    /// Inclusive containment test.
    #[inline]
    pub fn contains(self, depth: u16) -> bool {
        self.near <= depth && depth <= self.far
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
