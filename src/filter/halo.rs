/// One neighbourhood offset in depth-buffer space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct HaloOffset {
    /// Column offset.
    pub dx: i32,
    /// Row offset.
    pub dy: i32,
}

impl HaloOffset {
    /// Create an offset.
    pub const fn new(dx: i32, dy: i32) -> Self {
        Self { dx, dy }
    }
}

/// Ordered diamond-shaped offset set produced by [`generate_halo`].
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct HaloOffsets {
    halo_size: i32,
    offsets: Vec<HaloOffset>,
}

impl HaloOffsets {
    /// The `halo_size` the set was generated from.
    pub fn halo_size(&self) -> i32 {
        self.halo_size
    }

    /// Offsets in generation order (rows top to bottom, columns left to right).
    pub fn as_slice(&self) -> &[HaloOffset] {
        &self.offsets
    }

    /// Number of offsets.
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    /// `true` when the set is empty (`halo_size <= 1`).
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }
}

/// Largest halo size the filter accepts. The offset count grows with the square of the size.
pub const MAX_HALO_SIZE: i32 = 64;

/// Generate the halo neighbourhood for `halo_size`.
///
/// With `xd = halo_size`, `yd = halo_size / 2` and `s = (xd + yd) / 2`, every `(x, y)` with
/// `y in [-yd, yd)`, `x in [-xd, xd)` and `|x| + |y| <= s` is included. The upper bounds are
/// half-open, so the diamond is one row and one column short on the positive side. That
/// asymmetry is part of the output format and must not be "fixed".
///
/// `halo_size <= 1` yields an empty set. Cost is quadratic in `halo_size`; callers bound it
/// with [`MAX_HALO_SIZE`].
pub fn generate_halo(halo_size: i32) -> HaloOffsets {
    let xd = halo_size;
    let yd = halo_size / 2;
    let s = (i64::from(xd) + i64::from(yd)) / 2;

    let mut offsets = Vec::new();
    for y in -yd..yd {
        for x in -xd..xd {
            if i64::from(x.abs()) + i64::from(y.abs()) <= s {
                offsets.push(HaloOffset::new(x, y));
            }
        }
    }

    HaloOffsets { halo_size, offsets }
}

#[cfg(test)]
#[path = "../../tests/unit/filter/halo.rs"]
mod tests;
