// Wrapper types making it harder to accidentaly mix up packed and unpacked cell coordinates.

use std::fmt::{self, Display};

/// A cell position on the discretized plane.
///
/// Packs into a single `i64` key with `z` in the upper half and `x` in the
/// lower half, so every `(x, z)` pair maps to exactly one key and back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CellPos {
    /// The x coordinate.
    pub x: i32,
    /// The z coordinate.
    pub z: i32,
}

impl CellPos {
    /// Creates a new cell position.
    #[must_use]
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Packs this position into a cell key.
    #[must_use]
    pub const fn as_i64(self) -> i64 {
        pack(self.x, self.z)
    }

    /// Unpacks a cell key produced by [`CellPos::as_i64`] or [`pack`].
    #[must_use]
    pub const fn from_i64(key: i64) -> Self {
        Self {
            x: unpack_x(key),
            z: unpack_z(key),
        }
    }

    /// Returns the cell containing the given world coordinates for a grid of `cell_size`
    /// world units per cell.
    ///
    /// # Panics
    /// Panics if `cell_size` is zero.
    #[must_use]
    pub fn containing(world_x: f64, world_z: f64, cell_size: u32) -> Self {
        assert!(cell_size > 0, "cell size must be positive");
        let size = f64::from(cell_size);
        Self {
            x: (world_x / size).floor() as i32,
            z: (world_z / size).floor() as i32,
        }
    }

    /// Chebyshev distance between two cells.
    #[must_use]
    pub fn chebyshev_distance(self, other: Self) -> u32 {
        let dx = self.x.abs_diff(other.x);
        let dz = self.z.abs_diff(other.z);
        dx.max(dz)
    }
}

impl Display for CellPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.x, self.z)
    }
}

impl From<i64> for CellPos {
    fn from(key: i64) -> Self {
        Self::from_i64(key)
    }
}

impl From<CellPos> for i64 {
    fn from(pos: CellPos) -> Self {
        pos.as_i64()
    }
}

/// Packs a coordinate pair into a cell key.
#[inline]
#[must_use]
pub const fn pack(x: i32, z: i32) -> i64 {
    ((z as i64) << 32) | (x as u32 as i64)
}

/// Extracts the x coordinate from a cell key.
#[inline]
#[must_use]
pub const fn unpack_x(key: i64) -> i32 {
    key as i32
}

/// Extracts the z coordinate from a cell key.
#[inline]
#[must_use]
pub const fn unpack_z(key: i64) -> i32 {
    (key >> 32) as i32
}
