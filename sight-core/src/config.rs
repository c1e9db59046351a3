//! Tunables of the tracking core. Both are fixed once a tracker is built.

use serde::Deserialize;

use crate::error::ConfigError;

/// Configuration of a [`NearbyTracker`](crate::entity::nearby_tracker::NearbyTracker).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Width of a grid cell in world units.
    pub cell_size: u32,
    /// Maximum number of idle sets kept for reuse.
    pub pool_capacity: usize,
    /// Extra cells added to every coverage radius.
    ///
    /// The default of 1 covers one ring more than `ceil(sight / cell_size)`;
    /// 0 covers exactly that.
    pub radius_margin: u32,
}

impl TrackingConfig {
    /// Largest accepted `radius_margin`.
    pub const MAX_RADIUS_MARGIN: u32 = 32;

    /// Checks the values are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cell_size == 0 {
            return Err(ConfigError("cell size must be positive"));
        }
        if self.pool_capacity == 0 {
            return Err(ConfigError("pool capacity must be positive"));
        }
        if self.radius_margin > Self::MAX_RADIUS_MARGIN {
            return Err(ConfigError("radius margin must be in range 0..=32"));
        }
        if !self.cell_size.is_power_of_two() {
            log::warn!(
                "Cell size {} is not a power of two, cell lookups cannot use shifts",
                self.cell_size
            );
        }
        Ok(())
    }

    /// Converts a sight distance in world units into a coverage radius in cells,
    /// capped at [`MAX_RADIUS`].
    #[must_use]
    pub fn radius_for(&self, sight_distance: u32) -> u32 {
        sight_radius(self.cell_size, self.radius_margin, sight_distance)
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            cell_size: 16,
            pool_capacity: 8192,
            radius_margin: 1,
        }
    }
}

/// Largest coverage radius in cells. Registering costs `(2r + 1)²` cell
/// insertions, so larger sight distances are cut down to this.
pub const MAX_RADIUS: u32 = 128;

/// `ceil(sight_distance / cell_size) + margin`, capped at [`MAX_RADIUS`].
#[inline]
pub(crate) fn sight_radius(cell_size: u32, margin: u32, sight_distance: u32) -> u32 {
    sight_distance
        .div_ceil(cell_size)
        .saturating_add(margin)
        .min(MAX_RADIUS)
}
