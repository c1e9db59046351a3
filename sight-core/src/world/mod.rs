//! Spatial indexing of the plane.

pub mod area_map;

pub use area_map::{AreaMap, CellSet, Coverage, CoverageListener};
