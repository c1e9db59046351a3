//! # Sight Core
//!
//! Incremental proximity tracking: a cell-keyed inverse index of which objects
//! cover which cells, and a per-tick scheduler that turns index changes into
//! start, stop and update notifications for every observer.
#![warn(
    clippy::all,
    clippy::pedantic,
    clippy::cargo,
    missing_docs,
    clippy::unwrap_used
)]
#![allow(
    clippy::single_call_fn,
    clippy::multiple_inherent_impl,
    clippy::shadow_unrelated,
    clippy::missing_errors_doc,
    clippy::needless_pass_by_value,
    clippy::cargo_common_metadata
)]

pub mod config;
pub mod entity;
pub mod error;
pub mod world;

pub use config::{MAX_RADIUS, TrackingConfig};
pub use entity::nearby_tracker::{NearbyTracker, TickStats};
pub use entity::{ObjectId, ObserverId, TrackingHost};
pub use error::{AreaMapError, ConfigError, TrackingError};
pub use world::area_map::AreaMap;
