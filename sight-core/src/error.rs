//! Error types of the tracking core.
//!
//! None of these are recoverable: every variant means a caller broke the
//! register/update/unregister protocol or the index lost its invariant.

use std::fmt::Debug;

use thiserror::Error;

use crate::entity::{ObjectId, ObserverId};

/// Errors raised by [`AreaMap`](crate::world::area_map::AreaMap).
#[derive(Debug, Error)]
pub enum AreaMapError<T: Debug> {
    /// The object was registered twice.
    #[error("{0:?} is already registered")]
    AlreadyRegistered(T),

    /// The object was updated before it was registered.
    #[error("tried to update {0:?} when not in map")]
    NotRegistered(T),

    /// A cell the object should cover does not exist.
    #[error("expected non-empty cell at [{x}, {z}]")]
    MissingCell {
        /// Cell x.
        x: i32,
        /// Cell z.
        z: i32,
    },

    /// A cell exists but does not contain the object.
    #[error("expected {object:?} in cell [{x}, {z}]")]
    MissingMember {
        /// The object.
        object: T,
        /// Cell x.
        x: i32,
        /// Cell z.
        z: i32,
    },

    /// The full structure does not match the recorded coverage.
    #[error("area map invariant violated: {0}")]
    Invariant(String),
}

/// Errors raised by [`NearbyTracker`](crate::entity::nearby_tracker::NearbyTracker).
#[derive(Debug, Error)]
pub enum TrackingError {
    /// The proximity index rejected an operation.
    #[error(transparent)]
    Index(#[from] AreaMapError<ObjectId>),

    /// The observer was added twice.
    #[error("observer {0:?} was already added")]
    ObserverAlreadyAdded(ObserverId),
}

/// A rejected [`TrackingConfig`](crate::config::TrackingConfig).
#[derive(Debug, Error)]
#[error("invalid tracking config: {0}")]
pub struct ConfigError(pub &'static str);

/// Result type for proximity index operations.
pub type AreaMapResult<T, R = ()> = Result<R, AreaMapError<T>>;
