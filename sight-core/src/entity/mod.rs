//! Tracked objects and observers
//!
//! Objects and observers are owned by the host; the tracker only sees their
//! handles and reads their state through [`TrackingHost`] each tick.

pub mod nearby_tracker;

use std::fmt::{self, Display};

use sight_utils::CellPos;

/// Handle of an object that can be seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u32);

impl Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "object#{}", self.0)
    }
}

/// Handle of an observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(pub u32);

impl Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "observer#{}", self.0)
    }
}

/// The host simulation as seen by the tracker.
///
/// Positions are pulled on demand every tick. Notifications default to no-ops
/// so hosts only implement what they act on.
pub trait TrackingHost {
    /// The cell the object currently occupies.
    fn object_cell(&self, object: ObjectId) -> CellPos;

    /// How far the object can be seen, in world units.
    fn object_sight_distance(&self, object: ObjectId) -> u32;

    /// Whether the object moved since its last tick.
    fn object_position_updated(&self, object: ObjectId) -> bool;

    /// Clears the moved flag after the object was ticked.
    fn clear_object_position_updated(&mut self, object: ObjectId);

    /// The cell the observer currently occupies.
    fn observer_cell(&self, observer: ObserverId) -> CellPos;

    /// Whether the observer moved since the last tick, clearing the flag.
    fn take_observer_position_updated(&mut self, observer: ObserverId) -> bool;

    /// The object representing the observer itself, which it never tracks.
    fn observer_entity(&self, _observer: ObserverId) -> Option<ObjectId> {
        None
    }

    /// The observer started tracking the object.
    fn on_track_start(&mut self, _observer: ObserverId, _object: ObjectId) {}

    /// The observer stopped tracking the object.
    fn on_track_stop(&mut self, _observer: ObserverId, _object: ObjectId) {}

    /// A tracked pair moved; the host should resync the object for the observer.
    fn on_track_update(&mut self, _observer: ObserverId, _object: ObjectId) {}

    /// Called once per tick for every registered object, watched or not.
    fn on_object_tick(&mut self, _object: ObjectId) {}
}
