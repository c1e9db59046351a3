//! Per-tick reconciliation of observers against the proximity index.
//!
//! Every tick the tracker pushes moved objects into the [`AreaMap`], diffs each
//! observer's tracked set against the objects covering its cell, and ticks
//! every registered object.

use rustc_hash::{FxHashMap, FxHashSet};
use sight_utils::ObjectPool;

use super::{ObjectId, ObserverId, TrackingHost};
use crate::config::{TrackingConfig, sight_radius};
use crate::error::{ConfigError, TrackingError};
use crate::world::area_map::AreaMap;

/// Tracked sets are trimmed back to this many slots when an observer leaves.
const POOLED_TRACKED_CAPACITY: usize = 4;

/// What the last tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickStats {
    /// Objects whose cell or radius changed.
    pub moved: usize,
    /// Start notifications sent.
    pub started: usize,
    /// Stop notifications sent.
    pub stopped: usize,
    /// Update notifications sent.
    pub updated: usize,
    /// Objects ticked.
    pub ticked: usize,
}

/// The cell and radius last pushed into the index for an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LastCoverage {
    cell: i64,
    radius: u32,
}

/// Decides which objects every observer tracks.
///
/// An (observer, object) pair goes untracked -> tracked -> untracked, with
/// exactly one start and one stop notification per round trip.
pub struct NearbyTracker {
    area_map: AreaMap<ObjectId>,
    /// Observer -> objects it received a start for and no stop yet.
    observer_tracked: FxHashMap<ObserverId, FxHashSet<ObjectId>>,
    object_last: FxHashMap<ObjectId, LastCoverage>,
    /// Objects removed since the last tick. Observers stop them even if the
    /// handle was added back in the meantime.
    removed: FxHashSet<ObjectId>,
    tracked_sets: ObjectPool<FxHashSet<ObjectId>>,
    /// Reused every tick.
    tick_list: Vec<ObjectId>,
    cell_size: u32,
    radius_margin: u32,
}

impl NearbyTracker {
    /// Creates an empty tracker.
    pub fn new(config: &TrackingConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let tracked_sets = ObjectPool::new(
            config.pool_capacity,
            FxHashSet::default,
            FxHashSet::clear,
        )
        .with_shrink(|set: &mut FxHashSet<ObjectId>| set.shrink_to(POOLED_TRACKED_CAPACITY));

        Ok(Self {
            area_map: AreaMap::new(config.pool_capacity),
            observer_tracked: FxHashMap::default(),
            object_last: FxHashMap::default(),
            removed: FxHashSet::default(),
            tracked_sets,
            tick_list: Vec::new(),
            cell_size: config.cell_size,
            radius_margin: config.radius_margin,
        })
    }

    /// Coverage radius in cells for a sight distance in world units.
    #[must_use]
    pub fn radius_for(&self, sight_distance: u32) -> u32 {
        sight_radius(self.cell_size, self.radius_margin, sight_distance)
    }

    /// Starts tracking an object at its current position.
    pub fn add_object<H>(&mut self, object: ObjectId, host: &H) -> Result<(), TrackingError>
    where
        H: TrackingHost + ?Sized,
    {
        let cell = host.object_cell(object);
        let radius = self.radius_for(host.object_sight_distance(object));
        self.area_map.register(object, cell.x, cell.z, radius)?;
        self.object_last.insert(
            object,
            LastCoverage {
                cell: cell.as_i64(),
                radius,
            },
        );
        log::debug!("Tracking {object} at {cell} with radius {radius}");
        Ok(())
    }

    /// Stops tracking an object.
    ///
    /// Observers that saw it get their stop on the next tick, followed by a fresh
    /// start if the same handle is added back before then. Returns false if the
    /// object was not tracked.
    pub fn remove_object(&mut self, object: ObjectId) -> Result<bool, TrackingError> {
        self.object_last.remove(&object);
        let removed = self.area_map.unregister(object)?;
        if removed {
            self.removed.insert(object);
            log::debug!("Stopped tracking {object}");
        }
        Ok(removed)
    }

    /// Adds an observer with nothing tracked yet.
    pub fn add_observer(&mut self, observer: ObserverId) -> Result<(), TrackingError> {
        if self.observer_tracked.contains_key(&observer) {
            return Err(TrackingError::ObserverAlreadyAdded(observer));
        }
        let tracked = self.tracked_sets.alloc();
        self.observer_tracked.insert(observer, tracked);
        log::debug!("Added {observer}");
        Ok(())
    }

    /// Removes an observer, sending a stop for everything it tracked before returning.
    ///
    /// Returns false if the observer was unknown.
    pub fn remove_observer<H>(&mut self, observer: ObserverId, host: &mut H) -> bool
    where
        H: TrackingHost + ?Sized,
    {
        let Some(tracked) = self.observer_tracked.remove(&observer) else {
            return false;
        };
        for &object in &tracked {
            host.on_track_stop(observer, object);
        }
        log::debug!("Removed {observer}, stopped {} objects", tracked.len());
        self.tracked_sets.release(tracked);
        true
    }

    /// Runs one tracking cycle.
    pub fn tick<H>(&mut self, host: &mut H) -> Result<TickStats, TrackingError>
    where
        H: TrackingHost + ?Sized,
    {
        let mut stats = TickStats::default();

        // Push cell or radius changes into the index.
        let (cell_size, margin) = (self.cell_size, self.radius_margin);
        for (&object, last) in &mut self.object_last {
            let cell = host.object_cell(object);
            let current = LastCoverage {
                cell: cell.as_i64(),
                radius: sight_radius(cell_size, margin, host.object_sight_distance(object)),
            };
            if current != *last {
                self.area_map
                    .update(object, cell.x, cell.z, current.radius)?;
                *last = current;
                stats.moved += 1;
            }
        }

        self.tick_list.clear();
        self.tick_list.extend(self.area_map.query_all());

        let removed = &self.removed;
        for (&observer, tracked) in &mut self.observer_tracked {
            let observer_moved = host.take_observer_position_updated(observer);
            let own_entity = host.observer_entity(observer);
            let candidates = self.area_map.query(host.observer_cell(observer).as_i64());

            tracked.retain(|&object| {
                if candidates.contains(&object)
                    && Some(object) != own_entity
                    && !removed.contains(&object)
                {
                    if observer_moved || host.object_position_updated(object) {
                        host.on_track_update(observer, object);
                        stats.updated += 1;
                    }
                    true
                } else {
                    host.on_track_stop(observer, object);
                    stats.stopped += 1;
                    false
                }
            });

            for &object in candidates {
                if Some(object) == own_entity {
                    continue;
                }
                if tracked.insert(object) {
                    host.on_track_start(observer, object);
                    stats.started += 1;
                }
            }
        }

        for &object in &self.tick_list {
            host.on_object_tick(object);
            host.clear_object_position_updated(object);
        }
        stats.ticked = self.tick_list.len();
        self.removed.clear();

        #[cfg(feature = "validate")]
        self.area_map.validate()?;

        log::trace!("Tracking tick: {stats:?}");
        Ok(stats)
    }

    /// Returns true if the observer currently tracks the object.
    #[must_use]
    pub fn is_tracking(&self, observer: ObserverId, object: ObjectId) -> bool {
        self.observer_tracked
            .get(&observer)
            .is_some_and(|tracked| tracked.contains(&object))
    }

    /// Objects the observer currently tracks, or `None` for an unknown observer.
    #[must_use]
    pub fn tracked_by(&self, observer: ObserverId) -> Option<&FxHashSet<ObjectId>> {
        self.observer_tracked.get(&observer)
    }

    /// Number of tracked objects.
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.object_last.len()
    }

    /// Number of observers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.observer_tracked.len()
    }

    /// The underlying proximity index.
    #[must_use]
    pub fn area_map(&self) -> &AreaMap<ObjectId> {
        &self.area_map
    }

    /// Idle tracked sets waiting in the pool.
    #[must_use]
    pub fn pooled_tracked_sets(&self) -> usize {
        self.tracked_sets.len()
    }
}
