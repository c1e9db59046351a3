//! A random-walk population standing in for a game world.
//!
//! The first `observers` walkers are players: each one is both an observer
//! and a tracked object, and never tracks itself.

use std::mem;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sight_core::{NearbyTracker, ObjectId, ObserverId, TrackingError, TrackingHost};
use sight_utils::CellPos;

use crate::config::SimulationConfig;

struct Walker {
    x: f64,
    z: f64,
    sight: u32,
    moved: bool,
    alive: bool,
}

/// Notification totals seen by the host.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventCounts {
    /// Start notifications.
    pub starts: u64,
    /// Stop notifications.
    pub stops: u64,
    /// Update notifications.
    pub updates: u64,
    /// Object ticks.
    pub object_ticks: u64,
}

/// The simulated world.
pub struct Simulation {
    walkers: Vec<Walker>,
    observer_moved: Vec<bool>,
    /// How many objects each observer currently sees.
    visible: Vec<u32>,
    rng: StdRng,
    cell_size: u32,
    config: SimulationConfig,
    counts: EventCounts,
}

impl Simulation {
    /// Places every walker at a random position.
    pub fn new(config: &SimulationConfig, cell_size: u32) -> Self {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let walkers = (0..config.objects)
            .map(|_| Walker {
                x: rng.random_range(-config.world_radius..config.world_radius),
                z: rng.random_range(-config.world_radius..config.world_radius),
                sight: rng.random_range(config.min_sight_distance..=config.max_sight_distance),
                moved: false,
                alive: true,
            })
            .collect();
        let observers = config.observers as usize;

        Self {
            walkers,
            observer_moved: vec![false; observers],
            visible: vec![0; observers],
            rng,
            cell_size,
            config: config.clone(),
            counts: EventCounts::default(),
        }
    }

    /// Registers every walker and observer with the tracker.
    pub fn populate(&self, tracker: &mut NearbyTracker) -> Result<(), TrackingError> {
        for id in 0..self.config.objects {
            tracker.add_object(ObjectId(id), self)?;
        }
        for id in 0..self.config.observers {
            tracker.add_observer(ObserverId(id))?;
        }
        Ok(())
    }

    /// Moves every live walker and despawns or respawns a few non-players.
    pub fn step(&mut self, tracker: &mut NearbyTracker) -> Result<(), TrackingError> {
        let bound = self.config.world_radius;
        let max_step = self.config.max_step;
        let observers = self.config.observers as usize;

        for (index, walker) in self.walkers.iter_mut().enumerate() {
            if !walker.alive || max_step == 0.0 {
                continue;
            }
            let dx = self.rng.random_range(-max_step..=max_step);
            let dz = self.rng.random_range(-max_step..=max_step);
            walker.x = (walker.x + dx).clamp(-bound, bound);
            walker.z = (walker.z + dz).clamp(-bound, bound);
            walker.moved = true;
            if index < observers {
                self.observer_moved[index] = true;
            }
        }

        for index in observers..self.walkers.len() {
            if !self.rng.random_bool(self.config.churn) {
                continue;
            }
            let object = ObjectId(index as u32);
            if self.walkers[index].alive {
                self.walkers[index].alive = false;
                tracker.remove_object(object)?;
            } else {
                let x = self.rng.random_range(-bound..bound);
                let z = self.rng.random_range(-bound..bound);
                let sight = self
                    .rng
                    .random_range(self.config.min_sight_distance..=self.config.max_sight_distance);
                let walker = &mut self.walkers[index];
                walker.x = x;
                walker.z = z;
                walker.sight = sight;
                walker.moved = true;
                walker.alive = true;
                tracker.add_object(object, &*self)?;
            }
        }
        Ok(())
    }

    /// Totals since the start.
    pub fn counts(&self) -> EventCounts {
        self.counts
    }

    /// Average number of objects an observer sees.
    pub fn mean_visible(&self) -> f64 {
        if self.visible.is_empty() {
            return 0.0;
        }
        let total: u64 = self.visible.iter().map(|&v| u64::from(v)).sum();
        total as f64 / self.visible.len() as f64
    }

    fn walker(&self, object: ObjectId) -> &Walker {
        &self.walkers[object.0 as usize]
    }

    fn cell_of(&self, walker: &Walker) -> CellPos {
        CellPos::containing(walker.x, walker.z, self.cell_size)
    }
}

impl TrackingHost for Simulation {
    fn object_cell(&self, object: ObjectId) -> CellPos {
        self.cell_of(self.walker(object))
    }

    fn object_sight_distance(&self, object: ObjectId) -> u32 {
        self.walker(object).sight
    }

    fn object_position_updated(&self, object: ObjectId) -> bool {
        self.walker(object).moved
    }

    fn clear_object_position_updated(&mut self, object: ObjectId) {
        self.walkers[object.0 as usize].moved = false;
    }

    fn observer_cell(&self, observer: ObserverId) -> CellPos {
        self.cell_of(&self.walkers[observer.0 as usize])
    }

    fn take_observer_position_updated(&mut self, observer: ObserverId) -> bool {
        mem::take(&mut self.observer_moved[observer.0 as usize])
    }

    fn observer_entity(&self, observer: ObserverId) -> Option<ObjectId> {
        Some(ObjectId(observer.0))
    }

    fn on_track_start(&mut self, observer: ObserverId, object: ObjectId) {
        log::trace!("{observer} started tracking {object}");
        self.counts.starts += 1;
        self.visible[observer.0 as usize] += 1;
    }

    fn on_track_stop(&mut self, observer: ObserverId, object: ObjectId) {
        log::trace!("{observer} stopped tracking {object}");
        self.counts.stops += 1;
        self.visible[observer.0 as usize] -= 1;
    }

    fn on_track_update(&mut self, _observer: ObserverId, _object: ObjectId) {
        self.counts.updates += 1;
    }

    fn on_object_tick(&mut self, _object: ObjectId) {
        self.counts.object_ticks += 1;
    }
}
