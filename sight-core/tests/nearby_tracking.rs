//! Scheduler scenarios driven through a small in-memory host.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustc_hash::{FxHashMap, FxHashSet};
use sight_core::{
    MAX_RADIUS, NearbyTracker, ObjectId, ObserverId, TrackingConfig, TrackingHost,
};
use sight_utils::CellPos;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Event {
    Start(ObserverId, ObjectId),
    Stop(ObserverId, ObjectId),
    Update(ObserverId, ObjectId),
}

struct Object {
    cell: CellPos,
    sight: u32,
    moved: bool,
}

struct Observer {
    cell: CellPos,
    moved: bool,
}

#[derive(Default)]
struct TestWorld {
    objects: FxHashMap<ObjectId, Object>,
    observers: FxHashMap<ObserverId, Observer>,
    events: Vec<Event>,
    ticked: Vec<ObjectId>,
}

impl TestWorld {
    fn spawn(&mut self, id: u32, x: i32, z: i32, sight: u32) -> ObjectId {
        let object = ObjectId(id);
        self.objects.insert(
            object,
            Object {
                cell: CellPos::new(x, z),
                sight,
                moved: false,
            },
        );
        object
    }

    fn join(&mut self, id: u32, x: i32, z: i32) -> ObserverId {
        let observer = ObserverId(id);
        self.observers.insert(
            observer,
            Observer {
                cell: CellPos::new(x, z),
                moved: false,
            },
        );
        observer
    }

    fn move_object(&mut self, object: ObjectId, x: i32, z: i32) {
        let entry = self.objects.get_mut(&object).unwrap();
        entry.cell = CellPos::new(x, z);
        entry.moved = true;
    }

    fn move_observer(&mut self, observer: ObserverId, x: i32, z: i32) {
        let entry = self.observers.get_mut(&observer).unwrap();
        entry.cell = CellPos::new(x, z);
        entry.moved = true;
    }

    fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }
}

impl TrackingHost for TestWorld {
    fn object_cell(&self, object: ObjectId) -> CellPos {
        self.objects[&object].cell
    }

    fn object_sight_distance(&self, object: ObjectId) -> u32 {
        self.objects[&object].sight
    }

    fn object_position_updated(&self, object: ObjectId) -> bool {
        self.objects.get(&object).is_some_and(|o| o.moved)
    }

    fn clear_object_position_updated(&mut self, object: ObjectId) {
        if let Some(o) = self.objects.get_mut(&object) {
            o.moved = false;
        }
    }

    fn observer_cell(&self, observer: ObserverId) -> CellPos {
        self.observers[&observer].cell
    }

    fn take_observer_position_updated(&mut self, observer: ObserverId) -> bool {
        self.observers
            .get_mut(&observer)
            .is_some_and(|o| std::mem::take(&mut o.moved))
    }

    fn on_track_start(&mut self, observer: ObserverId, object: ObjectId) {
        self.events.push(Event::Start(observer, object));
    }

    fn on_track_stop(&mut self, observer: ObserverId, object: ObjectId) {
        self.events.push(Event::Stop(observer, object));
    }

    fn on_track_update(&mut self, observer: ObserverId, object: ObjectId) {
        self.events.push(Event::Update(observer, object));
    }

    fn on_object_tick(&mut self, object: ObjectId) {
        self.ticked.push(object);
    }
}

/// Radius 1 for a sight distance of one cell.
fn tight_config() -> TrackingConfig {
    TrackingConfig {
        cell_size: 16,
        pool_capacity: 64,
        radius_margin: 0,
    }
}

#[test]
fn test_start_then_stop_after_removal() {
    let mut world = TestWorld::default();
    let a = world.spawn(1, 0, 0, 16);
    let p = world.join(1, 0, 0);

    let mut tracker = NearbyTracker::new(&tight_config()).unwrap();
    tracker.add_object(a, &world).unwrap();
    tracker.add_observer(p).unwrap();

    tracker.tick(&mut world).unwrap();
    assert_eq!(world.take_events(), vec![Event::Start(p, a)]);
    assert!(tracker.is_tracking(p, a));

    assert!(tracker.remove_object(a).unwrap());
    world.objects.remove(&a);
    tracker.tick(&mut world).unwrap();

    assert_eq!(world.take_events(), vec![Event::Stop(p, a)]);
    assert!(!tracker.is_tracking(p, a));
    assert_eq!(tracker.area_map().query_all().count(), 0);
    assert_eq!(tracker.area_map().cell_count(), 0);
}

#[test]
fn test_readded_handle_restarts_tracking() {
    let mut world = TestWorld::default();
    let a = world.spawn(1, 0, 0, 16);
    let p = world.join(0, 0, 0);

    let mut tracker = NearbyTracker::new(&tight_config()).unwrap();
    tracker.add_object(a, &world).unwrap();
    tracker.add_observer(p).unwrap();
    tracker.tick(&mut world).unwrap();
    assert_eq!(world.take_events(), vec![Event::Start(p, a)]);

    // Despawned and respawned with the same id before the next tick.
    assert!(tracker.remove_object(a).unwrap());
    world.spawn(1, 1, 0, 16);
    tracker.add_object(a, &world).unwrap();
    tracker.tick(&mut world).unwrap();

    assert_eq!(world.take_events(), vec![Event::Stop(p, a), Event::Start(p, a)]);
    assert!(tracker.is_tracking(p, a));

    // Nothing left over for the tick after.
    tracker.tick(&mut world).unwrap();
    assert!(world.take_events().is_empty());
}

#[test]
fn test_huge_sight_distance_is_capped() {
    let mut world = TestWorld::default();
    let a = world.spawn(1, 0, 0, u32::MAX);
    let config = TrackingConfig {
        cell_size: 1,
        ..tight_config()
    };

    let mut tracker = NearbyTracker::new(&config).unwrap();
    tracker.add_object(a, &world).unwrap();

    let coverage = tracker.area_map().coverage(a).unwrap();
    assert_eq!(coverage.radius, MAX_RADIUS);
    let side = 2 * MAX_RADIUS as usize + 1;
    assert_eq!(tracker.area_map().cell_count(), side * side);
}

#[test]
fn test_remove_observer_stops_everything() {
    let mut world = TestWorld::default();
    let a = world.spawn(1, 0, 0, 16);
    let b = world.spawn(2, 1, 0, 16);
    let p = world.join(1, 0, 0);

    let mut tracker = NearbyTracker::new(&tight_config()).unwrap();
    tracker.add_object(a, &world).unwrap();
    tracker.add_object(b, &world).unwrap();
    tracker.add_observer(p).unwrap();
    tracker.tick(&mut world).unwrap();
    world.take_events();

    assert!(tracker.remove_observer(p, &mut world));

    let mut events = world.take_events();
    events.sort_by_key(|e| match e {
        Event::Start(_, o) | Event::Stop(_, o) | Event::Update(_, o) => *o,
    });
    assert_eq!(events, vec![Event::Stop(p, a), Event::Stop(p, b)]);
    assert_eq!(tracker.observer_count(), 0);
    assert!(tracker.tracked_by(p).is_none());
}

#[test]
fn test_moving_out_of_range_stops() {
    let mut world = TestWorld::default();
    let a = world.spawn(1, 0, 0, 16);
    let p = world.join(1, 1, 1);

    let mut tracker = NearbyTracker::new(&tight_config()).unwrap();
    tracker.add_object(a, &world).unwrap();
    tracker.add_observer(p).unwrap();
    tracker.tick(&mut world).unwrap();
    assert_eq!(world.take_events(), vec![Event::Start(p, a)]);

    world.move_object(a, -1, 0);
    let stats = tracker.tick(&mut world).unwrap();
    assert_eq!(stats.moved, 1);
    assert_eq!(world.take_events(), vec![Event::Stop(p, a)]);

    world.move_observer(p, 0, 0);
    tracker.tick(&mut world).unwrap();
    assert_eq!(world.take_events(), vec![Event::Start(p, a)]);
}

#[test]
fn test_update_only_when_something_moved() {
    let mut world = TestWorld::default();
    let a = world.spawn(1, 0, 0, 32);
    let p = world.join(1, 1, 0);

    let mut tracker = NearbyTracker::new(&tight_config()).unwrap();
    tracker.add_object(a, &world).unwrap();
    tracker.add_observer(p).unwrap();
    tracker.tick(&mut world).unwrap();
    world.take_events();

    let stats = tracker.tick(&mut world).unwrap();
    assert_eq!(stats.moved, 0);
    assert!(world.take_events().is_empty());

    // observer moves inside the square
    world.move_observer(p, 2, 0);
    tracker.tick(&mut world).unwrap();
    assert_eq!(world.take_events(), vec![Event::Update(p, a)]);

    // object moves inside its own cell: flagged, but the index is left alone
    world.objects.get_mut(&a).unwrap().moved = true;
    let stats = tracker.tick(&mut world).unwrap();
    assert_eq!(stats.moved, 0);
    assert_eq!(world.take_events(), vec![Event::Update(p, a)]);

    tracker.tick(&mut world).unwrap();
    assert!(world.take_events().is_empty());
}

#[test]
fn test_sight_change_without_moving() {
    let mut world = TestWorld::default();
    let a = world.spawn(1, 0, 0, 16);
    let p = world.join(1, 3, 0);

    let mut tracker = NearbyTracker::new(&tight_config()).unwrap();
    tracker.add_object(a, &world).unwrap();
    tracker.add_observer(p).unwrap();
    tracker.tick(&mut world).unwrap();
    assert!(world.take_events().is_empty());

    world.objects.get_mut(&a).unwrap().sight = 48;
    let stats = tracker.tick(&mut world).unwrap();
    assert_eq!(stats.moved, 1);
    assert_eq!(world.take_events(), vec![Event::Start(p, a)]);
    assert_eq!(tracker.area_map().cell_count(), 49);
}

#[test]
fn test_unwatched_objects_still_ticked() {
    let mut world = TestWorld::default();
    let a = world.spawn(1, 0, 0, 16);
    let b = world.spawn(2, 1000, 1000, 16);
    world.join(1, 0, 0);

    let mut tracker = NearbyTracker::new(&tight_config()).unwrap();
    tracker.add_object(a, &world).unwrap();
    tracker.add_object(b, &world).unwrap();
    tracker.add_observer(ObserverId(1)).unwrap();

    world.move_object(b, 1001, 1000);
    let stats = tracker.tick(&mut world).unwrap();

    assert_eq!(stats.ticked, 2);
    world.ticked.sort_unstable();
    assert_eq!(world.ticked, vec![a, b]);
    assert!(!world.objects[&b].moved);
}

#[test]
fn test_random_walk_transitions() {
    const OBJECTS: u32 = 40;
    const OBSERVERS: u32 = 8;
    const EXTENT: i32 = 12;

    let mut rng = StdRng::seed_from_u64(7);
    let mut world = TestWorld::default();
    let mut tracker = NearbyTracker::new(&tight_config()).unwrap();

    for id in 0..OBJECTS {
        let object = world.spawn(
            id,
            rng.random_range(-EXTENT..=EXTENT),
            rng.random_range(-EXTENT..=EXTENT),
            rng.random_range(0..=48),
        );
        tracker.add_object(object, &world).unwrap();
    }
    for id in 0..OBSERVERS {
        let observer = world.join(
            id,
            rng.random_range(-EXTENT..=EXTENT),
            rng.random_range(-EXTENT..=EXTENT),
        );
        tracker.add_observer(observer).unwrap();
    }

    let mut despawned: FxHashSet<ObjectId> = FxHashSet::default();
    let mut open: FxHashSet<(ObserverId, ObjectId)> = FxHashSet::default();

    for _ in 0..300 {
        for id in 0..OBJECTS {
            let object = ObjectId(id);
            if despawned.contains(&object) || !rng.random_bool(0.3) {
                continue;
            }
            let cell = world.objects[&object].cell;
            world.move_object(
                object,
                cell.x + rng.random_range(-1..=1),
                cell.z + rng.random_range(-1..=1),
            );
            if rng.random_bool(0.05) {
                world.objects.get_mut(&object).unwrap().sight = rng.random_range(0..=48);
            }
        }
        for id in 0..OBSERVERS {
            if rng.random_bool(0.5) {
                let cell = world.observers[&ObserverId(id)].cell;
                world.move_observer(
                    ObserverId(id),
                    cell.x + rng.random_range(-2..=2),
                    cell.z + rng.random_range(-2..=2),
                );
            }
        }
        if rng.random_bool(0.1) {
            let object = ObjectId(rng.random_range(0..OBJECTS));
            if despawned.remove(&object) {
                tracker.add_object(object, &world).unwrap();
            } else {
                assert!(tracker.remove_object(object).unwrap());
                despawned.insert(object);
            }
        }

        tracker.tick(&mut world).unwrap();
        tracker.area_map().validate().unwrap();
        assert!(tracker.area_map().pooled_sets() <= 64);

        for event in world.take_events() {
            match event {
                Event::Start(p, o) => assert!(open.insert((p, o)), "duplicate start {p} {o}"),
                Event::Stop(p, o) => assert!(open.remove(&(p, o)), "stop without start {p} {o}"),
                Event::Update(p, o) => assert!(open.contains(&(p, o)), "update while untracked"),
            }
        }

        // After a tick every observer tracks exactly the live objects covering its cell.
        for (&observer, state) in &world.observers {
            let expected: FxHashSet<ObjectId> = world
                .objects
                .iter()
                .filter(|(id, _)| !despawned.contains(*id))
                .filter(|(_, o)| {
                    o.cell.chebyshev_distance(state.cell) <= tracker.radius_for(o.sight)
                })
                .map(|(&id, _)| id)
                .collect();
            assert_eq!(tracker.tracked_by(observer), Some(&expected));
            let open_here = open.iter().filter(|(p, _)| *p == observer).count();
            assert_eq!(open_here, expected.len());
        }
    }

    for id in 0..OBSERVERS {
        assert!(tracker.remove_observer(ObserverId(id), &mut world));
    }
    for event in world.take_events() {
        let Event::Stop(p, o) = event else {
            panic!("unexpected {event:?} while removing observers");
        };
        assert!(open.remove(&(p, o)));
    }
    assert!(open.is_empty());
}
