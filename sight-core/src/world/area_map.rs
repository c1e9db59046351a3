//! Cell-keyed inverse index of coverage squares.
//!
//! Maps each cell to the set of objects whose coverage square includes it, so
//! "who can see this cell" is a single hash lookup.
//!
//! Moving an object only touches the cells entering or leaving its square.
//! Emptied cell sets go back to an [`ObjectPool`] instead of the allocator.

use std::fmt::Debug;
use std::hash::Hash;
use std::mem;

use rustc_hash::{FxHashMap, FxHashSet};
use sight_utils::types::{pack, unpack_x, unpack_z};
use sight_utils::{CellPos, ObjectPool, PoolStats};

use crate::error::{AreaMapError, AreaMapResult};

/// The set of objects covering one cell.
pub type CellSet<T> = FxHashSet<T>;

/// Pooled cell sets are trimmed back to this many slots when released.
const POOLED_SET_CAPACITY: usize = 4;

/// Coverage recorded for a registered object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Coverage {
    /// Packed center cell.
    pub center: i64,
    /// Chebyshev radius in cells. Zero covers only the center.
    pub radius: u32,
}

impl Coverage {
    /// Creates a coverage square around `center`.
    #[must_use]
    pub const fn new(center: CellPos, radius: u32) -> Self {
        Self {
            center: center.as_i64(),
            radius,
        }
    }

    /// The unpacked center cell.
    #[must_use]
    pub const fn center_pos(&self) -> CellPos {
        CellPos::from_i64(self.center)
    }

    /// Returns true if the square includes the cell.
    #[must_use]
    pub fn covers(&self, x: i32, z: i32) -> bool {
        self.bounds().contains(x, z)
    }

    /// Number of cells in the square, clipped to the `i32` grid.
    #[must_use]
    pub fn area(&self) -> u64 {
        let b = self.bounds();
        let width = (i64::from(b.max_x) - i64::from(b.min_x) + 1) as u64;
        let depth = (i64::from(b.max_z) - i64::from(b.min_z) + 1) as u64;
        width.saturating_mul(depth)
    }

    fn bounds(&self) -> Bounds {
        let x = unpack_x(self.center);
        let z = unpack_z(self.center);
        Bounds {
            min_x: x.saturating_sub_unsigned(self.radius),
            max_x: x.saturating_add_unsigned(self.radius),
            min_z: z.saturating_sub_unsigned(self.radius),
            max_z: z.saturating_add_unsigned(self.radius),
        }
    }
}

/// Inclusive bounding box of a coverage square.
#[derive(Clone, Copy)]
struct Bounds {
    min_x: i32,
    max_x: i32,
    min_z: i32,
    max_z: i32,
}

impl Bounds {
    #[inline]
    fn contains(self, x: i32, z: i32) -> bool {
        x >= self.min_x && x <= self.max_x && z >= self.min_z && z <= self.max_z
    }
}

/// Receives every cell-level membership change of an [`AreaMap`].
///
/// Each callback fires exactly once per actual change, never for cells an
/// update leaves untouched.
pub trait CoverageListener<T> {
    /// `object` started covering cell `(x, z)`.
    fn on_coverage_gained(&mut self, _object: T, _x: i32, _z: i32) {}

    /// `object` stopped covering cell `(x, z)`.
    fn on_coverage_lost(&mut self, _object: T, _x: i32, _z: i32) {}
}

impl<T> CoverageListener<T> for () {}

/// A spatial inverse index from cells to the objects covering them.
///
/// Objects are identified by handle: two equal handles are the same member.
/// Single-writer; every mutating call takes `&mut self`, so a view returned by
/// [`AreaMap::query`] cannot outlive the next mutation.
pub struct AreaMap<T, L = ()> {
    /// Packed cell -> objects whose square includes that cell. Never holds an empty set.
    cells: FxHashMap<i64, CellSet<T>>,
    /// Registered object -> its current square.
    coverage: FxHashMap<T, Coverage>,
    /// Recycled cell sets.
    pool: ObjectPool<CellSet<T>>,
    /// Returned for cells nobody covers.
    empty: CellSet<T>,
    listener: L,
}

impl<T> AreaMap<T>
where
    T: Copy + Eq + Hash + Debug,
{
    /// Creates an empty map that keeps at most `pool_capacity` idle cell sets.
    #[must_use]
    pub fn new(pool_capacity: usize) -> Self {
        Self::with_listener(pool_capacity, ())
    }
}

impl<T, L> AreaMap<T, L>
where
    T: Copy + Eq + Hash + Debug,
    L: CoverageListener<T>,
{
    /// Creates an empty map reporting membership changes to `listener`.
    #[must_use]
    pub fn with_listener(pool_capacity: usize, listener: L) -> Self {
        let pool = ObjectPool::new(pool_capacity, CellSet::default, CellSet::clear)
            .with_shrink(|set: &mut CellSet<T>| set.shrink_to(POOLED_SET_CAPACITY));
        Self {
            cells: FxHashMap::default(),
            coverage: FxHashMap::default(),
            pool,
            empty: CellSet::default(),
            listener,
        }
    }

    /// Objects covering the cell with the given packed key.
    ///
    /// Always returns a set; cells nobody covers yield an empty one.
    #[must_use]
    pub fn query(&self, cell: i64) -> &CellSet<T> {
        self.cells.get(&cell).unwrap_or(&self.empty)
    }

    /// Objects covering `pos`.
    #[must_use]
    pub fn query_pos(&self, pos: CellPos) -> &CellSet<T> {
        self.query(pos.as_i64())
    }

    /// Returns true if `object` covers the cell.
    #[must_use]
    pub fn contains(&self, cell: i64, object: T) -> bool {
        self.cells.get(&cell).is_some_and(|set| set.contains(&object))
    }

    /// Every registered object, each exactly once.
    pub fn query_all(&self) -> impl Iterator<Item = T> + '_ {
        self.coverage.keys().copied()
    }

    /// The current square of `object`, if registered.
    #[must_use]
    pub fn coverage(&self, object: T) -> Option<Coverage> {
        self.coverage.get(&object).copied()
    }

    /// Returns true if `object` is registered.
    #[must_use]
    pub fn is_registered(&self, object: T) -> bool {
        self.coverage.contains_key(&object)
    }

    /// Adds `object` to every cell within `radius` of `(x, z)`.
    pub fn register(&mut self, object: T, x: i32, z: i32, radius: u32) -> AreaMapResult<T> {
        if self.coverage.contains_key(&object) {
            return Err(AreaMapError::AlreadyRegistered(object));
        }
        let square = Coverage::new(CellPos::new(x, z), radius);
        self.coverage.insert(object, square);

        let b = square.bounds();
        for xx in b.min_x..=b.max_x {
            for zz in b.min_z..=b.max_z {
                self.add_to_cell(object, xx, zz);
            }
        }

        log::trace!("Registered {object:?} at [{x}, {z}] with radius {radius}");
        self.check_object(object)
    }

    /// Removes `object` from every cell it covers.
    ///
    /// Returns `Ok(false)` if the object was not registered.
    pub fn unregister(&mut self, object: T) -> AreaMapResult<T, bool> {
        let Some(square) = self.coverage.remove(&object) else {
            return Ok(false);
        };

        let b = square.bounds();
        for xx in b.min_x..=b.max_x {
            for zz in b.min_z..=b.max_z {
                self.remove_from_cell(object, xx, zz)?;
            }
        }

        log::trace!("Unregistered {object:?}");
        self.check_object(object)?;
        Ok(true)
    }

    /// Moves `object` to a new center and radius.
    ///
    /// Only cells in the symmetric difference of the old and new squares are
    /// touched; an update to the current center and radius is free.
    pub fn update(&mut self, object: T, x: i32, z: i32, radius: u32) -> AreaMapResult<T> {
        let new = Coverage::new(CellPos::new(x, z), radius);
        let Some(slot) = self.coverage.get_mut(&object) else {
            return Err(AreaMapError::NotRegistered(object));
        };
        let old = mem::replace(slot, new);
        if old == new {
            return Ok(());
        }

        let old_b = old.bounds();
        let new_b = new.bounds();

        for xx in new_b.min_x..=new_b.max_x {
            for zz in new_b.min_z..=new_b.max_z {
                if !old_b.contains(xx, zz) {
                    self.add_to_cell(object, xx, zz);
                }
            }
        }

        for xx in old_b.min_x..=old_b.max_x {
            for zz in old_b.min_z..=old_b.max_z {
                if !new_b.contains(xx, zz) {
                    self.remove_from_cell(object, xx, zz)?;
                }
            }
        }

        log::trace!(
            "Moved {object:?} from {} r{} to [{x}, {z}] r{radius}",
            old.center_pos(),
            old.radius
        );
        self.check_object(object)
    }

    /// Unregisters every object, returning all cell sets to the pool.
    pub fn clear(&mut self) {
        for (key, set) in self.cells.drain() {
            let (x, z) = (unpack_x(key), unpack_z(key));
            for &object in &set {
                self.listener.on_coverage_lost(object, x, z);
            }
            self.pool.release(set);
        }
        self.coverage.clear();
    }

    /// Number of registered objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.coverage.len()
    }

    /// Returns true if no objects are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.coverage.is_empty()
    }

    /// Number of cells covered by at least one object.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Number of idle cell sets waiting in the pool.
    #[must_use]
    pub fn pooled_sets(&self) -> usize {
        self.pool.len()
    }

    /// Allocation counters of the cell set pool.
    #[must_use]
    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    /// The coverage listener.
    pub fn listener(&self) -> &L {
        &self.listener
    }

    /// The coverage listener, mutably.
    pub fn listener_mut(&mut self) -> &mut L {
        &mut self.listener
    }

    /// Scans the whole map against the recorded coverage.
    ///
    /// O(total area). Checks that every registered object is a member of exactly
    /// the cells of its square and that no empty cell is retained.
    pub fn validate(&self) -> AreaMapResult<T> {
        let mut memberships: u64 = 0;
        for (&key, set) in &self.cells {
            let (x, z) = (unpack_x(key), unpack_z(key));
            if set.is_empty() {
                return Err(AreaMapError::Invariant(format!(
                    "empty cell retained at [{x}, {z}]"
                )));
            }
            for object in set {
                match self.coverage.get(object) {
                    None => {
                        return Err(AreaMapError::Invariant(format!(
                            "unregistered {object:?} in cell [{x}, {z}]"
                        )));
                    }
                    Some(square) if !square.covers(x, z) => {
                        return Err(AreaMapError::Invariant(format!(
                            "{object:?} in cell [{x}, {z}] outside its square around {} r{}",
                            square.center_pos(),
                            square.radius
                        )));
                    }
                    Some(_) => memberships += 1,
                }
            }
        }

        // Every membership lies inside its square, so matching totals means every
        // square is fully populated.
        let expected: u64 = self.coverage.values().map(Coverage::area).sum();
        if memberships != expected {
            return Err(AreaMapError::Invariant(format!(
                "{memberships} memberships recorded, squares require {expected}"
            )));
        }
        Ok(())
    }

    /// Checks a single object's square, or its absence from every cell when
    /// it is not registered.
    pub fn validate_object(&self, object: T) -> AreaMapResult<T> {
        let Some(square) = self.coverage.get(&object) else {
            for (&key, set) in &self.cells {
                if set.contains(&object) {
                    return Err(AreaMapError::Invariant(format!(
                        "unexpected {object:?} in cell [{}, {}]",
                        unpack_x(key),
                        unpack_z(key)
                    )));
                }
            }
            return Ok(());
        };

        let b = square.bounds();
        for xx in b.min_x..=b.max_x {
            for zz in b.min_z..=b.max_z {
                match self.cells.get(&pack(xx, zz)) {
                    None => return Err(AreaMapError::MissingCell { x: xx, z: zz }),
                    Some(set) if !set.contains(&object) => {
                        return Err(AreaMapError::MissingMember {
                            object,
                            x: xx,
                            z: zz,
                        });
                    }
                    Some(_) => {}
                }
            }
        }
        Ok(())
    }

    #[cfg(feature = "validate")]
    fn check_object(&self, object: T) -> AreaMapResult<T> {
        self.validate_object(object)
    }

    #[cfg(not(feature = "validate"))]
    #[inline]
    #[allow(clippy::unnecessary_wraps, clippy::unused_self)]
    fn check_object(&self, _object: T) -> AreaMapResult<T> {
        Ok(())
    }

    fn add_to_cell(&mut self, object: T, x: i32, z: i32) {
        let set = self
            .cells
            .entry(pack(x, z))
            .or_insert_with(|| self.pool.alloc());
        let inserted = set.insert(object);
        debug_assert!(inserted, "{object:?} already in cell [{x}, {z}]");
        if inserted {
            self.listener.on_coverage_gained(object, x, z);
        }
    }

    fn remove_from_cell(&mut self, object: T, x: i32, z: i32) -> AreaMapResult<T> {
        let key = pack(x, z);
        let Some(set) = self.cells.get_mut(&key) else {
            return Err(AreaMapError::MissingCell { x, z });
        };
        if !set.remove(&object) {
            return Err(AreaMapError::MissingMember { object, x, z });
        }
        if set.is_empty()
            && let Some(set) = self.cells.remove(&key)
        {
            self.pool.release(set);
        }
        self.listener.on_coverage_lost(object, x, z);
        Ok(())
    }
}
