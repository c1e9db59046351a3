//! A bounded freelist of reusable values.
//!
//! Used to recycle the high-churn collections of the proximity index so that a
//! steady-state tick does not hit the allocator.

/// Allocation counters of an [`ObjectPool`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Allocations served from the freelist.
    pub hits: u64,
    /// Allocations that had to construct a fresh value.
    pub misses: u64,
    /// Releases dropped because the pool was full.
    pub discarded: u64,
}

/// A bounded pool of reusable values.
///
/// Values are reset when they are released, so [`ObjectPool::alloc`] always
/// hands out a value that is ready to use. The pool never holds more than
/// `capacity` values; anything released beyond that is dropped.
pub struct ObjectPool<T> {
    free: Vec<T>,
    capacity: usize,
    factory: fn() -> T,
    reset: fn(&mut T),
    shrink: Option<fn(&mut T)>,
    stats: PoolStats,
}

impl<T> ObjectPool<T> {
    /// Creates an empty pool.
    ///
    /// `factory` builds a value on a pool miss and `reset` clears a value before it
    /// goes back on the freelist.
    #[must_use]
    pub fn new(capacity: usize, factory: fn() -> T, reset: fn(&mut T)) -> Self {
        Self {
            free: Vec::new(),
            capacity,
            factory,
            reset,
            shrink: None,
            stats: PoolStats::default(),
        }
    }

    /// Adds a shrink step, applied after `reset` when a value is released.
    ///
    /// Trims backing storage of values that grew large so that pooled memory
    /// stays bounded.
    #[must_use]
    pub fn with_shrink(mut self, shrink: fn(&mut T)) -> Self {
        self.shrink = Some(shrink);
        self
    }

    /// Takes a value out of the pool, constructing one if the pool is empty.
    pub fn alloc(&mut self) -> T {
        if let Some(value) = self.free.pop() {
            self.stats.hits += 1;
            value
        } else {
            self.stats.misses += 1;
            (self.factory)()
        }
    }

    /// Returns a value to the pool.
    pub fn release(&mut self, mut value: T) {
        if self.free.len() >= self.capacity {
            self.stats.discarded += 1;
            return;
        }
        (self.reset)(&mut value);
        if let Some(shrink) = self.shrink {
            shrink(&mut value);
        }
        self.free.push(value);
    }

    /// Fills the pool with fresh values up to `count`, bounded by the capacity.
    pub fn prefill(&mut self, count: usize) {
        let target = count.min(self.capacity);
        if self.free.len() >= target {
            return;
        }
        self.free.reserve(target - self.free.len());
        while self.free.len() < target {
            self.free.push((self.factory)());
        }
        log::debug!("Prefilled object pool with {target} values");
    }

    /// Number of values currently waiting on the freelist.
    #[must_use]
    pub fn len(&self) -> usize {
        self.free.len()
    }

    /// Returns true if no values are pooled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.free.is_empty()
    }

    /// The maximum number of pooled values.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Allocation counters since creation.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        self.stats
    }
}
