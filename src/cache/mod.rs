//! Kernel cache implementation
//!
//! Memoizes kernel values for pairs of training instances. Kernel matrices
//! are symmetric, so every pair is canonicalized to `(max(i,j), min(i,j))`
//! before lookup and the kernel is always evaluated in that order.
//!
//! Two modes are available:
//! - full: the whole lower triangle is computed in one pass on first use and
//!   never evicted;
//! - bounded: a set-associative cache of `cache_size` buckets with
//!   [`SLOTS_PER_BUCKET`] slots each. Eviction is local to a bucket: a hit
//!   moves the entry to the front of its bucket, a miss shifts the bucket
//!   right by one, dropping the last slot.

use crate::core::{Result, SVMError};

/// Slots probed per bucket in bounded mode
pub const SLOTS_PER_BUCKET: usize = 4;

enum Storage {
    /// Lower-triangular matrix, row `i` holds columns `0..=i`
    Full { matrix: Vec<f64> },
    /// `keys` holds `key + 1`, so 0 marks an empty slot
    Bounded {
        buckets: usize,
        slots: usize,
        keys: Vec<u64>,
        values: Vec<f64>,
    },
}

/// Cache of kernel values over the instances of one training subset
pub struct KernelCache {
    num_instances: usize,
    storage: Storage,
    evaluations: u64,
    hits: u64,
}

impl Default for KernelCache {
    fn default() -> Self {
        Self {
            num_instances: 0,
            storage: Storage::Full { matrix: Vec::new() },
            evaluations: 0,
            hits: 0,
        }
    }
}

impl KernelCache {
    /// Create a cache for `num_instances` instances
    ///
    /// `cache_size == 0` selects full-matrix mode, anything else the bounded
    /// mode with that many buckets.
    pub fn new(num_instances: usize, cache_size: usize) -> Result<Self> {
        Self::with_slots(num_instances, cache_size, SLOTS_PER_BUCKET)
    }

    /// Create a cache with a custom number of slots per bucket
    pub fn with_slots(num_instances: usize, cache_size: usize, slots: usize) -> Result<Self> {
        let n = num_instances as u64;
        if n.checked_mul(n).is_none() {
            return Err(SVMError::CacheKeyOverflow(num_instances));
        }

        let storage = if cache_size == 0 {
            Storage::Full { matrix: Vec::new() }
        } else {
            if slots == 0 {
                return Err(SVMError::InvalidParameter(
                    "kernel cache needs at least one slot per bucket".to_string(),
                ));
            }
            cache_size.checked_mul(slots).ok_or_else(|| {
                SVMError::InvalidParameter(format!("kernel cache size {cache_size} is too large"))
            })?;
            Storage::Bounded {
                buckets: cache_size,
                slots,
                keys: Vec::new(),
                values: Vec::new(),
            }
        };

        Ok(Self {
            num_instances,
            storage,
            evaluations: 0,
            hits: 0,
        })
    }

    /// Whether the cache holds the complete kernel matrix
    pub fn is_full_mode(&self) -> bool {
        matches!(self.storage, Storage::Full { .. })
    }

    /// Look up K(i, j), computing it with `compute` on a miss
    ///
    /// `compute` is always called with the larger index first.
    pub fn get<F>(&mut self, i: usize, j: usize, mut compute: F) -> f64
    where
        F: FnMut(usize, usize) -> f64,
    {
        let (hi, lo) = if i >= j { (i, j) } else { (j, i) };
        let n = self.num_instances;

        match &mut self.storage {
            Storage::Full { matrix } => {
                if matrix.is_empty() && n > 0 {
                    matrix.reserve_exact(n * (n + 1) / 2);
                    for row in 0..n {
                        for col in 0..=row {
                            matrix.push(compute(row, col));
                        }
                    }
                    self.evaluations += (n * (n + 1) / 2) as u64;
                }
                self.hits += 1;
                matrix[hi * (hi + 1) / 2 + lo]
            }
            Storage::Bounded {
                buckets,
                slots,
                keys,
                values,
            } => {
                let slots = *slots;
                if keys.is_empty() {
                    keys.resize(*buckets * slots, 0);
                    values.resize(*buckets * slots, 0.0);
                }

                let key = hi as u64 + lo as u64 * n as u64;
                let tag = key + 1;
                let location = (key % *buckets as u64) as usize * slots;

                for offset in 0..slots {
                    let slot = location + offset;
                    let stored = keys[slot];
                    if stored == 0 {
                        break;
                    }
                    if stored == tag {
                        self.hits += 1;
                        if offset > 0 {
                            keys[location..=slot].rotate_right(1);
                            values[location..=slot].rotate_right(1);
                        }
                        return values[location];
                    }
                }

                let value = compute(hi, lo);
                self.evaluations += 1;

                keys[location..location + slots].rotate_right(1);
                values[location..location + slots].rotate_right(1);
                keys[location] = tag;
                values[location] = value;
                value
            }
        }
    }

    /// Whether K(i, j) is currently resident, without touching recency
    pub fn is_cached(&self, i: usize, j: usize) -> bool {
        let (hi, lo) = if i >= j { (i, j) } else { (j, i) };
        match &self.storage {
            Storage::Full { matrix } => !matrix.is_empty() && hi < self.num_instances,
            Storage::Bounded {
                buckets,
                slots,
                keys,
                ..
            } => {
                if keys.is_empty() {
                    return false;
                }
                let key = hi as u64 + lo as u64 * self.num_instances as u64;
                let location = (key % *buckets as u64) as usize * slots;
                keys[location..location + slots].contains(&(key + 1))
            }
        }
    }

    /// Number of kernel evaluations performed so far
    pub fn evaluations(&self) -> u64 {
        self.evaluations
    }

    /// Number of lookups answered from the cache
    pub fn hits(&self) -> u64 {
        self.hits
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let (capacity, size) = match &self.storage {
            Storage::Full { matrix } => {
                let n = self.num_instances;
                (n * (n + 1) / 2, matrix.len())
            }
            Storage::Bounded {
                buckets,
                slots,
                keys,
                ..
            } => (buckets * slots, keys.iter().filter(|&&k| k != 0).count()),
        };
        CacheStats {
            evaluations: self.evaluations,
            hits: self.hits,
            capacity,
            size,
        }
    }

    /// Release the storage; the cache refills lazily if used again
    ///
    /// Counters are kept. Safe to call repeatedly.
    pub fn clear(&mut self) {
        match &mut self.storage {
            Storage::Full { matrix } => *matrix = Vec::new(),
            Storage::Bounded { keys, values, .. } => {
                *keys = Vec::new();
                *values = Vec::new();
            }
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, PartialEq)]
pub struct CacheStats {
    pub evaluations: u64,
    pub hits: u64,
    pub capacity: usize,
    pub size: usize,
}

impl CacheStats {
    /// Share of lookups answered without evaluating the kernel
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.evaluations;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
