//! Kernel cache implementation
//!
//! Provides an LRU cache for kernel values between tree node centers. Node
//! centers are nested (a left child keeps its parent's center), so the dual-tree
//! traversal keeps scoring the same (query center, reference center) pairs.
//! Query and reference indices live in different datasets, so keys are ordered
//! pairs and (i, j) is distinct from (j, i).

use lru::LruCache;
use std::num::NonZeroUsize;

/// Default number of cached center pairs per traversal task
pub const DEFAULT_CACHE_CAPACITY: usize = 4096;

/// Cache key: (query point index, reference point index)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CacheKey {
    query: usize,
    reference: usize,
}

/// LRU cache for kernel values between query and reference points
pub struct KernelCache {
    cache: LruCache<CacheKey, f64>,
    hits: u64,
    misses: u64,
}

impl KernelCache {
    /// Create a new kernel cache with specified capacity in number of entries
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: LruCache::new(capacity),
            hits: 0,
            misses: 0,
        }
    }

    /// Get a kernel value from cache
    pub fn get(&mut self, query: usize, reference: usize) -> Option<f64> {
        if let Some(&value) = self.cache.get(&CacheKey { query, reference }) {
            self.hits += 1;
            Some(value)
        } else {
            self.misses += 1;
            None
        }
    }

    /// Put a kernel value into cache
    pub fn put(&mut self, query: usize, reference: usize, value: f64) {
        self.cache.put(CacheKey { query, reference }, value);
    }

    /// Return the cached value or compute, store and return it
    pub fn get_or_insert_with<F>(&mut self, query: usize, reference: usize, compute: F) -> f64
    where
        F: FnOnce() -> f64,
    {
        match self.get(query, reference) {
            Some(value) => value,
            None => {
                let value = compute();
                self.put(query, reference, value);
                value
            }
        }
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            capacity: self.cache.cap().get(),
            size: self.cache.len(),
        }
    }
}

impl Default for KernelCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

/// Cache statistics
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub capacity: usize,
    pub size: usize,
}

impl CacheStats {
    /// Fraction of lookups answered from the cache
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Add the counters of another cache, e.g. from a parallel task
    pub fn merge(&mut self, other: &CacheStats) {
        self.hits += other.hits;
        self.misses += other.misses;
        self.capacity += other.capacity;
        self.size += other.size;
    }
}
