//! Cache Statistics Module
//!
//! Tracks cache performance metrics including hits, misses, and evictions.

use serde::Serialize;

use crate::cache::EvictionPolicy;
use crate::storage::PersistencePolicy;

// == Cache Stats ==
/// Tracks cache performance metrics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Number of successful cache retrievals
    pub hits: u64,
    /// Number of failed cache retrievals (key not found or expired)
    pub misses: u64,
    /// Hits served by promoting a record from the storage tier
    pub storage_hits: u64,
    /// Number of writes
    pub sets: u64,
    /// Number of explicit deletions
    pub deletes: u64,
    /// Number of entries evicted by the eviction policy
    pub evictions: u64,
    /// Number of entries dropped because their TTL elapsed
    pub expirations: u64,
    /// Current number of entries in the cache
    pub total_entries: usize,
    /// Approximate bytes held in memory
    pub approximate_size_bytes: usize,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_storage_hit(&mut self) {
        self.storage_hits += 1;
    }

    pub fn record_set(&mut self) {
        self.sets += 1;
    }

    pub fn record_delete(&mut self) {
        self.deletes += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub fn record_expirations(&mut self, count: usize) {
        self.expirations += count as u64;
    }
}

// == Cache Report ==
/// Point-in-time view over the entries currently held.
#[derive(Debug, Clone, Serialize)]
pub struct CacheReport {
    pub total_entries: usize,
    /// Entries past their TTL that the sweeper has not removed yet
    pub expired_entries: usize,
    pub approximate_size_bytes: usize,
    /// Age of the oldest entry in milliseconds, 0 when empty
    pub oldest_item_age_ms: u64,
    /// Age of the newest entry in milliseconds, 0 when empty
    pub newest_item_age_ms: u64,
    pub average_access_count: f64,
    pub storage_type: PersistencePolicy,
    pub eviction_policy: EvictionPolicy,
    pub counters: CacheStats,
}
