//! Cache Store Module
//!
//! Main cache engine: HashMap storage with TTL expiration, policy-driven
//! eviction and an optional storage tier behind the memory map.
//!
//! The storage tier mirrors memory: writes are copied into it and every
//! removal, eviction included, deletes the stored copy as well. Records that
//! did not fit in memory on load stay in the tier and answer later misses.

use std::collections::HashMap;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cache::{
    codec, current_timestamp_ms, CacheEntry, CacheOptions, CacheReport, CacheStats,
    EntryOptions, Metadata, ValueWithMetadata, MAX_KEY_LENGTH, MAX_VALUE_SIZE,
};
use crate::error::{CacheError, Result};
use crate::storage::{build_adapter, StorageAdapter};

/// Share of `max_entries` evicted when a new key hits the count limit.
const EVICTION_BATCH_RATIO: f64 = 0.2;

/// Size eviction stops once the total falls to this share of the limit.
const SIZE_TARGET_RATIO: f64 = 0.8;

// == Data Cache ==
/// Key/value cache with TTL support, pluggable eviction and tiered storage.
#[derive(Debug)]
pub struct DataCache {
    /// In-memory entries
    entries: HashMap<String, CacheEntry>,
    /// Secondary tier, None when persistence is disabled
    storage: Option<Box<dyn StorageAdapter>>,
    options: CacheOptions,
    stats: CacheStats,
    /// Sum of entry size estimates
    total_size: usize,
    /// Logical clock ordering inserts and reads
    clock: u64,
}

impl DataCache {
    // == Constructors ==
    /// Creates a cache and the storage tier its persistence policy asks for.
    ///
    /// Entries already present in the tier are loaded.
    pub fn new(options: CacheOptions) -> Result<Self> {
        let storage = build_adapter(
            options.persistence,
            &options.storage_dir,
            &options.storage_prefix,
            options.storage_quota_bytes,
        )?;
        Ok(Self::with_storage(options, storage))
    }

    /// Creates a memory-only cache.
    ///
    /// # Arguments
    /// * `max_entries` - Maximum number of entries the cache can hold
    /// * `default_ttl_ms` - Default TTL in milliseconds, 0 = never expire
    pub fn in_memory(max_entries: usize, default_ttl_ms: u64) -> Self {
        let options = CacheOptions {
            max_entries,
            default_ttl_ms,
            ..CacheOptions::default()
        };
        Self::with_storage(options, None)
    }

    /// Creates a cache over an explicit storage tier.
    pub fn with_storage(options: CacheOptions, storage: Option<Box<dyn StorageAdapter>>) -> Self {
        let mut cache = Self {
            entries: HashMap::new(),
            storage,
            options,
            stats: CacheStats::new(),
            total_size: 0,
            clock: 0,
        };

        if let Some(tier) = cache.storage.as_ref().map(|s| s.name()) {
            let loaded = cache.load_from_storage();
            info!(tier, loaded, "restored cache entries from storage");
        }
        cache
    }

    pub fn options(&self) -> &CacheOptions {
        &self.options
    }

    /// Name of the storage tier, None when memory-only.
    pub fn storage_name(&self) -> Option<&'static str> {
        self.storage.as_ref().map(|s| s.name())
    }

    /// Number of records held by the storage tier.
    pub fn storage_len(&self) -> Result<usize> {
        match &self.storage {
            Some(storage) => Ok(storage.keys()?.len()),
            None => Ok(0),
        }
    }

    // == Set ==
    /// Stores a value with optional TTL in milliseconds.
    ///
    /// `None` applies the default TTL and `Some(0)` stores without expiry.
    pub fn set(&mut self, key: impl Into<String>, value: Value, ttl_ms: Option<u64>) -> Result<()> {
        self.set_with(
            key,
            value,
            EntryOptions {
                ttl_ms,
                ..EntryOptions::default()
            },
        )
    }

    /// Stores a value with TTL, metadata and tags.
    ///
    /// Overwriting a key resets its TTL and access statistics. A new key at
    /// the count limit triggers a batch eviction; exceeding the byte limit
    /// evicts until the total is back under 80% of it, never touching the
    /// entry being written.
    pub fn set_with(&mut self, key: impl Into<String>, value: Value, options: EntryOptions) -> Result<()> {
        let key = key.into();
        validate_key(&key)?;

        let size = measure(&key, &value, options.metadata.as_ref())?;
        let max_size = self.options.max_size_bytes;
        if max_size > 0 && size > max_size {
            return Err(CacheError::CacheFull(format!(
                "entry '{}' needs {} bytes, cache limit is {} bytes",
                key, size, max_size
            )));
        }

        if self.drop_from_memory(&key).is_none() && self.at_capacity() {
            self.evict(self.batch_eviction_count(), None);
        }

        let ttl = self.options.effective_ttl(options.ttl_ms);
        let seq = self.next_seq();
        let mut entry = CacheEntry::new(value, ttl)
            .with_metadata(options.metadata)
            .with_tags(options.tags);
        entry.size_bytes = size;
        entry.inserted_seq = seq;
        entry.accessed_seq = seq;

        self.total_size += size;
        self.entries.insert(key.clone(), entry);
        self.stats.record_set();

        self.enforce_max_size(Some(key.as_str()));
        self.persist(&key);
        Ok(())
    }

    // == Get ==
    /// Retrieves a value by key.
    ///
    /// Expired entries are removed and counted as misses. A memory miss
    /// falls back to the storage tier; a valid stored record is promoted
    /// back into memory.
    pub fn get(&mut self, key: &str) -> Result<Value> {
        self.lookup(key).map(|found| found.value)
    }

    /// Retrieves a value together with its metadata.
    pub fn get_with_metadata(&mut self, key: &str) -> Result<ValueWithMetadata> {
        self.lookup(key)
    }

    fn lookup(&mut self, key: &str) -> Result<ValueWithMetadata> {
        let now = current_timestamp_ms();

        match self.entries.get(key).map(|e| e.is_expired_at(now)) {
            Some(true) => {
                self.remove_entry(key);
                self.stats.record_expirations(1);
                self.stats.record_miss();
                return Err(CacheError::Expired(key.to_string()));
            }
            Some(false) => {}
            None => {
                if !self.promote_from_storage(key, now) {
                    self.stats.record_miss();
                    return Err(CacheError::NotFound(key.to_string()));
                }
                self.stats.record_storage_hit();
            }
        }

        let seq = self.next_seq();
        let entry = self
            .entries
            .get_mut(key)
            .ok_or_else(|| CacheError::Internal(format!("entry '{}' vanished during lookup", key)))?;
        entry.touch(now, seq);
        self.stats.record_hit();

        Ok(ValueWithMetadata {
            value: entry.value.clone(),
            metadata: entry.metadata.clone(),
        })
    }

    // == Has ==
    /// True when the key is held in memory and not expired.
    ///
    /// Does not touch access statistics or hit/miss counters.
    pub fn has(&self, key: &str) -> bool {
        self.entries
            .get(key)
            .map(|e| !e.is_expired())
            .unwrap_or(false)
    }

    // == Delete ==
    /// Removes an entry from memory and from the storage tier.
    pub fn delete(&mut self, key: &str) -> Result<()> {
        let in_memory = self.drop_from_memory(key).is_some();
        let in_storage = match self.storage.as_mut() {
            Some(storage) => matches!(storage.get_item(key), Ok(Some(_))),
            None => false,
        };

        if !in_memory && !in_storage {
            return Err(CacheError::NotFound(key.to_string()));
        }

        self.remove_from_storage(key);
        self.stats.record_delete();
        Ok(())
    }

    // == Clear ==
    /// Empties memory and the storage tier.
    ///
    /// Returns the number of in-memory entries dropped.
    pub fn clear(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        self.total_size = 0;

        if let Some(storage) = self.storage.as_mut() {
            if let Err(e) = storage.clear() {
                warn!(tier = storage.name(), error = %e, "failed to clear storage tier");
            }
        }
        count
    }

    // == Invalidate By Tag ==
    /// Deletes every entry carrying `tag`, including records that only live
    /// in the storage tier.
    pub fn invalidate_by_tag(&mut self, tag: &str) -> usize {
        let mut keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, e)| e.has_tag(tag))
            .map(|(k, _)| k.clone())
            .collect();

        keys.extend(
            self.stored_only_records()
                .into_iter()
                .filter(|(_, e)| e.has_tag(tag))
                .map(|(k, _)| k),
        );

        for key in &keys {
            self.remove_entry(key);
            self.stats.record_delete();
        }

        debug!(tag, count = keys.len(), "invalidated entries by tag");
        keys.len()
    }

    // == Cleanup Expired ==
    /// Removes all expired entries.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup_expired(&mut self) -> usize {
        let now = current_timestamp_ms();
        let expired_keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired_keys {
            self.remove_entry(key);
        }

        self.stats.record_expirations(expired_keys.len());
        expired_keys.len()
    }

    // == Listing ==
    /// Keys of live in-memory entries, sorted.
    pub fn keys(&self) -> Vec<String> {
        let now = current_timestamp_ms();
        let mut keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, e)| !e.is_expired_at(now))
            .map(|(k, _)| k.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Live in-memory key/value pairs, sorted by key.
    pub fn entries(&self) -> Vec<(String, Value)> {
        let now = current_timestamp_ms();
        let mut pairs: Vec<(String, Value)> = self
            .entries
            .iter()
            .filter(|(_, e)| !e.is_expired_at(now))
            .map(|(k, e)| (k.clone(), e.value.clone()))
            .collect();
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        pairs
    }

    /// Returns the current number of entries in memory.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // == Stats ==
    /// Returns current cache counters.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.total_entries = self.entries.len();
        stats.approximate_size_bytes = self.total_size;
        stats
    }

    /// Summarises the entries currently held.
    pub fn report(&self) -> CacheReport {
        let now = current_timestamp_ms();
        let total = self.entries.len();
        let expired = self.entries.values().filter(|e| e.is_expired_at(now)).count();
        let oldest = self.entries.values().map(|e| e.created_at).min();
        let newest = self.entries.values().map(|e| e.created_at).max();
        let accesses: u64 = self.entries.values().map(|e| e.access_count).sum();

        CacheReport {
            total_entries: total,
            expired_entries: expired,
            approximate_size_bytes: self.total_size,
            oldest_item_age_ms: oldest.map(|t| now.saturating_sub(t)).unwrap_or(0),
            newest_item_age_ms: newest.map(|t| now.saturating_sub(t)).unwrap_or(0),
            average_access_count: if total == 0 {
                0.0
            } else {
                accesses as f64 / total as f64
            },
            storage_type: self.options.persistence,
            eviction_policy: self.options.eviction_policy,
            counters: self.stats(),
        }
    }

    // == Storage Tier ==
    /// Loads every live record from the storage tier.
    ///
    /// Expired and undecodable records are removed from the tier. When the
    /// tier holds more than `max_entries`, the most recently read records
    /// are kept in memory and the rest stay in storage only.
    fn load_from_storage(&mut self) -> usize {
        let Some(storage) = self.storage.as_mut() else {
            return 0;
        };

        let keys = match storage.keys() {
            Ok(keys) => keys,
            Err(e) => {
                warn!(tier = storage.name(), error = %e, "failed to list storage records");
                return 0;
            }
        };

        let now = current_timestamp_ms();
        let mut loaded = Vec::new();
        let mut stale = Vec::new();

        for key in keys {
            match storage.get_item(&key) {
                Ok(Some(bytes)) => match codec::decode(&bytes) {
                    Ok(entry) if !entry.is_expired_at(now) => loaded.push((key, entry)),
                    Ok(_) => stale.push(key),
                    Err(e) => {
                        warn!(key = %key, error = %e, "dropping undecodable storage record");
                        stale.push(key);
                    }
                },
                Ok(None) => {}
                Err(e) => warn!(key = %key, error = %e, "failed to read storage record"),
            }
        }

        for key in &stale {
            if let Err(e) = storage.remove_item(key) {
                warn!(key = %key, error = %e, "failed to remove stale storage record");
            }
        }

        let capacity = match self.options.max_entries {
            0 => usize::MAX,
            max => max,
        };
        loaded.sort_by(|a, b| b.1.last_accessed.cmp(&a.1.last_accessed));
        loaded.truncate(capacity);
        // Oldest reads get the lowest sequence numbers
        loaded.reverse();

        let mut count = 0;
        for (key, mut entry) in loaded {
            let Ok(size) = measure(&key, &entry.value, entry.metadata.as_ref()) else {
                continue;
            };
            let seq = self.next_seq();
            entry.size_bytes = size;
            entry.inserted_seq = seq;
            entry.accessed_seq = seq;
            self.total_size += size;
            self.entries.insert(key, entry);
            count += 1;
        }

        self.enforce_max_size(None);
        count
    }

    /// Pulls a record from the storage tier into memory.
    ///
    /// Returns true when the key is now held in memory.
    fn promote_from_storage(&mut self, key: &str, now: u64) -> bool {
        let Some(storage) = self.storage.as_mut() else {
            return false;
        };

        let bytes = match storage.get_item(key) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return false,
            Err(e) => {
                warn!(key, tier = storage.name(), error = %e, "storage read failed");
                return false;
            }
        };

        let mut entry = match codec::decode(&bytes) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(key, error = %e, "dropping undecodable storage record");
                self.remove_from_storage(key);
                return false;
            }
        };

        if entry.is_expired_at(now) {
            self.remove_from_storage(key);
            self.stats.record_expirations(1);
            return false;
        }

        let Ok(size) = measure(key, &entry.value, entry.metadata.as_ref()) else {
            self.remove_from_storage(key);
            return false;
        };

        if self.at_capacity() {
            self.evict(self.batch_eviction_count(), None);
        }

        let seq = self.next_seq();
        entry.size_bytes = size;
        entry.inserted_seq = seq;
        entry.accessed_seq = seq;
        self.total_size += size;
        self.entries.insert(key.to_string(), entry);
        self.enforce_max_size(Some(key));

        debug!(key, "promoted entry from storage");
        true
    }

    /// Decoded storage records whose keys are not in memory.
    fn stored_only_records(&mut self) -> Vec<(String, CacheEntry)> {
        let Some(storage) = self.storage.as_mut() else {
            return Vec::new();
        };
        let keys = match storage.keys() {
            Ok(keys) => keys,
            Err(e) => {
                warn!(error = %e, "failed to list storage records");
                return Vec::new();
            }
        };

        keys.into_iter()
            .filter(|k| !self.entries.contains_key(k))
            .filter_map(|k| {
                let bytes = storage.get_item(&k).ok().flatten()?;
                codec::decode(&bytes).ok().map(|entry| (k, entry))
            })
            .collect()
    }

    fn persist(&mut self, key: &str) {
        let Some(storage) = self.storage.as_mut() else {
            return;
        };
        let Some(entry) = self.entries.get(key) else {
            return;
        };

        let written = codec::encode(entry, self.options.compression_threshold)
            .and_then(|bytes| storage.set_item(key, &bytes).map_err(CacheError::from));
        if let Err(e) = written {
            warn!(key, tier = storage.name(), error = %e, "failed to mirror entry to storage");
        }
    }

    fn remove_from_storage(&mut self, key: &str) {
        if let Some(storage) = self.storage.as_mut() {
            if let Err(e) = storage.remove_item(key) {
                warn!(key, tier = storage.name(), error = %e, "failed to remove storage record");
            }
        }
    }

    // == Eviction ==
    fn at_capacity(&self) -> bool {
        self.options.max_entries > 0 && self.entries.len() >= self.options.max_entries
    }

    fn batch_eviction_count(&self) -> usize {
        ((self.options.max_entries as f64 * EVICTION_BATCH_RATIO).ceil() as usize).max(1)
    }

    /// Removes up to `count` entries in policy order, storage copies included.
    fn evict(&mut self, count: usize, protected: Option<&str>) -> usize {
        let victims = self
            .options
            .eviction_policy
            .select_victims(&self.entries, count, protected);

        for key in &victims {
            self.remove_entry(key);
            self.stats.record_eviction();
        }

        if !victims.is_empty() {
            debug!(
                evicted = victims.len(),
                policy = %self.options.eviction_policy,
                "evicted entries"
            );
        }
        victims.len()
    }

    fn enforce_max_size(&mut self, protected: Option<&str>) {
        let max = self.options.max_size_bytes;
        if max == 0 || self.total_size <= max {
            return;
        }

        let target = (max as f64 * SIZE_TARGET_RATIO) as usize;
        let order = self.options.eviction_policy.select_victims(
            &self.entries,
            self.entries.len(),
            protected,
        );

        let mut evicted = 0;
        for key in order {
            if self.total_size <= target {
                break;
            }
            self.remove_entry(&key);
            self.stats.record_eviction();
            evicted += 1;
        }

        debug!(evicted, total_size = self.total_size, "size limit enforced");
    }

    fn drop_from_memory(&mut self, key: &str) -> Option<CacheEntry> {
        let entry = self.entries.remove(key)?;
        self.total_size = self.total_size.saturating_sub(entry.size_bytes);
        Some(entry)
    }

    fn remove_entry(&mut self, key: &str) -> Option<CacheEntry> {
        let entry = self.drop_from_memory(key);
        self.remove_from_storage(key);
        entry
    }

    fn next_seq(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CacheError::InvalidRequest("Key cannot be empty".to_string()));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(CacheError::InvalidRequest(format!(
            "Key exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        )));
    }
    Ok(())
}

/// Approximate footprint of an entry.
fn measure(key: &str, value: &Value, metadata: Option<&Metadata>) -> Result<usize> {
    let value_len = serde_json::to_vec(value)?.len();
    if value_len > MAX_VALUE_SIZE {
        return Err(CacheError::InvalidRequest(format!(
            "Value exceeds maximum size of {} bytes",
            MAX_VALUE_SIZE
        )));
    }
    let metadata_len = match metadata {
        Some(metadata) => serde_json::to_vec(metadata)?.len(),
        None => 0,
    };
    Ok(key.len() + value_len + metadata_len)
}
