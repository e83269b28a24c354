//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Free-form metadata attached to an entry.
pub type Metadata = Map<String, Value>;

// == Cache Entry ==
/// Represents a single cache entry with value and access metadata.
///
/// The serialized form is what storage tiers hold; the logical sequence
/// numbers and the size estimate are rebuilt when an entry is loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The stored value
    pub value: Value,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Last read timestamp (Unix milliseconds)
    pub last_accessed: u64,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    pub expires_at: Option<u64>,
    /// Number of reads since the entry was written
    pub access_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Approximate footprint: key + serialized value + serialized metadata
    #[serde(skip)]
    pub size_bytes: usize,
    #[serde(skip)]
    pub(crate) inserted_seq: u64,
    #[serde(skip)]
    pub(crate) accessed_seq: u64,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry with optional TTL.
    ///
    /// # Arguments
    /// * `value` - The value to store
    /// * `ttl_ms` - Optional TTL in milliseconds, None = never expires
    pub fn new(value: Value, ttl_ms: Option<u64>) -> Self {
        let now = current_timestamp_ms();

        Self {
            value,
            created_at: now,
            last_accessed: now,
            expires_at: ttl_ms.map(|ttl| now.saturating_add(ttl)),
            access_count: 0,
            metadata: None,
            tags: Vec::new(),
            size_bytes: 0,
            inserted_seq: 0,
            accessed_seq: 0,
        }
    }

    pub fn with_metadata(mut self, metadata: Option<Metadata>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired once the current time reaches its expiration
    /// time, so a fully elapsed TTL never yields the value again.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(current_timestamp_ms())
    }

    /// Expiry check against a caller-supplied clock reading.
    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        match self.expires_at {
            Some(expires) => now_ms >= expires,
            None => false,
        }
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds, or None if no expiration is set.
    ///
    /// # Returns
    /// - `Some(0)` if the entry has expired (TTL elapsed)
    /// - `Some(remaining_ms)` if the entry has TTL and hasn't expired
    /// - `None` if the entry has no TTL (never expires)
    pub fn ttl_remaining_ms(&self) -> Option<u64> {
        let now = current_timestamp_ms();
        self.expires_at.map(|expires| expires.saturating_sub(now))
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    // == Touch ==
    /// Records a read.
    pub(crate) fn touch(&mut self, now_ms: u64, seq: u64) {
        self.last_accessed = now_ms;
        self.accessed_seq = seq;
        self.access_count += 1;
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn test_entry_creation_no_ttl() {
        let entry = CacheEntry::new(json!("test_value"), None);

        assert_eq!(entry.value, json!("test_value"));
        assert!(entry.expires_at.is_none());
        assert!(!entry.is_expired());
        assert_eq!(entry.access_count, 0);
    }

    #[test]
    fn test_entry_creation_with_ttl() {
        let entry = CacheEntry::new(json!({"price": 250000}), Some(60_000));

        assert!(entry.expires_at.is_some());
        assert!(!entry.is_expired());
    }

    #[test]
    fn test_entry_expiration() {
        let entry = CacheEntry::new(json!(1), Some(50));

        assert!(!entry.is_expired());

        sleep(Duration::from_millis(80));

        assert!(entry.is_expired());
        assert_eq!(entry.ttl_remaining_ms(), Some(0));
    }

    #[test]
    fn test_ttl_remaining_ms() {
        let entry = CacheEntry::new(json!(1), Some(10_000));

        let remaining_ms = entry.ttl_remaining_ms().unwrap();
        assert!(remaining_ms <= 10_000);
        assert!(remaining_ms >= 9_000);
    }

    #[test]
    fn test_ttl_remaining_no_expiration() {
        let entry = CacheEntry::new(json!(1), None);
        assert!(entry.ttl_remaining_ms().is_none());
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let mut entry = CacheEntry::new(json!("test"), None);
        entry.expires_at = Some(entry.created_at);

        assert!(entry.is_expired_at(entry.created_at), "Entry should be expired at boundary");
        assert!(!entry.is_expired_at(entry.created_at - 1));
    }

    #[test]
    fn test_touch_updates_access_stats() {
        let mut entry = CacheEntry::new(json!(1), None);

        entry.touch(entry.created_at + 5, 7);
        entry.touch(entry.created_at + 9, 8);

        assert_eq!(entry.access_count, 2);
        assert_eq!(entry.accessed_seq, 8);
        assert_eq!(entry.last_accessed, entry.created_at + 9);
    }

    #[test]
    fn test_serialized_form_skips_bookkeeping() {
        let mut entry = CacheEntry::new(json!("v"), None).with_tags(vec!["listing".into()]);
        entry.size_bytes = 99;
        entry.inserted_seq = 3;

        let json = serde_json::to_value(&entry).unwrap();
        assert!(json.get("size_bytes").is_none());
        assert!(json.get("inserted_seq").is_none());
        assert!(json.get("metadata").is_none());
        assert_eq!(json["tags"], json!(["listing"]));
    }
}
