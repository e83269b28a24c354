//! Tuning knobs for a [`DataCache`](crate::cache::DataCache).

use std::path::PathBuf;

use serde_json::Value;

use crate::cache::{EvictionPolicy, Metadata};
use crate::storage::{PersistencePolicy, DEFAULT_PREFIX};

/// Cache construction options.
#[derive(Debug, Clone)]
pub struct CacheOptions {
    /// TTL applied when a write does not specify one, 0 = never expire
    pub default_ttl_ms: u64,
    /// Entry count limit, 0 = unlimited
    pub max_entries: usize,
    /// Approximate byte limit, 0 = unlimited
    pub max_size_bytes: usize,
    pub eviction_policy: EvictionPolicy,
    pub persistence: PersistencePolicy,
    pub storage_prefix: String,
    /// Directory used by file-backed tiers
    pub storage_dir: PathBuf,
    /// Byte quota of file-backed tiers, None = unlimited
    pub storage_quota_bytes: Option<u64>,
    /// Records above this many bytes are compressed, 0 = never
    pub compression_threshold: usize,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            default_ttl_ms: 5 * 60 * 1000,
            max_entries: 1000,
            max_size_bytes: 0,
            eviction_policy: EvictionPolicy::Lru,
            persistence: PersistencePolicy::None,
            storage_prefix: DEFAULT_PREFIX.to_string(),
            storage_dir: PathBuf::from("data/cache"),
            storage_quota_bytes: None,
            compression_threshold: 10 * 1024,
        }
    }
}

impl CacheOptions {
    /// TTL in effect for a write.
    ///
    /// `None` takes the default, `Some(0)` disables expiry.
    pub fn effective_ttl(&self, ttl_ms: Option<u64>) -> Option<u64> {
        match ttl_ms {
            Some(0) => None,
            Some(ttl) => Some(ttl),
            None if self.default_ttl_ms == 0 => None,
            None => Some(self.default_ttl_ms),
        }
    }
}

/// Per-write options.
#[derive(Debug, Clone, Default)]
pub struct EntryOptions {
    /// TTL in milliseconds, see [`CacheOptions::effective_ttl`]
    pub ttl_ms: Option<u64>,
    pub metadata: Option<Metadata>,
    pub tags: Vec<String>,
}

impl EntryOptions {
    pub fn ttl(ttl_ms: u64) -> Self {
        Self {
            ttl_ms: Some(ttl_ms),
            ..Self::default()
        }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }
}

/// A value together with the metadata it was stored with.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueWithMetadata {
    pub value: Value,
    pub metadata: Option<Metadata>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_ttl() {
        let options = CacheOptions::default();
        assert_eq!(options.effective_ttl(None), Some(300_000));
        assert_eq!(options.effective_ttl(Some(0)), None);
        assert_eq!(options.effective_ttl(Some(25)), Some(25));

        let no_default = CacheOptions {
            default_ttl_ms: 0,
            ..CacheOptions::default()
        };
        assert_eq!(no_default.effective_ttl(None), None);
    }

    #[test]
    fn test_entry_options_builder() {
        let options = EntryOptions::ttl(10).with_tag("a").with_tag("b");
        assert_eq!(options.ttl_ms, Some(10));
        assert_eq!(options.tags, vec!["a".to_string(), "b".to_string()]);
    }
}
