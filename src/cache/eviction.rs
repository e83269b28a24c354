//! Eviction Module
//!
//! Victim selection for the LRU, LFU and FIFO policies.
//!
//! Ordering uses the logical sequence numbers stamped by the store rather
//! than wall-clock timestamps, so many operations inside the same
//! millisecond still evict in a well-defined order.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::cache::CacheEntry;

// == Eviction Policy ==
/// Strategy used to pick entries to drop when the cache is over capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EvictionPolicy {
    /// Least recently used
    #[default]
    Lru,
    /// Least frequently used, ties go to the least recently used
    Lfu,
    /// First in, first out
    Fifo,
}

impl EvictionPolicy {
    // == Select Victims ==
    /// Returns up to `count` keys in the order they should be evicted.
    ///
    /// The `protected` key is never returned.
    pub fn select_victims<'a, I>(&self, entries: I, count: usize, protected: Option<&str>) -> Vec<String>
    where
        I: IntoIterator<Item = (&'a String, &'a CacheEntry)>,
    {
        if count == 0 {
            return Vec::new();
        }

        let mut candidates: Vec<(&String, &CacheEntry)> = entries
            .into_iter()
            .filter(|(key, _)| Some(key.as_str()) != protected)
            .collect();

        match self {
            EvictionPolicy::Lru => candidates.sort_by_key(|(_, e)| e.accessed_seq),
            EvictionPolicy::Lfu => {
                candidates.sort_by_key(|(_, e)| (e.access_count, e.accessed_seq))
            }
            EvictionPolicy::Fifo => candidates.sort_by_key(|(_, e)| e.inserted_seq),
        }

        candidates
            .into_iter()
            .take(count)
            .map(|(key, _)| key.clone())
            .collect()
    }
}

impl FromStr for EvictionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lru" => Ok(Self::Lru),
            "lfu" => Ok(Self::Lfu),
            "fifo" => Ok(Self::Fifo),
            other => Err(format!("unknown eviction policy '{}'", other)),
        }
    }
}

impl fmt::Display for EvictionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EvictionPolicy::Lru => "lru",
            EvictionPolicy::Lfu => "lfu",
            EvictionPolicy::Fifo => "fifo",
        };
        f.write_str(name)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    /// Builds entries as (key, inserted_seq, accessed_seq, access_count).
    fn entries(rows: &[(&str, u64, u64, u64)]) -> HashMap<String, CacheEntry> {
        rows.iter()
            .map(|(key, inserted, accessed, count)| {
                let mut entry = CacheEntry::new(json!(key), None);
                entry.inserted_seq = *inserted;
                entry.accessed_seq = *accessed;
                entry.access_count = *count;
                (key.to_string(), entry)
            })
            .collect()
    }

    #[test]
    fn test_lru_picks_least_recently_accessed() {
        // a inserted first but read last
        let map = entries(&[("a", 1, 9, 1), ("b", 2, 2, 0), ("c", 3, 5, 1)]);

        let victims = EvictionPolicy::Lru.select_victims(&map, 2, None);
        assert_eq!(victims, vec!["b".to_string(), "c".to_string()]);
    }

    #[test]
    fn test_lfu_picks_least_frequently_used() {
        let map = entries(&[("a", 1, 4, 5), ("b", 2, 8, 1), ("c", 3, 6, 1), ("d", 4, 7, 3)]);

        let victims = EvictionPolicy::Lfu.select_victims(&map, 3, None);
        // b and c tie on count; c was read less recently
        assert_eq!(victims, vec!["c".to_string(), "b".to_string(), "d".to_string()]);
    }

    #[test]
    fn test_fifo_ignores_access_pattern() {
        let map = entries(&[("a", 1, 99, 50), ("b", 2, 3, 0), ("c", 3, 4, 0)]);

        let victims = EvictionPolicy::Fifo.select_victims(&map, 1, None);
        assert_eq!(victims, vec!["a".to_string()]);
    }

    #[test]
    fn test_protected_key_is_skipped() {
        let map = entries(&[("a", 1, 1, 0), ("b", 2, 2, 0)]);

        let victims = EvictionPolicy::Fifo.select_victims(&map, 2, Some("a"));
        assert_eq!(victims, vec!["b".to_string()]);
    }

    #[test]
    fn test_count_larger_than_population() {
        let map = entries(&[("a", 1, 1, 0)]);

        assert_eq!(EvictionPolicy::Lru.select_victims(&map, 10, None).len(), 1);
        assert!(EvictionPolicy::Lru.select_victims(&map, 0, None).is_empty());
    }

    #[test]
    fn test_policy_parse_and_display() {
        assert_eq!("LFU".parse::<EvictionPolicy>(), Ok(EvictionPolicy::Lfu));
        assert!("random".parse::<EvictionPolicy>().is_err());
        assert_eq!(EvictionPolicy::Fifo.to_string(), "fifo");
    }
}
