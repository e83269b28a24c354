//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::cache::{CacheOptions, EvictionPolicy};
use crate::monitor::MonitorOptions;
use crate::storage::{PersistencePolicy, DEFAULT_PREFIX};

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of entries the cache can hold, 0 = unlimited
    pub max_entries: usize,
    /// Default TTL in milliseconds for entries without explicit TTL, 0 = never expire
    pub default_ttl_ms: u64,
    /// Approximate byte limit of the cache, 0 = unlimited
    pub max_size_bytes: usize,
    pub eviction_policy: EvictionPolicy,
    pub persistence: PersistencePolicy,
    pub storage_dir: PathBuf,
    pub storage_prefix: String,
    /// Byte quota of file storage, 0 = unlimited
    pub storage_quota_bytes: u64,
    /// Stored records above this size are compressed, 0 = never
    pub compression_threshold: usize,
    /// HTTP server port
    pub server_port: u16,
    /// Background cleanup task interval in seconds, 0 = disabled
    pub cleanup_interval: u64,
    /// Share of non-error metrics forwarded to the reporter
    pub metrics_sample_rate: f64,
    pub metrics_batch_size: usize,
    /// Metrics held for reporting before the oldest are dropped
    pub metrics_max_queue: usize,
    /// Reporter flush interval in seconds
    pub metrics_flush_interval: u64,
    /// Collector URL; metrics are logged when unset
    pub metrics_endpoint: Option<String>,
    /// Health check interval in seconds, 0 = disabled
    pub monitor_interval: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MAX_ENTRIES` - Maximum cache entries (default: 1000)
    /// - `DEFAULT_TTL_MS` - Default TTL in milliseconds (default: 300000)
    /// - `MAX_SIZE_BYTES` - Cache byte limit (default: 0, unlimited)
    /// - `EVICTION_POLICY` - lru, lfu or fifo (default: lru)
    /// - `PERSISTENCE` - none, session, permanent or multi_level (default: none)
    /// - `STORAGE_DIR` - Directory for file storage (default: data/cache)
    /// - `STORAGE_PREFIX` - Record name prefix (default: dataCache_)
    /// - `STORAGE_QUOTA_BYTES` - File storage quota (default: 0, unlimited)
    /// - `COMPRESSION_THRESHOLD` - Compression threshold in bytes (default: 10240)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CLEANUP_INTERVAL` - Cleanup frequency in seconds (default: 60)
    /// - `METRICS_SAMPLE_RATE` - 0.0 to 1.0 (default: 1.0)
    /// - `METRICS_BATCH_SIZE` - Metrics per report batch (default: 50)
    /// - `METRICS_MAX_QUEUE` - Unsent metric limit (default: 10000)
    /// - `METRICS_FLUSH_INTERVAL` - Report flush frequency in seconds (default: 30)
    /// - `METRICS_ENDPOINT` - Collector URL (default: unset, log only)
    /// - `MONITOR_INTERVAL` - Health check frequency in seconds (default: 30)
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds a Config from an arbitrary variable source.
    ///
    /// Unparseable values are logged and replaced by their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let parse = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        Self {
            max_entries: parsed(&lookup, "MAX_ENTRIES", defaults.max_entries),
            default_ttl_ms: parsed(&lookup, "DEFAULT_TTL_MS", defaults.default_ttl_ms),
            max_size_bytes: parsed(&lookup, "MAX_SIZE_BYTES", defaults.max_size_bytes),
            eviction_policy: parsed(&lookup, "EVICTION_POLICY", defaults.eviction_policy),
            persistence: parsed(&lookup, "PERSISTENCE", defaults.persistence),
            storage_dir: parse("STORAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.storage_dir),
            storage_prefix: parse("STORAGE_PREFIX").unwrap_or(defaults.storage_prefix),
            storage_quota_bytes: parsed(&lookup, "STORAGE_QUOTA_BYTES", defaults.storage_quota_bytes),
            compression_threshold: parsed(
                &lookup,
                "COMPRESSION_THRESHOLD",
                defaults.compression_threshold,
            ),
            server_port: parsed(&lookup, "SERVER_PORT", defaults.server_port),
            cleanup_interval: parsed(&lookup, "CLEANUP_INTERVAL", defaults.cleanup_interval),
            metrics_sample_rate: parsed(&lookup, "METRICS_SAMPLE_RATE", defaults.metrics_sample_rate)
                .clamp(0.0, 1.0),
            metrics_batch_size: parsed(&lookup, "METRICS_BATCH_SIZE", defaults.metrics_batch_size)
                .max(1),
            metrics_max_queue: parsed(&lookup, "METRICS_MAX_QUEUE", defaults.metrics_max_queue)
                .max(1),
            metrics_flush_interval: parsed(
                &lookup,
                "METRICS_FLUSH_INTERVAL",
                defaults.metrics_flush_interval,
            )
            .max(1),
            metrics_endpoint: parse("METRICS_ENDPOINT"),
            monitor_interval: parsed(&lookup, "MONITOR_INTERVAL", defaults.monitor_interval),
        }
    }

    /// Cache options derived from this configuration.
    pub fn cache_options(&self) -> CacheOptions {
        CacheOptions {
            default_ttl_ms: self.default_ttl_ms,
            max_entries: self.max_entries,
            max_size_bytes: self.max_size_bytes,
            eviction_policy: self.eviction_policy,
            persistence: self.persistence,
            storage_prefix: self.storage_prefix.clone(),
            storage_dir: self.storage_dir.clone(),
            storage_quota_bytes: Some(self.storage_quota_bytes).filter(|q| *q > 0),
            compression_threshold: self.compression_threshold,
        }
    }

    /// Monitor options derived from this configuration.
    pub fn monitor_options(&self) -> MonitorOptions {
        MonitorOptions {
            sample_rate: self.metrics_sample_rate,
            max_queue: self.metrics_max_queue,
            ..MonitorOptions::default()
        }
    }

    /// None when the sweep is disabled.
    pub fn cleanup_period(&self) -> Option<Duration> {
        (self.cleanup_interval > 0).then(|| Duration::from_secs(self.cleanup_interval))
    }

    /// None when health monitoring is disabled.
    pub fn monitor_period(&self) -> Option<Duration> {
        (self.monitor_interval > 0).then(|| Duration::from_secs(self.monitor_interval))
    }

    pub fn flush_period(&self) -> Duration {
        Duration::from_secs(self.metrics_flush_interval)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            default_ttl_ms: 300_000,
            max_size_bytes: 0,
            eviction_policy: EvictionPolicy::Lru,
            persistence: PersistencePolicy::None,
            storage_dir: PathBuf::from("data/cache"),
            storage_prefix: DEFAULT_PREFIX.to_string(),
            storage_quota_bytes: 0,
            compression_threshold: 10 * 1024,
            server_port: 3000,
            cleanup_interval: 60,
            metrics_sample_rate: 1.0,
            metrics_batch_size: 50,
            metrics_max_queue: 10_000,
            metrics_flush_interval: 30,
            metrics_endpoint: None,
            monitor_interval: 30,
        }
    }
}

fn parsed<T, F>(lookup: &F, name: &str, default: T) -> T
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                warn!(variable = name, value = %raw, "invalid configuration value, using default");
                default
            }
        },
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.max_entries, 1000);
        assert_eq!(config.default_ttl_ms, 300_000);
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.cleanup_interval, 60);
        assert_eq!(config.persistence, PersistencePolicy::None);
        assert!(config.metrics_endpoint.is_none());
    }

    #[test]
    fn test_config_from_empty_source_uses_defaults() {
        let config = from_pairs(&[]);
        let defaults = Config::default();
        assert_eq!(config.max_entries, defaults.max_entries);
        assert_eq!(config.default_ttl_ms, defaults.default_ttl_ms);
        assert_eq!(config.eviction_policy, defaults.eviction_policy);
        assert_eq!(config.storage_prefix, "dataCache_");
    }

    #[test]
    fn test_config_overrides() {
        let config = from_pairs(&[
            ("MAX_ENTRIES", "50"),
            ("DEFAULT_TTL_MS", "1000"),
            ("EVICTION_POLICY", "lfu"),
            ("PERSISTENCE", "multi_level"),
            ("STORAGE_DIR", "/tmp/cache"),
            ("STORAGE_QUOTA_BYTES", "4096"),
            ("METRICS_SAMPLE_RATE", "0.1"),
            ("METRICS_ENDPOINT", "http://collector:9000/metrics"),
            ("CLEANUP_INTERVAL", "0"),
        ]);

        assert_eq!(config.max_entries, 50);
        assert_eq!(config.eviction_policy, EvictionPolicy::Lfu);
        assert_eq!(config.persistence, PersistencePolicy::MultiLevel);
        assert_eq!(config.metrics_sample_rate, 0.1);
        assert_eq!(config.cleanup_period(), None);

        let options = config.cache_options();
        assert_eq!(options.default_ttl_ms, 1000);
        assert_eq!(options.storage_dir, PathBuf::from("/tmp/cache"));
        assert_eq!(options.storage_quota_bytes, Some(4096));
        assert_eq!(
            config.metrics_endpoint.as_deref(),
            Some("http://collector:9000/metrics")
        );
    }

    #[test]
    fn test_config_invalid_values_fall_back() {
        let config = from_pairs(&[
            ("MAX_ENTRIES", "lots"),
            ("EVICTION_POLICY", "random"),
            ("SERVER_PORT", "99999"),
            ("METRICS_SAMPLE_RATE", "7"),
            ("METRICS_BATCH_SIZE", "0"),
            ("METRICS_ENDPOINT", "  "),
        ]);

        assert_eq!(config.max_entries, 1000);
        assert_eq!(config.eviction_policy, EvictionPolicy::Lru);
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.metrics_sample_rate, 1.0);
        assert_eq!(config.metrics_batch_size, 1);
        assert!(config.metrics_endpoint.is_none());
        assert_eq!(config.cache_options().storage_quota_bytes, None);
    }
}
