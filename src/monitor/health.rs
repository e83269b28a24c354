//! Component health checks.
//!
//! Each [`HealthProbe`] reports on one component; [`check_all`] runs them
//! and folds the results into a [`SystemHealth`] score.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cache::SharedCache;
use crate::monitor::{OperationTimer, SharedMonitor};

// == Health Status ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Warning,
    Critical,
    Unknown,
}

impl HealthStatus {
    /// Status for a measured latency against two bounds.
    pub fn from_latency(ms: f64, healthy_below: f64, warning_below: f64) -> Self {
        if ms < healthy_below {
            HealthStatus::Healthy
        } else if ms < warning_below {
            HealthStatus::Warning
        } else {
            HealthStatus::Critical
        }
    }
}

// == Component Health ==
#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealth {
    pub name: String,
    pub status: HealthStatus,
    pub response_time_ms: f64,
    pub last_check: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    pub metrics: BTreeMap<String, f64>,
}

impl ComponentHealth {
    pub fn new(name: impl Into<String>, status: HealthStatus, response_time_ms: f64) -> Self {
        Self {
            name: name.into(),
            status,
            response_time_ms,
            last_check: Utc::now(),
            last_error: None,
            metrics: BTreeMap::new(),
        }
    }

    pub fn failed(name: impl Into<String>, response_time_ms: f64, error: impl ToString) -> Self {
        Self {
            last_error: Some(error.to_string()),
            ..Self::new(name, HealthStatus::Critical, response_time_ms)
        }
    }

    pub fn with_metric(mut self, key: &str, value: f64) -> Self {
        self.metrics.insert(key.to_string(), value);
        self
    }
}

// == System Health ==
#[derive(Debug, Clone, Serialize)]
pub struct SystemHealth {
    pub status: HealthStatus,
    /// 0 to 100, healthy components count fully and warnings count half
    pub score: u8,
    pub components: Vec<ComponentHealth>,
    pub checked_at: DateTime<Utc>,
}

impl SystemHealth {
    pub fn from_components(components: Vec<ComponentHealth>) -> Self {
        let count = |status| components.iter().filter(|c| c.status == status).count();
        let healthy = count(HealthStatus::Healthy);
        let warning = count(HealthStatus::Warning);
        let critical = count(HealthStatus::Critical);

        let (status, score) = if components.is_empty() {
            (HealthStatus::Unknown, 0)
        } else {
            let status = if critical > 0 {
                HealthStatus::Critical
            } else if warning > 0 {
                HealthStatus::Warning
            } else {
                HealthStatus::Healthy
            };
            let points = (healthy * 100 + warning * 50) as f64 / components.len() as f64;
            (status, points.round() as u8)
        };

        Self {
            status,
            score,
            components,
            checked_at: Utc::now(),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}

// == Probe Trait ==
#[async_trait]
pub trait HealthProbe: Send + Sync {
    fn name(&self) -> &str;

    async fn check(&self) -> ComponentHealth;
}

/// Runs every probe in order and aggregates the results.
pub async fn check_all(probes: &[Arc<dyn HealthProbe>]) -> SystemHealth {
    let mut components = Vec::with_capacity(probes.len());
    for probe in probes {
        components.push(probe.check().await);
    }
    SystemHealth::from_components(components)
}

// == Built-in Probes ==
/// Lock latency, size and hit rate of the cache.
pub struct CacheProbe {
    cache: SharedCache,
}

impl CacheProbe {
    pub fn new(cache: SharedCache) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl HealthProbe for CacheProbe {
    fn name(&self) -> &str {
        "cache"
    }

    async fn check(&self) -> ComponentHealth {
        let timer = OperationTimer::start();
        let cache = self.cache.read().await;
        let stats = cache.stats();
        drop(cache);
        let ms = timer.elapsed_ms();

        ComponentHealth::new(self.name(), HealthStatus::from_latency(ms, 50.0, 200.0), ms)
            .with_metric("entries", stats.total_entries as f64)
            .with_metric("hit_rate", stats.hit_rate())
            .with_metric("size_bytes", stats.approximate_size_bytes as f64)
    }
}

/// Reachability of the cache's storage tier.
pub struct StorageProbe {
    cache: SharedCache,
}

impl StorageProbe {
    pub fn new(cache: SharedCache) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl HealthProbe for StorageProbe {
    fn name(&self) -> &str {
        "storage"
    }

    async fn check(&self) -> ComponentHealth {
        let timer = OperationTimer::start();
        let cache = self.cache.read().await;
        let tier = cache.storage_name();
        let listed = cache.storage_len();
        drop(cache);
        let ms = timer.elapsed_ms();

        match (tier, listed) {
            (None, _) => ComponentHealth::new(self.name(), HealthStatus::Healthy, ms)
                .with_metric("records", 0.0),
            (Some(_), Ok(records)) => {
                ComponentHealth::new(self.name(), HealthStatus::from_latency(ms, 100.0, 500.0), ms)
                    .with_metric("records", records as f64)
            }
            (Some(_), Err(e)) => ComponentHealth::failed(self.name(), ms, e),
        }
    }
}

/// Backlog of metrics waiting to be reported.
pub struct ReporterProbe {
    monitor: SharedMonitor,
}

impl ReporterProbe {
    pub fn new(monitor: SharedMonitor) -> Self {
        Self { monitor }
    }
}

#[async_trait]
impl HealthProbe for ReporterProbe {
    fn name(&self) -> &str {
        "reporter"
    }

    async fn check(&self) -> ComponentHealth {
        let timer = OperationTimer::start();
        let monitor = self.monitor.read().await;
        let pending = monitor.pending_reports();
        let capacity = monitor.max_queue();
        let dropped = monitor.dropped_reports();
        drop(monitor);

        // Half a queue of unsent metrics is a warning, a full one is critical
        let status = if pending >= capacity {
            HealthStatus::Critical
        } else if pending * 2 >= capacity {
            HealthStatus::Warning
        } else {
            HealthStatus::Healthy
        };

        ComponentHealth::new(self.name(), status, timer.elapsed_ms())
            .with_metric("pending", pending as f64)
            .with_metric("dropped", dropped as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheOptions, DataCache};
    use crate::monitor::{MonitorOptions, PerformanceMonitor, Tags};
    use crate::storage::{MemoryStorage, PersistencePolicy};
    use serde_json::json;
    use tokio::sync::RwLock;

    struct FixedProbe(HealthStatus);

    #[async_trait]
    impl HealthProbe for FixedProbe {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn check(&self) -> ComponentHealth {
            ComponentHealth::new(self.name(), self.0, 0.0)
        }
    }

    fn fixed(statuses: &[HealthStatus]) -> Vec<Arc<dyn HealthProbe>> {
        statuses
            .iter()
            .map(|s| Arc::new(FixedProbe(*s)) as Arc<dyn HealthProbe>)
            .collect()
    }

    #[tokio::test]
    async fn test_score_and_status_aggregation() {
        let health = check_all(&fixed(&[HealthStatus::Healthy, HealthStatus::Healthy])).await;
        assert_eq!(health.status, HealthStatus::Healthy);
        assert_eq!(health.score, 100);

        let health = check_all(&fixed(&[
            HealthStatus::Healthy,
            HealthStatus::Warning,
            HealthStatus::Critical,
        ]))
        .await;
        assert_eq!(health.status, HealthStatus::Critical);
        assert_eq!(health.score, 50);

        let health = check_all(&fixed(&[HealthStatus::Healthy, HealthStatus::Warning])).await;
        assert_eq!(health.status, HealthStatus::Warning);
        assert_eq!(health.score, 75);
    }

    #[tokio::test]
    async fn test_no_probes_is_unknown() {
        let health = check_all(&[]).await;
        assert_eq!(health.status, HealthStatus::Unknown);
        assert_eq!(health.score, 0);
        assert!(!health.is_healthy());
    }

    #[test]
    fn test_latency_bands() {
        assert_eq!(HealthStatus::from_latency(10.0, 50.0, 200.0), HealthStatus::Healthy);
        assert_eq!(HealthStatus::from_latency(50.0, 50.0, 200.0), HealthStatus::Warning);
        assert_eq!(HealthStatus::from_latency(250.0, 50.0, 200.0), HealthStatus::Critical);
    }

    #[tokio::test]
    async fn test_cache_and_storage_probes() {
        let options = CacheOptions {
            persistence: PersistencePolicy::Session,
            ..CacheOptions::default()
        };
        let cache: SharedCache = Arc::new(RwLock::new(DataCache::with_storage(
            options,
            Some(Box::new(MemoryStorage::new())),
        )));
        cache.write().await.set("a", json!(1), None).unwrap();

        let cache_health = CacheProbe::new(cache.clone()).check().await;
        assert_eq!(cache_health.status, HealthStatus::Healthy);
        assert_eq!(cache_health.metrics["entries"], 1.0);

        let storage_health = StorageProbe::new(cache).check().await;
        assert_eq!(storage_health.status, HealthStatus::Healthy);
        assert_eq!(storage_health.metrics["records"], 1.0);
    }

    #[tokio::test]
    async fn test_reporter_probe_backlog() {
        let monitor: SharedMonitor = Arc::new(RwLock::new(PerformanceMonitor::new(MonitorOptions {
            max_queue: 4,
            ..MonitorOptions::default()
        })));
        let probe = ReporterProbe::new(monitor.clone());
        assert_eq!(probe.check().await.status, HealthStatus::Healthy);

        for _ in 0..2 {
            monitor.write().await.record_business_metric("m", 1.0, "count", Tags::new());
        }
        assert_eq!(probe.check().await.status, HealthStatus::Warning);

        for _ in 0..2 {
            monitor.write().await.record_business_metric("m", 1.0, "count", Tags::new());
        }
        let health = probe.check().await;
        assert_eq!(health.status, HealthStatus::Critical);
        assert_eq!(health.metrics["pending"], 4.0);
    }
}
