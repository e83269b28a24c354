//! Response DTOs for the cache server API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;
use serde_json::Value;

use crate::cache::{CacheReport, Metadata};
use crate::monitor::{Alert, ComponentHealth, HealthStatus, PerformanceMetric, SystemHealth};

/// Response body for the GET operation (GET /get/:key)
#[derive(Debug, Clone, Serialize)]
pub struct GetResponse {
    /// The requested key
    pub key: String,
    /// The stored value
    pub value: Value,
}

impl GetResponse {
    /// Creates a new GetResponse
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// Response body for GET /get/:key/meta
#[derive(Debug, Clone, Serialize)]
pub struct GetWithMetadataResponse {
    pub key: String,
    pub value: Value,
    pub metadata: Option<Metadata>,
}

/// Response body for the SET operation (PUT /set)
#[derive(Debug, Clone, Serialize)]
pub struct SetResponse {
    /// Success message
    pub message: String,
    /// The key that was set
    pub key: String,
}

impl SetResponse {
    /// Creates a new SetResponse
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' set successfully", key),
            key,
        }
    }
}

/// Response body for the DELETE operation (DELETE /del/:key)
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    /// Success message
    pub message: String,
    /// The key that was deleted
    pub key: String,
}

impl DeleteResponse {
    /// Creates a new DeleteResponse
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' deleted successfully", key),
            key,
        }
    }
}

/// Response body for bulk operations (clear, invalidate, cleanup)
#[derive(Debug, Clone, Serialize)]
pub struct CountResponse {
    pub message: String,
    /// Number of entries affected
    pub count: usize,
}

impl CountResponse {
    pub fn new(message: impl Into<String>, count: usize) -> Self {
        Self {
            message: message.into(),
            count,
        }
    }
}

/// Response body for GET /keys
#[derive(Debug, Clone, Serialize)]
pub struct KeysResponse {
    pub keys: Vec<String>,
    pub count: usize,
}

impl KeysResponse {
    pub fn new(keys: Vec<String>) -> Self {
        Self {
            count: keys.len(),
            keys,
        }
    }
}

/// Response body for GET /entries
#[derive(Debug, Clone, Serialize)]
pub struct EntriesResponse {
    pub entries: Vec<GetResponse>,
    pub count: usize,
}

impl EntriesResponse {
    pub fn new(entries: Vec<(String, Value)>) -> Self {
        let entries: Vec<GetResponse> = entries
            .into_iter()
            .map(|(key, value)| GetResponse::new(key, value))
            .collect();
        Self {
            count: entries.len(),
            entries,
        }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Number of cache hits
    pub hits: u64,
    /// Number of cache misses
    pub misses: u64,
    /// Number of evictions
    pub evictions: u64,
    /// Current number of entries in cache
    pub total_entries: usize,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
    /// Entry summary and full counters
    pub report: CacheReport,
}

impl StatsResponse {
    /// Creates a new StatsResponse from a cache report
    pub fn new(report: CacheReport) -> Self {
        let counters = &report.counters;
        Self {
            hits: counters.hits,
            misses: counters.misses,
            evictions: counters.evictions,
            total_entries: report.total_entries,
            hit_rate: counters.hit_rate(),
            report,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Overall status (healthy, warning, critical, unknown)
    pub status: HealthStatus,
    pub score: u8,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
    pub components: Vec<ComponentHealth>,
}

impl HealthResponse {
    pub fn new(health: SystemHealth) -> Self {
        Self {
            status: health.status,
            score: health.score,
            timestamp: health.checked_at.to_rfc3339(),
            components: health.components,
        }
    }
}

/// Response body for GET /metrics
#[derive(Debug, Clone, Serialize)]
pub struct MetricsResponse {
    pub metrics: Vec<PerformanceMetric>,
    pub count: usize,
}

impl MetricsResponse {
    pub fn new(metrics: Vec<PerformanceMetric>) -> Self {
        Self {
            count: metrics.len(),
            metrics,
        }
    }
}

/// Response body for GET /alerts
#[derive(Debug, Clone, Serialize)]
pub struct AlertsResponse {
    pub alerts: Vec<Alert>,
    pub count: usize,
}

impl AlertsResponse {
    pub fn new(alerts: Vec<Alert>) -> Self {
        Self {
            count: alerts.len(),
            alerts,
        }
    }
}

/// Response body for POST /alerts/:id/resolve
#[derive(Debug, Clone, Serialize)]
pub struct ResolveAlertResponse {
    pub message: String,
    pub id: String,
}

impl ResolveAlertResponse {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            message: format!("Alert '{}' resolved", id),
            id,
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    /// Creates a new ErrorResponse
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
