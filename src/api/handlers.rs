//! API Handlers
//!
//! HTTP request handlers for each cache and monitoring endpoint.

use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use tokio::sync::{Notify, RwLock};

use crate::cache::{DataCache, SharedCache};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{
    AlertsQuery, AlertsResponse, CountResponse, DeleteResponse, EntriesResponse, GetResponse,
    GetWithMetadataResponse, HealthResponse, KeysResponse, MetricsQuery, MetricsResponse,
    ReportQuery, ResolveAlertResponse, SetRequest, SetResponse, StatsResponse,
};
use crate::monitor::{
    check_all, CacheProbe, HealthProbe, HealthStatus, OperationTimer, PerformanceMonitor,
    PerformanceReport, ReporterProbe, SharedMonitor, StorageProbe,
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Thread-safe cache
    pub cache: SharedCache,
    pub monitor: SharedMonitor,
    /// Probes behind GET /health and the monitoring task
    pub probes: Arc<Vec<Arc<dyn HealthProbe>>>,
    /// Wakes the reporting task when a report batch is full
    pub flush_notify: Arc<Notify>,
    /// Requests currently being served
    pub in_flight: Arc<AtomicUsize>,
}

impl AppState {
    /// Creates a new AppState around a cache with a default monitor.
    pub fn new(cache: DataCache) -> Self {
        Self::with_monitor(cache, PerformanceMonitor::default())
    }

    /// Creates a new AppState with the built-in cache, storage and reporter probes.
    pub fn with_monitor(cache: DataCache, monitor: PerformanceMonitor) -> Self {
        Self::assemble(cache, monitor, Arc::new(Notify::new()))
    }

    /// Creates a new AppState from configuration.
    ///
    /// Builds the cache and its storage tier, and a monitor whose outbox
    /// wakes the reporting task every `metrics_batch_size` metrics.
    pub fn from_config(config: &Config) -> Result<Self> {
        let cache = DataCache::new(config.cache_options())?;
        let notify = Arc::new(Notify::new());
        let monitor = PerformanceMonitor::new(config.monitor_options())
            .with_flush_notify(notify.clone(), config.metrics_batch_size);
        Ok(Self::assemble(cache, monitor, notify))
    }

    fn assemble(cache: DataCache, monitor: PerformanceMonitor, flush_notify: Arc<Notify>) -> Self {
        let cache = Arc::new(RwLock::new(cache));
        let monitor = Arc::new(RwLock::new(monitor));
        let probes: Vec<Arc<dyn HealthProbe>> = vec![
            Arc::new(CacheProbe::new(cache.clone())),
            Arc::new(StorageProbe::new(cache.clone())),
            Arc::new(ReporterProbe::new(monitor.clone())),
        ];

        Self {
            cache,
            monitor,
            probes: Arc::new(probes),
            flush_notify,
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }
}

// == Cache Handlers ==

/// Handler for PUT /set
///
/// Stores a JSON value with optional TTL, metadata and tags.
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let (key, value, options) = req.into_parts();
    let mut cache = state.cache.write().await;
    cache.set_with(key.clone(), value, options)?;

    Ok(Json(SetResponse::new(key)))
}

/// Handler for GET /get/:key
///
/// Retrieves a value, falling back to the storage tier on a memory miss.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    let timer = OperationTimer::start();
    // Write lock: reads update access order and counters
    let result = state.cache.write().await.get(&key);
    record_lookup(&state, "get", result.is_ok(), timer).await;

    Ok(Json(GetResponse::new(key, result?)))
}

/// Handler for GET /get/:key/meta
pub async fn get_with_metadata_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetWithMetadataResponse>> {
    let timer = OperationTimer::start();
    let result = state.cache.write().await.get_with_metadata(&key);
    record_lookup(&state, "get_with_metadata", result.is_ok(), timer).await;

    let found = result?;
    Ok(Json(GetWithMetadataResponse {
        key,
        value: found.value,
        metadata: found.metadata,
    }))
}

async fn record_lookup(state: &AppState, operation: &str, hit: bool, timer: OperationTimer) {
    state
        .monitor
        .write()
        .await
        .record_cache_operation(operation, hit, timer.elapsed_ms());
}

/// Handler for DELETE /del/:key
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    let mut cache = state.cache.write().await;
    cache.delete(&key)?;

    Ok(Json(DeleteResponse::new(key)))
}

/// Handler for DELETE /clear
pub async fn clear_handler(State(state): State<AppState>) -> Json<CountResponse> {
    let count = state.cache.write().await.clear();
    Json(CountResponse::new("Cache cleared", count))
}

/// Handler for GET /keys
pub async fn keys_handler(State(state): State<AppState>) -> Json<KeysResponse> {
    let keys = state.cache.read().await.keys();
    Json(KeysResponse::new(keys))
}

/// Handler for GET /entries
pub async fn entries_handler(State(state): State<AppState>) -> Json<EntriesResponse> {
    let entries = state.cache.read().await.entries();
    Json(EntriesResponse::new(entries))
}

/// Handler for POST /invalidate/:tag
pub async fn invalidate_handler(
    State(state): State<AppState>,
    Path(tag): Path<String>,
) -> Json<CountResponse> {
    let count = state.cache.write().await.invalidate_by_tag(&tag);
    Json(CountResponse::new(format!("Invalidated entries tagged '{}'", tag), count))
}

/// Handler for POST /cleanup
///
/// Runs the expired-entry sweep immediately.
pub async fn cleanup_handler(State(state): State<AppState>) -> Json<CountResponse> {
    let count = state.cache.write().await.cleanup_expired();
    Json(CountResponse::new("Expired entries removed", count))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let report = state.cache.read().await.report();
    Json(StatsResponse::new(report))
}

// == Monitoring Handlers ==

/// Handler for GET /health
///
/// Runs every probe. Responds 503 when the system is critical.
pub async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let health = check_all(&state.probes).await;
    let status = match health.status {
        HealthStatus::Critical => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::OK,
    };
    state.monitor.write().await.record_health(health.clone());

    (status, Json(HealthResponse::new(health)))
}

/// Handler for GET /metrics
pub async fn metrics_handler(
    State(state): State<AppState>,
    Query(query): Query<MetricsQuery>,
) -> Json<MetricsResponse> {
    let metrics = state.monitor.read().await.metrics(query.name.as_deref());
    Json(MetricsResponse::new(metrics))
}

/// Handler for GET /alerts
pub async fn alerts_handler(
    State(state): State<AppState>,
    Query(query): Query<AlertsQuery>,
) -> Json<AlertsResponse> {
    let alerts = state.monitor.read().await.alerts(query.resolved);
    Json(AlertsResponse::new(alerts))
}

/// Handler for POST /alerts/:id/resolve
pub async fn resolve_alert_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ResolveAlertResponse>> {
    if !state.monitor.write().await.resolve_alert(&id) {
        return Err(CacheError::AlertNotFound(id));
    }
    Ok(Json(ResolveAlertResponse::new(id)))
}

/// Handler for GET /report
///
/// Aggregates the period given by `from` and `to`, the last hour by default.
pub async fn report_handler(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<PerformanceReport>> {
    let (from, to) = query.period(Utc::now()).map_err(CacheError::InvalidRequest)?;
    let report = state.monitor.read().await.generate_report(from, to);
    Ok(Json(report))
}
