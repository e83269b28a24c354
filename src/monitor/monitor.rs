//! Performance Monitor
//!
//! Collects metrics, raises threshold alerts and queues a sampled subset of
//! metrics for batched reporting.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};
use tokio::sync::{broadcast, Notify};
use tracing::{debug, info, warn};

use crate::monitor::report::{self, PerformanceReport, ReportPeriod};
use crate::monitor::{
    default_thresholds, Alert, AlertLevel, HealthStatus, MetricCategory, PerformanceMetric,
    SystemHealth, Tags, Threshold,
};

/// Metrics kept per name, oldest dropped first.
pub const MAX_METRICS_PER_NAME: usize = 1000;

/// Alerts held at once. Past it, resolved alerts go first, then the oldest.
pub const MAX_ALERTS: usize = 1000;

/// Default age after which stored metrics are discarded.
pub fn default_retention() -> chrono::Duration {
    chrono::Duration::hours(24)
}

const EVENT_CAPACITY: usize = 64;

/// Health score above which stale alerts may be auto-resolved.
const AUTO_RESOLVE_MIN_SCORE: u8 = 80;

fn info_alert_lifetime() -> chrono::Duration {
    chrono::Duration::minutes(5)
}

fn stale_alert_age() -> chrono::Duration {
    chrono::Duration::hours(1)
}

// == Options ==
#[derive(Debug, Clone)]
pub struct MonitorOptions {
    /// Share of non-error metrics queued for reporting, clamped to [0, 1]
    pub sample_rate: f64,
    /// Outbox size limit, oldest metrics dropped beyond it
    pub max_queue: usize,
    pub thresholds: HashMap<String, Threshold>,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        Self {
            sample_rate: 1.0,
            max_queue: 10_000,
            thresholds: default_thresholds(),
        }
    }
}

// == Events ==
#[derive(Debug, Clone)]
pub enum MonitorEvent {
    AlertCreated(Alert),
    AlertResolved(Alert),
    HealthChecked(SystemHealth),
}

// == Sampler ==
/// Systematic sampler: accumulates `rate` per offer and selects an item
/// each time the credit reaches one.
#[derive(Debug, Clone)]
struct Sampler {
    rate: f64,
    credit: f64,
}

impl Sampler {
    fn new(rate: f64) -> Self {
        let rate = if rate.is_finite() { rate.clamp(0.0, 1.0) } else { 1.0 };
        Self { rate, credit: 0.0 }
    }

    fn offer(&mut self) -> bool {
        self.credit += self.rate;
        if self.credit >= 1.0 {
            self.credit -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Wakes the reporting task once the outbox holds a full batch.
#[derive(Debug, Clone)]
struct FlushTrigger {
    notify: Arc<Notify>,
    batch_size: usize,
}

// == Performance Monitor ==
#[derive(Debug)]
pub struct PerformanceMonitor {
    metrics: HashMap<String, VecDeque<PerformanceMetric>>,
    alerts: HashMap<String, Alert>,
    thresholds: HashMap<String, Threshold>,
    sampler: Sampler,
    outbox: VecDeque<PerformanceMetric>,
    max_queue: usize,
    dropped_reports: u64,
    flush_trigger: Option<FlushTrigger>,
    alert_seq: u64,
    events: broadcast::Sender<MonitorEvent>,
    last_health: Option<SystemHealth>,
    started_at: Instant,
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new(MonitorOptions::default())
    }
}

impl PerformanceMonitor {
    pub fn new(options: MonitorOptions) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            metrics: HashMap::new(),
            alerts: HashMap::new(),
            thresholds: options.thresholds,
            sampler: Sampler::new(options.sample_rate),
            outbox: VecDeque::new(),
            max_queue: options.max_queue.max(1),
            dropped_reports: 0,
            flush_trigger: None,
            alert_seq: 0,
            events,
            last_health: None,
            started_at: Instant::now(),
        }
    }

    /// Notifies `notify` whenever the outbox reaches `batch_size` metrics.
    pub fn with_flush_notify(mut self, notify: Arc<Notify>, batch_size: usize) -> Self {
        self.flush_trigger = Some(FlushTrigger {
            notify,
            batch_size: batch_size.max(1),
        });
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.events.subscribe()
    }

    pub fn set_threshold(&mut self, name: impl Into<String>, threshold: Threshold) {
        self.thresholds.insert(name.into(), threshold);
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    // == Recording ==
    /// Stores a metric, checks it against its threshold and offers it for
    /// reporting.
    pub fn record_metric(
        &mut self,
        name: &str,
        value: f64,
        unit: &str,
        category: MetricCategory,
        tags: Tags,
    ) {
        let metric = PerformanceMetric::new(name, value, unit, category).with_tags(tags);
        self.record(metric);
    }

    /// Stores an already-built metric.
    pub fn record(&mut self, metric: PerformanceMetric) {
        let series = self.metrics.entry(metric.name.clone()).or_default();
        series.push_back(metric.clone());
        if series.len() > MAX_METRICS_PER_NAME {
            series.pop_front();
        }

        self.check_threshold(&metric);

        if metric.is_error() || self.sampler.offer() {
            self.enqueue(metric);
        }
    }

    pub fn record_api_response_time(&mut self, endpoint: &str, method: &str, status: u16, ms: f64) {
        let tags = Tags::from([
            ("endpoint".to_string(), endpoint.to_string()),
            ("method".to_string(), method.to_string()),
            ("status_code".to_string(), status.to_string()),
        ]);

        self.record_metric("api_response_time", ms, "ms", MetricCategory::ResponseTime, tags.clone());
        if status >= 400 {
            self.record_metric("api_error", 1.0, "count", MetricCategory::ErrorRate, tags);
        }
    }

    pub fn record_database_query(&mut self, query: &str, ms: f64, error: bool) {
        let query_type = query_type(query);
        let tags = Tags::from([
            ("query_type".to_string(), query_type.to_string()),
            ("error".to_string(), error.to_string()),
        ]);

        self.record_metric("database_query_time", ms, "ms", MetricCategory::ResponseTime, tags);
        if error {
            let tags = Tags::from([("query_type".to_string(), query_type.to_string())]);
            self.record_metric("database_error", 1.0, "count", MetricCategory::ErrorRate, tags);
        }
    }

    pub fn record_cache_operation(&mut self, operation: &str, hit: bool, ms: f64) {
        let tags = Tags::from([
            ("operation".to_string(), operation.to_string()),
            ("hit".to_string(), hit.to_string()),
        ]);
        self.record_metric("cache_response_time", ms, "ms", MetricCategory::ResponseTime, tags);

        let name = if hit { "cache_hit" } else { "cache_miss" };
        let tags = Tags::from([("operation".to_string(), operation.to_string())]);
        self.record_metric(name, 1.0, "count", MetricCategory::Throughput, tags);
    }

    pub fn record_business_metric(&mut self, name: &str, value: f64, unit: &str, context: Tags) {
        self.record_metric(name, value, unit, MetricCategory::BusinessMetric, context);
    }

    fn check_threshold(&mut self, metric: &PerformanceMetric) {
        let Some(threshold) = self.thresholds.get(&metric.name).copied() else {
            return;
        };
        let Some(level) = threshold.level_for(metric.value) else {
            return;
        };

        let (title, description, bound) = match level {
            AlertLevel::Critical => (
                format!("Critical {}", metric.name),
                format!("{} is at critical level: {}{}", metric.name, metric.value, metric.unit),
                threshold.critical,
            ),
            _ => (
                format!("High {}", metric.name),
                format!(
                    "{} is above warning threshold: {}{}",
                    metric.name, metric.value, metric.unit
                ),
                threshold.warning,
            ),
        };

        let mut metadata = Map::new();
        metadata.insert("metric".into(), json!(metric));
        metadata.insert("threshold".into(), json!(bound));
        self.create_alert(level, &title, &description, "performance", metadata);
    }

    // == Outbox ==
    fn enqueue(&mut self, metric: PerformanceMetric) {
        self.outbox.push_back(metric);
        while self.outbox.len() > self.max_queue {
            self.outbox.pop_front();
            self.dropped_reports += 1;
        }

        if let Some(trigger) = &self.flush_trigger {
            if self.outbox.len() >= trigger.batch_size {
                trigger.notify.notify_one();
            }
        }
    }

    /// Takes up to `max` queued metrics, oldest first.
    pub fn drain_outbox(&mut self, max: usize) -> Vec<PerformanceMetric> {
        let count = max.min(self.outbox.len());
        self.outbox.drain(..count).collect()
    }

    /// Puts an unsent batch back at the front of the outbox.
    ///
    /// When the outbox would overflow, the oldest metrics are dropped.
    pub fn requeue(&mut self, batch: Vec<PerformanceMetric>) {
        for metric in batch.into_iter().rev() {
            self.outbox.push_front(metric);
        }
        while self.outbox.len() > self.max_queue {
            self.outbox.pop_front();
            self.dropped_reports += 1;
        }
    }

    pub fn pending_reports(&self) -> usize {
        self.outbox.len()
    }

    /// Metrics discarded because the outbox was full.
    pub fn dropped_reports(&self) -> u64 {
        self.dropped_reports
    }

    pub fn max_queue(&self) -> usize {
        self.max_queue
    }

    // == Alerts ==
    /// Records a new alert and returns its id.
    pub fn create_alert(
        &mut self,
        level: AlertLevel,
        title: &str,
        description: &str,
        category: &str,
        metadata: Map<String, Value>,
    ) -> String {
        self.alert_seq += 1;
        let now = Utc::now();
        let id = format!("alert_{}_{:06}", now.timestamp_millis(), self.alert_seq);

        let alert = Alert {
            id: id.clone(),
            level,
            title: title.to_string(),
            description: description.to_string(),
            category: category.to_string(),
            timestamp: now,
            resolved: false,
            resolved_at: None,
            metadata,
        };

        match level {
            AlertLevel::Info => info!(alert_id = %id, title, "alert created"),
            _ => warn!(alert_id = %id, %level, title, "alert created"),
        }
        let _ = self.events.send(MonitorEvent::AlertCreated(alert.clone()));
        self.alerts.insert(id.clone(), alert);
        self.trim_alerts();
        id
    }

    /// Shrinks the alert map to 90% of [`MAX_ALERTS`] once it overflows.
    fn trim_alerts(&mut self) {
        if self.alerts.len() <= MAX_ALERTS {
            return;
        }
        let target = MAX_ALERTS - MAX_ALERTS / 10;
        let excess = self.alerts.len() - target;

        // Resolved before unresolved, then oldest first
        let mut order: Vec<(bool, DateTime<Utc>, String)> = self
            .alerts
            .values()
            .map(|a| (!a.resolved, a.timestamp, a.id.clone()))
            .collect();
        order.sort();

        for (_, _, id) in order.into_iter().take(excess) {
            self.alerts.remove(&id);
        }
        warn!(dropped = excess, limit = MAX_ALERTS, "alert limit reached, dropped oldest alerts");
    }

    /// Marks an alert resolved. False when unknown or already resolved.
    pub fn resolve_alert(&mut self, id: &str) -> bool {
        let Some(alert) = self.alerts.get_mut(id) else {
            return false;
        };
        if alert.resolved {
            return false;
        }

        alert.resolve(Utc::now());
        info!(alert_id = %id, "alert resolved");
        let _ = self.events.send(MonitorEvent::AlertResolved(alert.clone()));
        true
    }

    /// Alerts oldest first, optionally filtered by resolution state.
    pub fn alerts(&self, resolved: Option<bool>) -> Vec<Alert> {
        let mut alerts: Vec<Alert> = self
            .alerts
            .values()
            .filter(|a| resolved.map_or(true, |r| a.resolved == r))
            .cloned()
            .collect();
        alerts.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));
        alerts
    }

    pub fn alert(&self, id: &str) -> Option<&Alert> {
        self.alerts.get(id)
    }

    /// Auto-resolves alerts that have outlived their relevance.
    ///
    /// Info alerts resolve after five minutes. Other alerts resolve after an
    /// hour, but only while the system is not critical and scores above 80.
    /// Returns the number of alerts resolved.
    pub fn evaluate_alerts(&mut self, health: &SystemHealth) -> usize {
        self.evaluate_alerts_at(health, Utc::now())
    }

    pub(crate) fn evaluate_alerts_at(&mut self, health: &SystemHealth, now: DateTime<Utc>) -> usize {
        let recovered =
            health.status != HealthStatus::Critical && health.score > AUTO_RESOLVE_MIN_SCORE;

        let due: Vec<String> = self
            .alerts
            .values()
            .filter(|a| !a.resolved)
            .filter(|a| match a.level {
                AlertLevel::Info => a.age_at(now) >= info_alert_lifetime(),
                _ => recovered && a.age_at(now) > stale_alert_age(),
            })
            .map(|a| a.id.clone())
            .collect();

        due.iter().filter(|id| self.resolve_alert(id)).count()
    }

    // == Health ==
    /// Stores the latest health check and broadcasts it.
    pub fn record_health(&mut self, health: SystemHealth) {
        debug!(status = ?health.status, score = health.score, "health checked");
        let _ = self.events.send(MonitorEvent::HealthChecked(health.clone()));
        self.last_health = Some(health);
    }

    pub fn last_health(&self) -> Option<&SystemHealth> {
        self.last_health.as_ref()
    }

    // == Queries ==
    /// Metrics for one name in recording order, or all metrics newest first.
    pub fn metrics(&self, name: Option<&str>) -> Vec<PerformanceMetric> {
        match name {
            Some(name) => self
                .metrics
                .get(name)
                .map(|series| series.iter().cloned().collect())
                .unwrap_or_default(),
            None => {
                let mut all: Vec<PerformanceMetric> =
                    self.metrics.values().flatten().cloned().collect();
                all.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
                all
            }
        }
    }

    /// Total number of stored metrics.
    pub fn metric_count(&self) -> usize {
        self.metrics.values().map(VecDeque::len).sum()
    }

    /// Drops metrics older than `retention`. Returns the number removed.
    pub fn cleanup_old_metrics(&mut self, retention: chrono::Duration) -> usize {
        let cutoff = Utc::now() - retention;
        let mut removed = 0;

        for series in self.metrics.values_mut() {
            let before = series.len();
            series.retain(|m| m.timestamp >= cutoff);
            removed += before - series.len();
        }
        self.metrics.retain(|_, series| !series.is_empty());

        if removed > 0 {
            debug!(removed, "discarded old metrics");
        }
        removed
    }

    /// Forgets resolved alerts that were resolved longer ago than `retention`.
    pub fn cleanup_old_alerts(&mut self, retention: chrono::Duration) -> usize {
        let cutoff = Utc::now() - retention;
        let before = self.alerts.len();
        self.alerts
            .retain(|_, a| !a.resolved || a.resolved_at.map_or(true, |at| at >= cutoff));

        let removed = before - self.alerts.len();
        if removed > 0 {
            debug!(removed, "discarded old alerts");
        }
        removed
    }

    /// Aggregates metrics and alerts timestamped within `[from, to]`.
    pub fn generate_report(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> PerformanceReport {
        let in_range: Vec<&PerformanceMetric> = self
            .metrics
            .values()
            .flatten()
            .filter(|m| m.timestamp >= from && m.timestamp <= to)
            .collect();

        let alerts = self
            .alerts(None)
            .into_iter()
            .filter(|a| a.timestamp >= from && a.timestamp <= to)
            .collect();

        PerformanceReport {
            period: ReportPeriod { from, to },
            summary: report::summarize(&in_range, self.uptime_seconds()),
            trends: report::trends(&in_range),
            top_endpoints: report::top_endpoints(&in_range),
            alerts,
        }
    }
}

/// Statement kind from the leading keyword.
fn query_type(query: &str) -> &'static str {
    let keyword = query
        .trim_start()
        .split_whitespace()
        .next()
        .unwrap_or("")
        .to_ascii_lowercase();
    match keyword.as_str() {
        "select" => "SELECT",
        "insert" => "INSERT",
        "update" => "UPDATE",
        "delete" => "DELETE",
        _ => "OTHER",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::ComponentHealth;

    fn monitor_with_rate(sample_rate: f64) -> PerformanceMonitor {
        PerformanceMonitor::new(MonitorOptions {
            sample_rate,
            ..MonitorOptions::default()
        })
    }

    fn health(status: HealthStatus) -> SystemHealth {
        SystemHealth::from_components(vec![ComponentHealth::new("cache", status, 1.0)])
    }

    #[test]
    fn test_metrics_bounded_per_name() {
        let mut monitor = monitor_with_rate(0.0);
        for i in 0..(MAX_METRICS_PER_NAME + 5) {
            monitor.record_metric("latency", i as f64, "ms", MetricCategory::ResponseTime, Tags::new());
        }

        let series = monitor.metrics(Some("latency"));
        assert_eq!(series.len(), MAX_METRICS_PER_NAME);
        assert_eq!(series[0].value, 5.0);
        assert!(monitor.metrics(Some("unknown")).is_empty());
    }

    #[test]
    fn test_threshold_alerts() {
        let mut monitor = PerformanceMonitor::default();

        monitor.record_cache_operation("get", true, 10.0);
        assert!(monitor.alerts(None).is_empty());

        monitor.record_cache_operation("get", true, 75.0);
        monitor.record_api_response_time("/get/:key", "GET", 200, 3500.0);

        let alerts = monitor.alerts(Some(false));
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].level, AlertLevel::Warning);
        assert_eq!(alerts[0].title, "High cache_response_time");
        assert_eq!(alerts[1].level, AlertLevel::Critical);
        assert_eq!(alerts[1].metadata["threshold"], json!(3000.0));
    }

    #[test]
    fn test_api_error_recorded_for_failed_requests() {
        let mut monitor = PerformanceMonitor::default();
        monitor.record_api_response_time("/get/:key", "GET", 404, 3.0);
        monitor.record_api_response_time("/set", "PUT", 200, 4.0);

        let errors = monitor.metrics(Some("api_error"));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].tag("status_code"), Some("404"));
        assert_eq!(monitor.metrics(Some("api_response_time")).len(), 2);
    }

    #[test]
    fn test_database_query_types() {
        assert_eq!(query_type("  SELECT * FROM t"), "SELECT");
        assert_eq!(query_type("insert into t values (1)"), "INSERT");
        assert_eq!(query_type("Update t set x = 1"), "UPDATE");
        assert_eq!(query_type("delete from t"), "DELETE");
        assert_eq!(query_type("VACUUM"), "OTHER");
        assert_eq!(query_type(""), "OTHER");

        let mut monitor = PerformanceMonitor::default();
        monitor.record_database_query("select 1", 12.0, true);
        assert_eq!(monitor.metrics(Some("database_error")).len(), 1);
        assert_eq!(
            monitor.metrics(Some("database_query_time"))[0].tag("error"),
            Some("true")
        );
    }

    #[test]
    fn test_systematic_sampling() {
        let mut monitor = monitor_with_rate(0.25);
        for _ in 0..100 {
            monitor.record_business_metric("listing_views", 1.0, "count", Tags::new());
        }

        assert_eq!(monitor.pending_reports(), 25);
        // Local storage keeps every metric regardless of sampling
        assert_eq!(monitor.metrics(Some("listing_views")).len(), 100);
    }

    #[test]
    fn test_errors_bypass_sampling() {
        let mut monitor = monitor_with_rate(0.0);
        monitor.record_api_response_time("/get/:key", "GET", 500, 1.0);
        monitor.record_api_response_time("/get/:key", "GET", 200, 1.0);

        let queued = monitor.drain_outbox(10);
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].name, "api_error");
    }

    #[test]
    fn test_outbox_drain_requeue_and_overflow() {
        let mut monitor = PerformanceMonitor::new(MonitorOptions {
            max_queue: 5,
            ..MonitorOptions::default()
        });
        for i in 0..7 {
            monitor.record_business_metric("m", i as f64, "count", Tags::new());
        }
        assert_eq!(monitor.pending_reports(), 5);
        assert_eq!(monitor.dropped_reports(), 2);

        let batch = monitor.drain_outbox(3);
        assert_eq!(batch.iter().map(|m| m.value).collect::<Vec<_>>(), vec![2.0, 3.0, 4.0]);

        monitor.requeue(batch);
        let again = monitor.drain_outbox(10);
        assert_eq!(again.len(), 5);
        assert_eq!(again[0].value, 2.0);
    }

    #[test]
    fn test_flush_notify_at_batch_size() {
        let notify = Arc::new(Notify::new());
        let mut monitor = PerformanceMonitor::default().with_flush_notify(notify.clone(), 2);

        monitor.record_business_metric("m", 1.0, "count", Tags::new());
        monitor.record_business_metric("m", 2.0, "count", Tags::new());

        // A stored permit completes the wait immediately
        let rt = tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap();
        let woke = rt.block_on(async {
            tokio::time::timeout(std::time::Duration::from_millis(50), notify.notified())
                .await
                .is_ok()
        });
        assert!(woke);
    }

    #[test]
    fn test_resolve_alert() {
        let mut monitor = PerformanceMonitor::default();
        let id = monitor.create_alert(AlertLevel::Error, "Disk", "disk failing", "storage", Map::new());

        assert!(monitor.resolve_alert(&id));
        assert!(!monitor.resolve_alert(&id));
        assert!(!monitor.resolve_alert("alert_missing"));

        let alert = monitor.alert(&id).unwrap();
        assert!(alert.resolved);
        assert!(alert.resolved_at.is_some());
        assert_eq!(monitor.alerts(Some(true)).len(), 1);
        assert!(monitor.alerts(Some(false)).is_empty());
    }

    #[test]
    fn test_alert_ids_are_unique() {
        let mut monitor = PerformanceMonitor::default();
        let a = monitor.create_alert(AlertLevel::Info, "a", "", "test", Map::new());
        let b = monitor.create_alert(AlertLevel::Info, "b", "", "test", Map::new());
        assert_ne!(a, b);
        assert!(a.starts_with("alert_"));
    }

    #[test]
    fn test_evaluate_alerts_auto_resolution() {
        let mut monitor = PerformanceMonitor::default();
        let info = monitor.create_alert(AlertLevel::Info, "note", "", "test", Map::new());
        let warning = monitor.create_alert(AlertLevel::Warning, "slow", "", "test", Map::new());
        let healthy = health(HealthStatus::Healthy);

        let now = Utc::now();
        assert_eq!(monitor.evaluate_alerts_at(&healthy, now), 0);

        // Info alerts expire after five minutes
        let later = now + chrono::Duration::minutes(6);
        assert_eq!(monitor.evaluate_alerts_at(&healthy, later), 1);
        assert!(monitor.alert(&info).unwrap().resolved);
        assert!(!monitor.alert(&warning).unwrap().resolved);

        // Older alerts stay open while the system is critical
        let much_later = now + chrono::Duration::minutes(61);
        let critical = health(HealthStatus::Critical);
        assert_eq!(monitor.evaluate_alerts_at(&critical, much_later), 0);
        assert_eq!(monitor.evaluate_alerts_at(&healthy, much_later), 1);
        assert!(monitor.alert(&warning).unwrap().resolved);
    }

    #[test]
    fn test_cleanup_old_metrics() {
        let mut monitor = PerformanceMonitor::default();
        monitor.record_metric("fresh", 1.0, "ms", MetricCategory::ResponseTime, Tags::new());

        let mut stale = PerformanceMetric::new("stale", 1.0, "ms", MetricCategory::ResponseTime);
        stale.timestamp = Utc::now() - chrono::Duration::hours(25);
        monitor.record(stale);

        assert_eq!(monitor.cleanup_old_metrics(default_retention()), 1);
        assert_eq!(monitor.metric_count(), 1);
        assert!(monitor.metrics(Some("stale")).is_empty());
    }

    #[test]
    fn test_cleanup_old_alerts_keeps_open_and_recent() {
        let mut monitor = PerformanceMonitor::default();
        let open = monitor.create_alert(AlertLevel::Warning, "open", "", "performance", Map::new());
        let recent = monitor.create_alert(AlertLevel::Warning, "recent", "", "performance", Map::new());
        let stale = monitor.create_alert(AlertLevel::Warning, "stale", "", "performance", Map::new());

        monitor.resolve_alert(&recent);
        monitor.resolve_alert(&stale);
        if let Some(alert) = monitor.alerts.get_mut(&stale) {
            alert.resolved_at = Some(Utc::now() - chrono::Duration::hours(25));
        }

        assert_eq!(monitor.cleanup_old_alerts(default_retention()), 1);
        assert!(monitor.alert(&open).is_some());
        assert!(monitor.alert(&recent).is_some());
        assert!(monitor.alert(&stale).is_none());
    }

    #[test]
    fn test_alert_count_is_bounded() {
        let mut monitor = PerformanceMonitor::default();
        let first = monitor.create_alert(AlertLevel::Info, "first", "", "performance", Map::new());
        let resolved = monitor.create_alert(AlertLevel::Info, "resolved", "", "performance", Map::new());
        monitor.resolve_alert(&resolved);

        for _ in 0..20_000 {
            monitor.record_api_response_time("/get/:key", "GET", 200, 1500.0);
        }

        let held = monitor.alerts(None).len();
        assert!(held <= MAX_ALERTS);
        assert!(held >= MAX_ALERTS - MAX_ALERTS / 10);
        // Resolved alerts are dropped before any open one
        assert!(monitor.alert(&resolved).is_none());
        assert!(monitor.alert(&first).is_none());

        let newest = monitor.alerts(Some(false));
        assert_eq!(newest.last().map(|a| a.title.as_str()), Some("High api_response_time"));
    }

    #[test]
    fn test_all_metrics_newest_first() {
        let mut monitor = PerformanceMonitor::default();
        let mut old = PerformanceMetric::new("a", 1.0, "ms", MetricCategory::ResponseTime);
        old.timestamp = Utc::now() - chrono::Duration::minutes(5);
        monitor.record(old);
        monitor.record_metric("b", 2.0, "ms", MetricCategory::ResponseTime, Tags::new());

        let all = monitor.metrics(None);
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].name, "b");
    }

    #[test]
    fn test_generate_report_filters_by_period() {
        let mut monitor = PerformanceMonitor::default();
        monitor.record_api_response_time("/get/:key", "GET", 200, 10.0);
        monitor.record_api_response_time("/get/:key", "GET", 500, 30.0);

        let mut outside = PerformanceMetric::new("api_response_time", 999.0, "ms", MetricCategory::ResponseTime);
        outside.timestamp = Utc::now() - chrono::Duration::hours(3);
        monitor.record(outside);

        let now = Utc::now();
        let report = monitor.generate_report(now - chrono::Duration::hours(1), now);

        assert_eq!(report.summary.total_requests, 2);
        assert_eq!(report.summary.average_response_time, 20.0);
        assert_eq!(report.summary.error_rate, 50.0);
        assert_eq!(report.top_endpoints.len(), 1);
        assert_eq!(report.top_endpoints[0].endpoint, "/get/:key");
    }

    #[tokio::test]
    async fn test_events_broadcast() {
        let mut monitor = PerformanceMonitor::default();
        let mut events = monitor.subscribe();

        let id = monitor.create_alert(AlertLevel::Warning, "slow", "", "test", Map::new());
        monitor.resolve_alert(&id);
        monitor.record_health(health(HealthStatus::Healthy));

        assert!(matches!(events.recv().await.unwrap(), MonitorEvent::AlertCreated(a) if a.id == id));
        assert!(matches!(events.recv().await.unwrap(), MonitorEvent::AlertResolved(a) if a.resolved));
        assert!(matches!(events.recv().await.unwrap(), MonitorEvent::HealthChecked(h) if h.score == 100));
        assert!(monitor.last_health().is_some());
    }
}
