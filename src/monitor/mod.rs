//! Monitor Module
//!
//! Performance metrics, threshold alerts, component health and batched
//! metric reporting.

mod alert;
mod health;
mod metric;
#[allow(clippy::module_inception)]
mod monitor;
mod report;
mod reporter;
mod timer;

use std::sync::Arc;

use tokio::sync::RwLock;

pub use alert::{default_thresholds, Alert, AlertLevel, Threshold};
pub use health::{
    check_all, CacheProbe, ComponentHealth, HealthProbe, HealthStatus, ReporterProbe,
    StorageProbe, SystemHealth,
};
pub use metric::{MetricCategory, PerformanceMetric, Tags};
pub use monitor::{
    default_retention, MonitorEvent, MonitorOptions, PerformanceMonitor, MAX_ALERTS,
    MAX_METRICS_PER_NAME,
};
pub use report::{EndpointSummary, PerformanceReport, ReportSummary, ReportTrends, TrendPoint};
pub use reporter::{FlushSummary, HttpSink, LogSink, MetricsReporter, ReportError, ReportSink};
pub use timer::OperationTimer;

/// Monitor handle shared between handlers, middleware and background tasks.
pub type SharedMonitor = Arc<RwLock<PerformanceMonitor>>;
