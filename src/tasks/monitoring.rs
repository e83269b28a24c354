//! Health Monitoring Task
//!
//! Periodically runs the health probes, auto-resolves stale alerts, applies
//! metric retention and records process uptime.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::monitor::{
    check_all, default_retention, HealthProbe, HealthStatus, MetricCategory, SharedMonitor, Tags,
};

pub fn spawn_monitoring_task(
    monitor: SharedMonitor,
    probes: Vec<Arc<dyn HealthProbe>>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            probes = probes.len(),
            interval_ms = interval.as_millis() as u64,
            "starting health monitoring task"
        );

        loop {
            tokio::time::sleep(interval).await;
            run_monitoring_cycle(&monitor, &probes).await;
        }
    })
}

/// One health check and housekeeping pass.
pub async fn run_monitoring_cycle(monitor: &SharedMonitor, probes: &[Arc<dyn HealthProbe>]) {
    // Probes may lock the monitor themselves, so run them before locking it
    let health = check_all(probes).await;

    if health.status == HealthStatus::Critical {
        let failing: Vec<&str> = health
            .components
            .iter()
            .filter(|c| c.status == HealthStatus::Critical)
            .map(|c| c.name.as_str())
            .collect();
        warn!(score = health.score, components = ?failing, "system health critical");
    }

    let mut guard = monitor.write().await;
    let uptime = guard.uptime_seconds() as f64;
    guard.record_metric("process_uptime", uptime, "s", MetricCategory::ResourceUsage, Tags::new());
    guard.record_metric(
        "health_score",
        health.score as f64,
        "score",
        MetricCategory::ResourceUsage,
        Tags::new(),
    );

    let resolved = guard.evaluate_alerts(&health);
    let removed = guard.cleanup_old_metrics(default_retention());
    let forgotten = guard.cleanup_old_alerts(default_retention());
    guard.record_health(health);

    if resolved > 0 || removed > 0 || forgotten > 0 {
        info!(resolved, removed, forgotten, "monitoring housekeeping");
    }
}
