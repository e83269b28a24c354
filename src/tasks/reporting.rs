//! Metrics Reporting Task
//!
//! Flushes the monitor's report outbox on a timer, or early when the monitor
//! signals that a full batch is waiting.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::monitor::{MetricsReporter, SharedMonitor};

/// Spawns the reporting loop.
///
/// `notify` should be the handle passed to
/// [`PerformanceMonitor::with_flush_notify`](crate::monitor::PerformanceMonitor::with_flush_notify).
pub fn spawn_reporting_task(
    monitor: SharedMonitor,
    reporter: MetricsReporter,
    interval: Duration,
    notify: Arc<Notify>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            sink = reporter.sink_name(),
            batch_size = reporter.batch_size(),
            interval_ms = interval.as_millis() as u64,
            "starting metrics reporting task"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = notify.notified() => debug!("report batch ready, flushing early"),
            }

            let summary = reporter.flush(&monitor).await;
            if summary.requeued > 0 {
                debug!(requeued = summary.requeued, "report flush incomplete");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::{
        MonitorOptions, PerformanceMetric, PerformanceMonitor, ReportError, ReportSink, Tags,
    };
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::RwLock;

    #[derive(Default)]
    struct CountingSink {
        sent: AtomicUsize,
    }

    #[async_trait]
    impl ReportSink for CountingSink {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn send(&self, batch: &[PerformanceMetric]) -> Result<(), ReportError> {
            self.sent.fetch_add(batch.len(), Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_full_batch_flushes_before_interval() {
        let notify = Arc::new(Notify::new());
        let monitor: SharedMonitor = Arc::new(RwLock::new(
            PerformanceMonitor::new(MonitorOptions::default()).with_flush_notify(notify.clone(), 3),
        ));
        let sink = Arc::new(CountingSink::default());
        let reporter = MetricsReporter::new(sink.clone(), 3);

        let handle = spawn_reporting_task(monitor.clone(), reporter, Duration::from_secs(3600), notify);

        {
            let mut guard = monitor.write().await;
            for i in 0..3 {
                guard.record_business_metric("saved_searches", i as f64, "count", Tags::new());
            }
        }

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(sink.sent.load(Ordering::SeqCst), 3);
        assert_eq!(monitor.read().await.pending_reports(), 0);

        handle.abort();
    }

    #[tokio::test]
    async fn test_interval_flushes_partial_batch() {
        let notify = Arc::new(Notify::new());
        let monitor: SharedMonitor = Arc::new(RwLock::new(PerformanceMonitor::default()));
        monitor
            .write()
            .await
            .record_business_metric("enquiries", 1.0, "count", Tags::new());

        let sink = Arc::new(CountingSink::default());
        let reporter = MetricsReporter::new(sink.clone(), 100);
        let handle = spawn_reporting_task(monitor, reporter, Duration::from_millis(50), notify);

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(sink.sent.load(Ordering::SeqCst), 1);

        handle.abort();
    }
}
