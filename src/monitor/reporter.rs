//! Batched metric reporting.
//!
//! [`MetricsReporter`] drains the monitor's outbox in fixed-size batches and
//! hands each batch to a [`ReportSink`]. A batch the sink rejects goes back
//! to the front of the outbox for the next flush.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::monitor::{PerformanceMetric, SharedMonitor};

// == Report Error ==
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Endpoint rejected batch with status {0}")]
    Status(u16),

    #[error("Sink unavailable: {0}")]
    Unavailable(String),
}

// == Sink Trait ==
#[async_trait]
pub trait ReportSink: Send + Sync {
    fn name(&self) -> &'static str;

    async fn send(&self, batch: &[PerformanceMetric]) -> Result<(), ReportError>;
}

/// Writes batches to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

#[async_trait]
impl ReportSink for LogSink {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn send(&self, batch: &[PerformanceMetric]) -> Result<(), ReportError> {
        info!(count = batch.len(), "metrics batch");
        for metric in batch {
            debug!(
                name = %metric.name,
                value = metric.value,
                unit = %metric.unit,
                category = %metric.category,
                "metric"
            );
        }
        Ok(())
    }
}

/// POSTs batches as JSON to a collector endpoint.
#[derive(Debug, Clone)]
pub struct HttpSink {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpSink {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, ReportError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ReportSink for HttpSink {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn send(&self, batch: &[PerformanceMetric]) -> Result<(), ReportError> {
        let body = json!({
            "metrics": batch,
            "sent_at": Utc::now().to_rfc3339(),
        });

        let response = self.client.post(&self.endpoint).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ReportError::Status(status.as_u16()));
        }
        Ok(())
    }
}

// == Reporter ==
/// Outcome of one flush.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushSummary {
    pub sent: usize,
    pub batches: usize,
    /// Metrics put back after a failed send
    pub requeued: usize,
}

#[derive(Clone)]
pub struct MetricsReporter {
    sink: Arc<dyn ReportSink>,
    batch_size: usize,
}

impl MetricsReporter {
    pub fn new(sink: Arc<dyn ReportSink>, batch_size: usize) -> Self {
        Self {
            sink,
            batch_size: batch_size.max(1),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn sink_name(&self) -> &'static str {
        self.sink.name()
    }

    /// Sends queued metrics until the outbox is empty or a send fails.
    ///
    /// The monitor lock is only held while draining or requeueing.
    pub async fn flush(&self, monitor: &SharedMonitor) -> FlushSummary {
        let mut summary = FlushSummary::default();

        loop {
            let batch = monitor.write().await.drain_outbox(self.batch_size);
            if batch.is_empty() {
                break;
            }

            match self.sink.send(&batch).await {
                Ok(()) => {
                    summary.sent += batch.len();
                    summary.batches += 1;
                }
                Err(e) => {
                    warn!(sink = self.sink.name(), error = %e, count = batch.len(), "failed to report metrics");
                    summary.requeued = batch.len();
                    monitor.write().await.requeue(batch);
                    break;
                }
            }
        }

        if summary.sent > 0 {
            debug!(sent = summary.sent, batches = summary.batches, "metrics flushed");
        }
        summary
    }
}
