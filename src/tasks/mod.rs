//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - TTL Cleanup: Removes expired cache entries at configured intervals
//! - Reporting: Flushes sampled metrics to the configured sink
//! - Monitoring: Health checks, alert auto-resolution and metric retention

mod cleanup;
mod monitoring;
mod reporting;

pub use cleanup::spawn_cleanup_task;
pub use monitoring::{run_monitoring_cycle, spawn_monitoring_task};
pub use reporting::spawn_reporting_task;
