//! datacache - A tiered TTL cache with performance monitoring
//!
//! Provides a key/value cache with TTL expiration, LRU/LFU/FIFO eviction and
//! storage-tier fallback, plus sampled metrics, threshold alerts and batched
//! reporting, served over HTTP.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod monitor;
pub mod storage;
pub mod tasks;

pub use api::{create_router, AppState};
pub use cache::{DataCache, SharedCache};
pub use config::Config;
pub use error::{CacheError, Result};
pub use monitor::{PerformanceMonitor, SharedMonitor};
pub use tasks::{spawn_cleanup_task, spawn_monitoring_task, spawn_reporting_task};
