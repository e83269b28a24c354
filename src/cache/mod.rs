//! Cache Module
//!
//! Provides in-memory caching with TTL expiration, LRU/LFU/FIFO eviction
//! and an optional storage tier.

mod codec;
mod entry;
mod eviction;
mod loader;
mod options;
mod stats;
mod store;


use std::sync::Arc;

use tokio::sync::RwLock;

// Re-export public types
pub use codec::{decode, encode, is_compressed};
pub use entry::{current_timestamp_ms, CacheEntry, Metadata};
pub use eviction::EvictionPolicy;
pub use loader::get_or_set;
pub use options::{CacheOptions, EntryOptions, ValueWithMetadata};
pub use stats::{CacheReport, CacheStats};
pub use store::DataCache;

/// Cache handle shared between handlers and background tasks.
pub type SharedCache = Arc<RwLock<DataCache>>;

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;

/// Maximum allowed serialized value size in bytes
pub const MAX_VALUE_SIZE: usize = 1024 * 1024; // 1 MB
