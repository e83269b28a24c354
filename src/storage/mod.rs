//! Storage Module
//!
//! Secondary storage tiers the cache can mirror entries into and fall back
//! to on a memory miss.

mod file;
mod memory;
mod multi_level;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use multi_level::MultiLevelStorage;

/// Default prefix applied to stored record names.
pub const DEFAULT_PREFIX: &str = "dataCache_";

// == Storage Error ==
/// Errors raised by storage adapters.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Underlying filesystem failure
    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),

    /// The tier has no room left for the record
    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    /// The tier cannot be used in this environment
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Convenience Result type for storage adapters.
pub type StorageResult<T> = std::result::Result<T, StorageError>;

// == Storage Adapter ==
/// A byte-valued key/value tier.
///
/// Reads take `&mut self` because layered adapters promote records between
/// tiers on read.
pub trait StorageAdapter: Send + Sync + fmt::Debug {
    /// Short identifier used in logs and health reports.
    fn name(&self) -> &'static str;

    fn get_item(&mut self, key: &str) -> StorageResult<Option<Vec<u8>>>;

    fn set_item(&mut self, key: &str, value: &[u8]) -> StorageResult<()>;

    fn remove_item(&mut self, key: &str) -> StorageResult<()>;

    /// Removes every record owned by this adapter.
    fn clear(&mut self) -> StorageResult<()>;

    /// Lists the keys of every record owned by this adapter.
    fn keys(&self) -> StorageResult<Vec<String>>;
}

// == Persistence Policy ==
/// Which storage tier backs a cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistencePolicy {
    /// Memory only, nothing mirrored
    #[default]
    None,
    /// In-process secondary tier, lost on restart
    Session,
    /// File tier under the storage directory
    Permanent,
    /// Memory primary in front of a file secondary
    MultiLevel,
}

impl PersistencePolicy {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, PersistencePolicy::None)
    }
}

impl FromStr for PersistencePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "session" => Ok(Self::Session),
            "permanent" => Ok(Self::Permanent),
            "multi_level" | "multilevel" => Ok(Self::MultiLevel),
            other => Err(format!("unknown persistence policy '{}'", other)),
        }
    }
}

impl fmt::Display for PersistencePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PersistencePolicy::None => "none",
            PersistencePolicy::Session => "session",
            PersistencePolicy::Permanent => "permanent",
            PersistencePolicy::MultiLevel => "multi_level",
        };
        f.write_str(name)
    }
}

// == Adapter Factory ==
/// Builds the storage tier for a persistence policy.
///
/// Returns `Ok(None)` for [`PersistencePolicy::None`].
pub fn build_adapter(
    policy: PersistencePolicy,
    dir: &Path,
    prefix: &str,
    quota_bytes: Option<u64>,
) -> StorageResult<Option<Box<dyn StorageAdapter>>> {
    let adapter: Box<dyn StorageAdapter> = match policy {
        PersistencePolicy::None => return Ok(None),
        PersistencePolicy::Session => Box::new(MemoryStorage::new()),
        PersistencePolicy::Permanent => {
            Box::new(FileStorage::open(dir, prefix)?.with_quota(quota_bytes))
        }
        PersistencePolicy::MultiLevel => Box::new(MultiLevelStorage::new(
            Box::new(MemoryStorage::new()),
            Box::new(FileStorage::open(dir, prefix)?.with_quota(quota_bytes)),
        )),
    };
    Ok(Some(adapter))
}
