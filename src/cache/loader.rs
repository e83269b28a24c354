//! Read-through loading against a shared cache.

use std::future::Future;

use serde_json::Value;
use tracing::debug;

use crate::cache::{EntryOptions, SharedCache};
use crate::error::CacheError;

/// Returns the cached value for `key`, or runs `fetch` and caches its result.
///
/// The cache lock is released while `fetch` runs, so a slow loader never
/// blocks other readers. A failed fetch is returned as-is and nothing is
/// cached.
pub async fn get_or_set<F, Fut, E>(
    cache: &SharedCache,
    key: &str,
    options: EntryOptions,
    fetch: F,
) -> Result<Value, E>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Value, E>>,
    E: From<CacheError>,
{
    {
        let mut guard = cache.write().await;
        match guard.get(key) {
            Ok(value) => return Ok(value),
            Err(CacheError::NotFound(_)) | Err(CacheError::Expired(_)) => {}
            Err(e) => return Err(e.into()),
        }
    }

    debug!(key, "cache miss, loading value");
    let value = fetch().await?;

    cache
        .write()
        .await
        .set_with(key.to_string(), value.clone(), options)?;
    Ok(value)
}
