//! Storage record encoding.
//!
//! Entries are written to storage tiers as JSON. Records larger than the
//! compression threshold are zstd-compressed; decoding recognises the zstd
//! magic bytes, so compressed and plain records can sit side by side.

use crate::cache::{CacheEntry, MAX_VALUE_SIZE};
use crate::error::{CacheError, Result};

/// Zstd frame magic (little-endian 0xFD2FB528)
const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];

const COMPRESSION_LEVEL: i32 = 3;

/// Largest JSON record a compressed frame may expand to: the value plus
/// room for metadata, tags and bookkeeping fields.
pub const MAX_DECODED_LEN: usize = 4 * MAX_VALUE_SIZE;

#[inline]
pub fn is_compressed(data: &[u8]) -> bool {
    data.len() >= 4 && data[..4] == ZSTD_MAGIC
}

/// Encodes an entry, compressing when the JSON form exceeds `threshold`.
///
/// A threshold of 0 disables compression. Records too large to be
/// decompressed again are stored plain.
pub fn encode(entry: &CacheEntry, threshold: usize) -> Result<Vec<u8>> {
    let json = serde_json::to_vec(entry)?;
    if threshold == 0 || json.len() <= threshold || json.len() > MAX_DECODED_LEN {
        return Ok(json);
    }
    zstd::encode_all(json.as_slice(), COMPRESSION_LEVEL)
        .map_err(|e| CacheError::Internal(format!("compression failed: {}", e)))
}

pub fn decode(data: &[u8]) -> Result<CacheEntry> {
    if is_compressed(data) {
        let json = zstd::bulk::decompress(data, MAX_DECODED_LEN)
            .map_err(|e| CacheError::Internal(format!("decompression failed: {}", e)))?;
        Ok(serde_json::from_slice(&json)?)
    } else {
        Ok(serde_json::from_slice(data)?)
    }
}
