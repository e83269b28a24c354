//! File-backed storage tier.
//!
//! Each record lives in its own file. Short keys are named `prefix + hex(key)`;
//! keys whose hex form would overflow the file name limit are named
//! `prefix + "~" + hex(sha256(key))`. Every file starts with its key
//! (u16 big-endian length, then the bytes) so hashed names can be mapped back
//! and a digest collision is detected on read.
//!
//! Writes go to a temporary sibling first and are renamed into place, so a
//! crash never leaves a half-written record behind.

use std::fs::{self, File};
use std::io::{self, ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use super::{StorageAdapter, StorageError, StorageResult};

/// Minimum number of records dropped when the quota is hit.
const MIN_FREED_RECORDS: usize = 5;

/// Share of records dropped when the quota is hit.
const FREED_RECORD_RATIO: f64 = 0.2;

const TMP_SUFFIX: &str = ".tmp";

/// Longest file name common filesystems accept, in bytes.
const MAX_FILE_NAME: usize = 255;

const HASHED_MARKER: &str = "~";

const KEY_HEADER_LEN: usize = 2;

/// Directory of one-file-per-record entries sharing a name prefix.
#[derive(Debug)]
pub struct FileStorage {
    dir: PathBuf,
    prefix: String,
    quota_bytes: Option<u64>,
}

#[derive(Debug)]
struct RecordFile {
    path: PathBuf,
    modified: SystemTime,
    size: u64,
}

impl FileStorage {
    /// Opens (creating if needed) a storage directory.
    pub fn open(dir: impl AsRef<Path>, prefix: impl Into<String>) -> StorageResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            prefix: prefix.into(),
            quota_bytes: None,
        })
    }

    /// Caps the total bytes held by this tier.
    pub fn with_quota(mut self, quota_bytes: Option<u64>) -> Self {
        self.quota_bytes = quota_bytes.filter(|q| *q > 0);
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_name(&self, key: &str) -> String {
        let encoded = hex::encode(key.as_bytes());
        if self.prefix.len() + encoded.len() + TMP_SUFFIX.len() <= MAX_FILE_NAME {
            format!("{}{}", self.prefix, encoded)
        } else {
            let digest = Sha256::digest(key.as_bytes());
            format!("{}{}{}", self.prefix, HASHED_MARKER, hex::encode(digest))
        }
    }

    fn record_path(&self, key: &str) -> PathBuf {
        self.dir.join(self.record_name(key))
    }

    /// Recovers the key of a record file, None for foreign or temporary files.
    fn key_of(&self, file_name: &str, path: &Path) -> Option<String> {
        let encoded = file_name.strip_prefix(&self.prefix)?;
        if encoded.ends_with(TMP_SUFFIX) {
            return None;
        }
        if encoded.starts_with(HASHED_MARKER) {
            return match read_key(path) {
                Ok(key) => Some(key),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "file storage: unreadable record header");
                    None
                }
            };
        }
        let bytes = hex::decode(encoded).ok()?;
        String::from_utf8(bytes).ok()
    }

    fn records(&self) -> StorageResult<Vec<(String, RecordFile)>> {
        let mut records = Vec::new();
        for dir_entry in fs::read_dir(&self.dir)? {
            let dir_entry = dir_entry?;
            let meta = dir_entry.metadata()?;
            if !meta.is_file() {
                continue;
            }
            let path = dir_entry.path();
            let file_name = dir_entry.file_name();
            let Some(key) = file_name.to_str().and_then(|name| self.key_of(name, &path)) else {
                continue;
            };
            records.push((
                key,
                RecordFile {
                    path,
                    modified: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
                    size: meta.len(),
                },
            ));
        }
        Ok(records)
    }

    fn used_bytes_excluding(&self, key: &str) -> StorageResult<u64> {
        Ok(self
            .records()?
            .iter()
            .filter(|(k, _)| k != key)
            .map(|(_, r)| r.size)
            .sum())
    }

    /// Drops the oldest records to make room.
    ///
    /// Returns the number of records removed.
    fn free_space(&self) -> StorageResult<usize> {
        let mut records = self.records()?;
        if records.is_empty() {
            return Ok(0);
        }
        records.sort_by_key(|(_, r)| r.modified);

        let target = ((records.len() as f64 * FREED_RECORD_RATIO).ceil() as usize)
            .max(MIN_FREED_RECORDS)
            .min(records.len());

        for (key, record) in records.iter().take(target) {
            remove_if_exists(&record.path)?;
            debug!(key = %key, "file storage: dropped record to free space");
        }
        Ok(target)
    }

    fn fits(&self, key: &str, len: u64) -> StorageResult<bool> {
        match self.quota_bytes {
            Some(quota) => Ok(self.used_bytes_excluding(key)? + len <= quota),
            None => Ok(true),
        }
    }
}

impl StorageAdapter for FileStorage {
    fn name(&self) -> &'static str {
        "file"
    }

    fn get_item(&mut self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        let bytes = match fs::read(self.record_path(key)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let (stored_key, value) = split_record(&bytes)?;
        if stored_key != key.as_bytes() {
            // Another key hashed to the same name
            return Ok(None);
        }
        Ok(Some(value.to_vec()))
    }

    fn set_item(&mut self, key: &str, value: &[u8]) -> StorageResult<()> {
        let record = join_record(key, value)?;
        let len = record.len() as u64;
        if !self.fits(key, len)? {
            let freed = self.free_space()?;
            warn!(freed, "file storage quota reached, dropped oldest records");
            if !self.fits(key, len)? {
                return Err(StorageError::QuotaExceeded(format!(
                    "record '{}' of {} bytes does not fit in {} byte quota",
                    key,
                    len,
                    self.quota_bytes.unwrap_or_default()
                )));
            }
        }

        let path = self.record_path(key);
        let mut tmp = path.clone().into_os_string();
        tmp.push(TMP_SUFFIX);
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, &record)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> StorageResult<()> {
        remove_if_exists(&self.record_path(key))
    }

    fn clear(&mut self) -> StorageResult<()> {
        for (_, record) in self.records()? {
            remove_if_exists(&record.path)?;
        }
        Ok(())
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        Ok(self.records()?.into_iter().map(|(key, _)| key).collect())
    }
}

fn join_record(key: &str, value: &[u8]) -> StorageResult<Vec<u8>> {
    let key_len = u16::try_from(key.len()).map_err(|_| {
        StorageError::Unavailable(format!("key of {} bytes is too long for file storage", key.len()))
    })?;
    let mut record = Vec::with_capacity(KEY_HEADER_LEN + key.len() + value.len());
    record.extend_from_slice(&key_len.to_be_bytes());
    record.extend_from_slice(key.as_bytes());
    record.extend_from_slice(value);
    Ok(record)
}

fn split_record(bytes: &[u8]) -> io::Result<(&[u8], &[u8])> {
    let truncated = || io::Error::new(ErrorKind::InvalidData, "truncated record header");
    let header = bytes.get(..KEY_HEADER_LEN).ok_or_else(truncated)?;
    let key_len = u16::from_be_bytes([header[0], header[1]]) as usize;
    let key_end = KEY_HEADER_LEN + key_len;
    let key = bytes.get(KEY_HEADER_LEN..key_end).ok_or_else(truncated)?;
    Ok((key, &bytes[key_end..]))
}

/// Reads only the key header of a record file.
fn read_key(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut header = [0u8; KEY_HEADER_LEN];
    file.read_exact(&mut header)?;
    let mut key = vec![0u8; u16::from_be_bytes(header) as usize];
    file.read_exact(&mut key)?;
    String::from_utf8(key).map_err(|e| io::Error::new(ErrorKind::InvalidData, e))
}

fn remove_if_exists(path: &Path) -> StorageResult<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
