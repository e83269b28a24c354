//! Layered storage tier.
//!
//! A fast primary in front of a slower secondary. Secondary hits are copied
//! into the primary so the next read stays local.

use std::collections::BTreeSet;

use tracing::warn;

use super::{StorageAdapter, StorageResult};

#[derive(Debug)]
pub struct MultiLevelStorage {
    primary: Box<dyn StorageAdapter>,
    secondary: Box<dyn StorageAdapter>,
}

impl MultiLevelStorage {
    pub fn new(primary: Box<dyn StorageAdapter>, secondary: Box<dyn StorageAdapter>) -> Self {
        Self { primary, secondary }
    }
}

impl StorageAdapter for MultiLevelStorage {
    fn name(&self) -> &'static str {
        "multi_level"
    }

    fn get_item(&mut self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        if let Some(bytes) = self.primary.get_item(key)? {
            return Ok(Some(bytes));
        }

        let found = self.secondary.get_item(key)?;
        if let Some(bytes) = &found {
            if let Err(e) = self.primary.set_item(key, bytes) {
                warn!(
                    key = %key,
                    tier = self.primary.name(),
                    error = %e,
                    "promotion into primary storage failed"
                );
            }
        }
        Ok(found)
    }

    fn set_item(&mut self, key: &str, value: &[u8]) -> StorageResult<()> {
        self.primary.set_item(key, value)?;

        // The secondary is best-effort; the primary already holds the record
        if let Err(e) = self.secondary.set_item(key, value) {
            warn!(
                key = %key,
                tier = self.secondary.name(),
                error = %e,
                "secondary storage write failed"
            );
        }
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> StorageResult<()> {
        self.primary.remove_item(key)?;
        self.secondary.remove_item(key)
    }

    fn clear(&mut self) -> StorageResult<()> {
        self.primary.clear()?;
        self.secondary.clear()
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        let mut keys: BTreeSet<String> = self.primary.keys()?.into_iter().collect();
        keys.extend(self.secondary.keys()?);
        Ok(keys.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FileStorage, MemoryStorage, StorageError};

    /// Tier that holds a fixed set of records and refuses every write.
    #[derive(Debug, Default)]
    struct ReadOnlyStorage {
        records: MemoryStorage,
    }

    impl StorageAdapter for ReadOnlyStorage {
        fn name(&self) -> &'static str {
            "read_only"
        }

        fn get_item(&mut self, key: &str) -> StorageResult<Option<Vec<u8>>> {
            self.records.get_item(key)
        }

        fn set_item(&mut self, _key: &str, _value: &[u8]) -> StorageResult<()> {
            Err(StorageError::Unavailable("read only".to_string()))
        }

        fn remove_item(&mut self, key: &str) -> StorageResult<()> {
            self.records.remove_item(key)
        }

        fn clear(&mut self) -> StorageResult<()> {
            self.records.clear()
        }

        fn keys(&self) -> StorageResult<Vec<String>> {
            self.records.keys()
        }
    }

    fn layered(dir: &std::path::Path) -> MultiLevelStorage {
        MultiLevelStorage::new(
            Box::new(MemoryStorage::new()),
            Box::new(FileStorage::open(dir, "ml_").unwrap()),
        )
    }

    #[test]
    fn test_multi_level_writes_both_tiers() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = layered(dir.path());

        storage.set_item("k", b"v").unwrap();

        let mut file = FileStorage::open(dir.path(), "ml_").unwrap();
        assert_eq!(file.get_item("k").unwrap(), Some(b"v".to_vec()));
        assert_eq!(storage.get_item("k").unwrap(), Some(b"v".to_vec()));
    }

    #[test]
    fn test_multi_level_falls_back_and_promotes() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut file = FileStorage::open(dir.path(), "ml_").unwrap();
            file.set_item("persisted", b"from-disk").unwrap();
        }

        let mut storage = layered(dir.path());
        assert_eq!(
            storage.get_item("persisted").unwrap(),
            Some(b"from-disk".to_vec())
        );

        // Remove from disk behind the layer's back; the promoted copy answers
        let mut file = FileStorage::open(dir.path(), "ml_").unwrap();
        file.remove_item("persisted").unwrap();
        assert_eq!(
            storage.get_item("persisted").unwrap(),
            Some(b"from-disk".to_vec())
        );
    }

    #[test]
    fn test_multi_level_keys_union_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut file = FileStorage::open(dir.path(), "ml_").unwrap();
            file.set_item("disk_only", b"1").unwrap();
        }
        let mut storage = layered(dir.path());
        storage.set_item("both", b"2").unwrap();

        assert_eq!(
            storage.keys().unwrap(),
            vec!["both".to_string(), "disk_only".to_string()]
        );

        storage.clear().unwrap();
        assert!(storage.keys().unwrap().is_empty());
    }

    #[test]
    fn test_multi_level_tolerates_secondary_write_failure() {
        let mut storage = MultiLevelStorage::new(
            Box::new(MemoryStorage::new()),
            Box::new(ReadOnlyStorage::default()),
        );

        storage.set_item("k", b"v").unwrap();

        assert_eq!(storage.get_item("k").unwrap(), Some(b"v".to_vec()));
        assert_eq!(storage.keys().unwrap(), vec!["k".to_string()]);
    }

    #[test]
    fn test_multi_level_serves_secondary_hit_when_promotion_fails() {
        let mut secondary = ReadOnlyStorage::default();
        secondary.records.set_item("k", b"from-secondary").unwrap();
        let mut storage = MultiLevelStorage::new(
            Box::new(ReadOnlyStorage::default()),
            Box::new(secondary),
        );

        assert_eq!(
            storage.get_item("k").unwrap(),
            Some(b"from-secondary".to_vec())
        );
    }
}
