//! In-process storage tier.

use std::collections::HashMap;

use super::{StorageAdapter, StorageResult};

/// HashMap-backed tier living as long as the process.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    data: HashMap<String, Vec<u8>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl StorageAdapter for MemoryStorage {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn get_item(&mut self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.data.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &[u8]) -> StorageResult<()> {
        self.data.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> StorageResult<()> {
        self.data.remove(key);
        Ok(())
    }

    fn clear(&mut self) -> StorageResult<()> {
        self.data.clear();
        Ok(())
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        Ok(self.data.keys().cloned().collect())
    }
}
