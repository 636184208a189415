//! In-memory key-value store for tests / 测试用内存键值存储

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::StorageError;

use super::KvStore;

/// HashMap-backed store with the same whole-value semantics as sqlite
/// / 与 sqlite 同语义的内存实现
#[derive(Default)]
pub struct MemoryKvStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values.read().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.values
            .write()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.values.write().remove(key);
        Ok(())
    }
}
