//! Key-value persistence and pin/recency bookkeeping / 键值持久化与置顶、历史
//!
//! The store itself only knows whole-value get/set — no partial updates, no
//! transactions. A crash between read and write loses that update but never
//! corrupts the store beyond last-write-wins. / 存储只有整值读写，
//! 崩溃最多丢一次更新，不会损坏数据。

use async_trait::async_trait;

use crate::error::StorageError;

pub mod memory;
pub mod service;
pub mod sqlite;

pub use memory::MemoryKvStore;
pub use service::StorageService;
pub use sqlite::SqliteKvStore;

/// Whole-value key-value store / 整值键值存储
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Read a value; missing key is None, not an error / 读取，缺失返回 None
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Overwrite a value; last write wins / 整值覆盖写入
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete a key; deleting a missing key succeeds / 删除
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}
