//! Pin and recency bookkeeping over the key-value store / 置顶与历史服务
//!
//! All operations are whole-document read-modify-write. On a failed write
//! the store keeps its previous value and the error propagates — the caller
//! retains its in-memory state and may retry or surface the failure.
//! / 所有操作都是整文档读改写；写失败时错误上抛，调用方保留内存状态。

use std::sync::Arc;

use crate::error::StorageError;
use crate::models::{ContactRecord, RecentEntry};

use super::KvStore;

const KEY_PINNED: &str = "pinned_contacts";
const KEY_RECENT: &str = "recent_contacts";

/// Pin/recency store / 置顶与历史存储
#[derive(Clone)]
pub struct StorageService {
    store: Arc<dyn KvStore>,
    recent_cap: usize,
}

impl StorageService {
    pub fn new(store: Arc<dyn KvStore>, recent_cap: usize) -> Self {
        Self { store, recent_cap }
    }

    /// Pinned contacts, user order / 置顶联系人，按用户顺序
    ///
    /// Read or decode failures degrade to an empty list with a warning —
    /// pinning is a convenience, never a reason to fail a session.
    /// / 读取失败降级为空列表。
    pub async fn get_pinned(&self) -> Vec<ContactRecord> {
        self.read_list(KEY_PINNED).await
    }

    /// Whole-list replace / 整表覆盖
    pub async fn set_pinned(&self, contacts: &[ContactRecord]) -> Result<(), StorageError> {
        self.write_list(KEY_PINNED, contacts).await
    }

    /// Recent contacts, newest first / 最近联系人，新者在前
    pub async fn get_recent(&self) -> Vec<RecentEntry> {
        self.read_list(KEY_RECENT).await
    }

    /// Move-to-front insert with dedup and cap, then persist the whole list
    /// / 去重后插入队首，截断到上限，整表持久化
    pub async fn add_recent(
        &self,
        contact: &ContactRecord,
    ) -> Result<Vec<RecentEntry>, StorageError> {
        let mut entries = self.get_recent().await;
        entries.retain(|e| e.contact.id != contact.id);
        entries.insert(
            0,
            RecentEntry {
                contact: contact.clone(),
                contacted_at: chrono::Utc::now().to_rfc3339(),
            },
        );
        entries.truncate(self.recent_cap);

        self.write_list(KEY_RECENT, &entries).await?;
        Ok(entries)
    }

    /// Replace the log with an empty list / 清空历史
    pub async fn clear_recent(&self) -> Result<(), StorageError> {
        self.write_list::<RecentEntry>(KEY_RECENT, &[]).await
    }

    async fn read_list<T: serde::de::DeserializeOwned>(&self, key: &str) -> Vec<T> {
        let raw = match self.store.get(key).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("Failed to read {}: {}", key, e);
                return Vec::new();
            }
        };

        match raw {
            Some(json) => serde_json::from_str(&json).unwrap_or_else(|e| {
                tracing::warn!("Discarding undecodable {}: {}", key, e);
                Vec::new()
            }),
            None => Vec::new(),
        }
    }

    async fn write_list<T: serde::Serialize>(
        &self,
        key: &str,
        list: &[T],
    ) -> Result<(), StorageError> {
        let json =
            serde_json::to_string(list).map_err(|e| StorageError::Persistence(e.to_string()))?;
        self.store.set(key, &json).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryKvStore;

    fn contact(id: &str, title: &str) -> ContactRecord {
        ContactRecord {
            id: id.to_string(),
            title: title.to_string(),
            subtitle: None,
            icon: None,
            url: format!("weisou://chat/{}", id),
        }
    }

    fn service() -> StorageService {
        StorageService::new(Arc::new(MemoryKvStore::new()), 3)
    }

    #[tokio::test]
    async fn test_pinned_round_trip() {
        let service = service();
        assert!(service.get_pinned().await.is_empty());

        let pinned = vec![contact("wx_a", "阿丽"), contact("wx_b", "小波")];
        service.set_pinned(&pinned).await.unwrap();
        assert_eq!(service.get_pinned().await, pinned);
    }

    #[tokio::test]
    async fn test_add_recent_moves_to_front() {
        let service = service();
        let a = contact("wx_a", "阿丽");
        let b = contact("wx_b", "小波");

        service.add_recent(&a).await.unwrap();
        service.add_recent(&b).await.unwrap();
        let entries = service.add_recent(&a).await.unwrap();

        // addRecent(A), addRecent(B), addRecent(A) → [A, B]
        let ids: Vec<&str> = entries.iter().map(|e| e.contact.id.as_str()).collect();
        assert_eq!(ids, vec!["wx_a", "wx_b"]);
    }

    #[tokio::test]
    async fn test_add_recent_is_idempotent_for_ordering() {
        let service = service();
        let a = contact("wx_a", "阿丽");

        service.add_recent(&a).await.unwrap();
        let entries = service.add_recent(&a).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].contact.id, "wx_a");
    }

    #[tokio::test]
    async fn test_recent_cap_enforced() {
        let service = service(); // cap = 3
        for i in 0..10 {
            let c = contact(&format!("wx_{}", i), &format!("联系人{}", i));
            let entries = service.add_recent(&c).await.unwrap();
            assert!(entries.len() <= 3);
        }

        let entries = service.get_recent().await;
        assert_eq!(entries.len(), 3);
        // 最新的在最前 / newest first
        assert_eq!(entries[0].contact.id, "wx_9");
        assert_eq!(entries[2].contact.id, "wx_7");
    }

    #[tokio::test]
    async fn test_recent_snapshot_survives_rename() {
        let service = service();
        service.add_recent(&contact("wx_a", "旧名字")).await.unwrap();

        // 改名后历史保留当时的名字 / history keeps the name at contact time
        let entries = service.get_recent().await;
        assert_eq!(entries[0].contact.title, "旧名字");
    }

    #[tokio::test]
    async fn test_clear_recent() {
        let service = service();
        service.add_recent(&contact("wx_a", "阿丽")).await.unwrap();
        service.clear_recent().await.unwrap();
        assert!(service.get_recent().await.is_empty());
    }

    #[tokio::test]
    async fn test_undecodable_blob_degrades_to_empty() {
        let store = Arc::new(MemoryKvStore::new());
        store.set("recent_contacts", "not json").await.unwrap();
        let service = StorageService::new(store, 3);
        assert!(service.get_recent().await.is_empty());
    }
}
