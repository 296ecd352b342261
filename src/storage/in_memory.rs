//! In-memory implementations of the collaborator stores for testing and development

use super::{NotificationStore, PresenceStatus, PresenceStore};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// In-memory notification store
///
/// Useful for testing and development. Uses RwLock for thread-safe access.
#[derive(Clone, Default)]
pub struct InMemoryNotificationStore {
    pending: Arc<RwLock<HashMap<Uuid, Vec<Value>>>>,
}

impl InMemoryNotificationStore {
    /// Create a new in-memory notification store
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a notification for an identity
    pub fn push(&self, user_id: Uuid, notification: Value) -> Result<()> {
        let mut pending = self
            .pending
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        pending.entry(user_id).or_default().push(notification);

        Ok(())
    }
}

#[async_trait]
impl NotificationStore for InMemoryNotificationStore {
    async fn fetch_pending(&self, user_id: Uuid, limit: usize) -> Result<Vec<Value>> {
        let pending = self
            .pending
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        Ok(pending
            .get(&user_id)
            .map(|items| items.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }
}

/// In-memory presence store
#[derive(Clone, Default)]
pub struct InMemoryPresenceStore {
    records: Arc<RwLock<HashMap<(Uuid, String), PresenceStatus>>>,
}

impl InMemoryPresenceStore {
    /// Create a new in-memory presence store
    pub fn new() -> Self {
        Self::default()
    }

    /// Last persisted status for (identity, room), if any
    pub fn status_of(&self, user_id: Uuid, room_id: &str) -> Result<Option<PresenceStatus>> {
        let records = self
            .records
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        Ok(records.get(&(user_id, room_id.to_string())).copied())
    }
}

#[async_trait]
impl PresenceStore for InMemoryPresenceStore {
    async fn persist(&self, user_id: Uuid, room_id: &str, status: PresenceStatus) -> Result<()> {
        let mut records = self
            .records
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        records.insert((user_id, room_id.to_string()), status);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_fetch_pending_empty() {
        let store = InMemoryNotificationStore::new();
        let items = store.fetch_pending(Uuid::new_v4(), 10).await.unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_pending_respects_limit() {
        let store = InMemoryNotificationStore::new();
        let user = Uuid::new_v4();
        for i in 0..5 {
            store.push(user, json!({"id": i})).unwrap();
        }

        let items = store.fetch_pending(user, 3).await.unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0]["id"], 0);
    }

    #[tokio::test]
    async fn test_fetch_pending_is_per_identity() {
        let store = InMemoryNotificationStore::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        store.push(alice, json!({"for": "alice"})).unwrap();

        let items = store.fetch_pending(bob, 10).await.unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn test_presence_persist_and_read_back() {
        let store = InMemoryPresenceStore::new();
        let user = Uuid::new_v4();

        store
            .persist(user, "r1", PresenceStatus::Online)
            .await
            .unwrap();
        assert_eq!(
            store.status_of(user, "r1").unwrap(),
            Some(PresenceStatus::Online)
        );

        store
            .persist(user, "r1", PresenceStatus::Offline)
            .await
            .unwrap();
        assert_eq!(
            store.status_of(user, "r1").unwrap(),
            Some(PresenceStatus::Offline)
        );

        assert_eq!(store.status_of(user, "r2").unwrap(), None);
    }
}
