//! Collaborator boundaries for durable state
//!
//! The hub holds nothing durable itself. Two external collaborators are
//! modeled as trait seams: the notification store, consulted once per
//! registration so a reconnecting identity can backfill what it missed, and
//! the presence store, written best-effort through a dedicated writer task
//! so the delivery path never awaits a collaborator. Failures on either seam
//! are logged and swallowed; they never prevent registration or live fan-out.

pub mod in_memory;
pub mod presence_writer;

pub use in_memory::{InMemoryNotificationStore, InMemoryPresenceStore};
pub use presence_writer::{PresenceUpdate, PresenceWriter};

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// Presence status persisted per (identity, room)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceStatus {
    Online,
    Offline,
}

impl fmt::Display for PresenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PresenceStatus::Online => write!(f, "online"),
            PresenceStatus::Offline => write!(f, "offline"),
        }
    }
}

/// Durable notification store consulted for reconnection catch-up
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Fetch up to `limit` unread notifications for an identity
    async fn fetch_pending(&self, user_id: Uuid, limit: usize) -> Result<Vec<Value>>;
}

/// Best-effort sink for per-room presence status
#[async_trait]
pub trait PresenceStore: Send + Sync {
    async fn persist(&self, user_id: Uuid, room_id: &str, status: PresenceStatus) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presence_status_display() {
        assert_eq!(PresenceStatus::Online.to_string(), "online");
        assert_eq!(PresenceStatus::Offline.to_string(), "offline");
    }

    #[test]
    fn test_presence_status_serialization() {
        let json = serde_json::to_value(PresenceStatus::Online).unwrap();
        assert_eq!(json, "online");
    }
}
