//! Ephemeral typing state, keyed by (room, identity)
//!
//! Entries are never persisted and never expire on a timer: they are removed
//! on explicit stop, on room leave, or when the identity's last connection
//! closes. Staleness is bounded only by those events.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use uuid::Uuid;

/// One identity currently typing in one room
///
/// The name and timestamp are carried for observability; live broadcasts use
/// the values from the triggering frame.
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub(crate) struct TypingEntry {
    pub user_name: String,
    pub last_signal: DateTime<Utc>,
}

#[derive(Default)]
pub(crate) struct TypingTable {
    entries: HashMap<String, HashMap<Uuid, TypingEntry>>,
}

impl TypingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that an identity is typing, refreshing the signal timestamp on
    /// repeat starts.
    pub fn upsert(&mut self, room_id: &str, user_id: Uuid, user_name: String) {
        self.entries.entry(room_id.to_string()).or_default().insert(
            user_id,
            TypingEntry {
                user_name,
                last_signal: Utc::now(),
            },
        );
    }

    /// Remove an entry. Returns `true` when one actually existed, so the
    /// implicit cleanup paths (leave, disconnect) can broadcast stop-typing
    /// exactly once.
    pub fn remove(&mut self, room_id: &str, user_id: Uuid) -> bool {
        let Some(room) = self.entries.get_mut(room_id) else {
            return false;
        };
        let removed = room.remove(&user_id).is_some();
        if room.is_empty() {
            self.entries.remove(room_id);
        }
        removed
    }

    #[allow(dead_code)]
    pub fn is_typing(&self, room_id: &str, user_id: Uuid) -> bool {
        self.entries
            .get(room_id)
            .is_some_and(|room| room.contains_key(&user_id))
    }

    #[allow(dead_code)]
    pub fn entry(&self, room_id: &str, user_id: Uuid) -> Option<&TypingEntry> {
        self.entries.get(room_id)?.get(&user_id)
    }

    /// Rooms with at least one active typing indicator
    pub fn active_room_count(&self) -> usize {
        self.entries.len()
    }
}
