//! Bidirectional room membership index
//!
//! Keeps room → identities and identity → rooms in lockstep. Both maps are
//! always mutated inside the same call, under the hub's single write lock,
//! so no observer can see one side updated and not the other. Empty sets are
//! pruned so `room_count` reflects rooms with at least one member.

use std::collections::{HashMap, HashSet};
use uuid::Uuid;

#[derive(Default)]
pub(crate) struct RoomIndex {
    rooms: HashMap<String, HashSet<Uuid>>,
    user_rooms: HashMap<Uuid, HashSet<String>>,
}

impl RoomIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the (identity, room) edge. Returns `false` when the identity was
    /// already a member (idempotent join).
    pub fn join(&mut self, user_id: Uuid, room_id: &str) -> bool {
        let inserted = self
            .rooms
            .entry(room_id.to_string())
            .or_default()
            .insert(user_id);
        self.user_rooms
            .entry(user_id)
            .or_default()
            .insert(room_id.to_string());
        inserted
    }

    /// Remove the (identity, room) edge. Returns `false` when the identity
    /// was not a member (leave on a non-member is a no-op, not an error).
    pub fn leave(&mut self, user_id: Uuid, room_id: &str) -> bool {
        let Some(members) = self.rooms.get_mut(room_id) else {
            return false;
        };
        let removed = members.remove(&user_id);
        if members.is_empty() {
            self.rooms.remove(room_id);
        }

        if let Some(rooms) = self.user_rooms.get_mut(&user_id) {
            rooms.remove(room_id);
            if rooms.is_empty() {
                self.user_rooms.remove(&user_id);
            }
        }

        removed
    }

    pub fn contains(&self, user_id: Uuid, room_id: &str) -> bool {
        self.rooms
            .get(room_id)
            .is_some_and(|members| members.contains(&user_id))
    }

    /// Snapshot of a room's members
    pub fn members_of(&self, room_id: &str) -> Vec<Uuid> {
        self.rooms
            .get(room_id)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Snapshot of the rooms an identity has joined
    pub fn rooms_of(&self, user_id: Uuid) -> Vec<String> {
        self.user_rooms
            .get(&user_id)
            .map(|rooms| rooms.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Rooms with at least one member
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}
