//! The real-time coordination hub
//!
//! The hub tracks which identities are connected (possibly through several
//! simultaneous connections), which rooms each identity is present in, and
//! the ephemeral per-room state (typing indicators, call signaling), and it
//! fans events out to exactly the right set of live connections.
//!
//! # Architecture
//!
//! ```text
//! client ──ws──▶ handler ──frames──▶ router ──▶ Hub ──▶ per-connection mpsc ──▶ writer task ──▶ socket
//!                                               │
//!                                 RwLock<HubState>
//!                                 ├─ ConnectionRegistry   identity → connections
//!                                 ├─ RoomIndex            room ↔ identities
//!                                 └─ TypingTable          (room, identity) → entry
//! ```
//!
//! Every mutation goes through the single `RwLock`, so events triggered by
//! two mutations are enqueued in mutation order on every connection that
//! sees both. Enqueueing is a non-blocking channel send; the blocking socket
//! write always happens in the connection's own writer task, outside any
//! lock, so one slow peer can never stall the hub.
//!
//! The hub is constructed once via [`HubBuilder`] and handed to every
//! connection handler as an `Arc<Hub>`; there is no ambient global state.

mod presence;
pub mod protocol;
mod registry;
mod rooms;
pub(crate) mod router;

use crate::core::error::CollaboratorError;
use crate::storage::{
    NotificationStore, PresenceStatus, PresenceStore, PresenceUpdate, PresenceWriter,
};
use chrono::Utc;
use presence::TypingTable;
use protocol::ServerFrame;
use registry::ConnectionRegistry;
use rooms::RoomIndex;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

/// Point-in-time counters exposed for health monitoring
#[derive(Debug, Clone, Serialize)]
pub struct HealthSnapshot {
    pub connected_identities: usize,
    pub active_rooms: usize,
    pub total_connections: usize,
    pub rooms_with_typing_activity: usize,
}

/// All mutable hub state, guarded by one lock
struct HubState {
    registry: ConnectionRegistry,
    rooms: RoomIndex,
    typing: TypingTable,
}

impl HubState {
    fn new() -> Self {
        Self {
            registry: ConnectionRegistry::new(),
            rooms: RoomIndex::new(),
            typing: TypingTable::new(),
        }
    }

    /// Enqueue a frame on every connection of every room member except `exclude`
    fn broadcast(&self, room_id: &str, frame: &ServerFrame, exclude: Option<Uuid>) {
        for member in self.rooms.members_of(room_id) {
            if Some(member) == exclude {
                continue;
            }
            self.registry.send_to_user(member, frame);
        }
    }
}

/// The hub service
///
/// All operations are safe under concurrent invocation from many connection
/// handlers; the internal lock is the single serialization point for
/// registry, membership index and typing table.
pub struct Hub {
    state: RwLock<HubState>,
    notifications: Option<Arc<dyn NotificationStore>>,
    presence: PresenceWriter,
    pending_limit: usize,
}

impl Hub {
    pub fn builder() -> HubBuilder {
        HubBuilder::new()
    }

    // === Connection lifecycle ===

    /// Register a live connection for an identity
    ///
    /// The new connection immediately receives a `connection_established`
    /// frame. Reconnection catch-up is separate: the handler follows up with
    /// [`Hub::backfill_notifications`] in a fire-and-forget task.
    pub async fn register(
        &self,
        user_id: Uuid,
        tx: mpsc::UnboundedSender<ServerFrame>,
    ) -> String {
        let mut state = self.state.write().await;
        let connection_id = state.registry.insert(user_id, tx);
        state.registry.send_to_connection(
            user_id,
            &connection_id,
            ServerFrame::ConnectionEstablished {
                message: "Connected to real-time hub".to_string(),
                timestamp: Utc::now(),
            },
        );
        tracing::debug!(user_id = %user_id, connection_id = %connection_id, "connection registered");
        connection_id
    }

    /// Remove a connection; cascade when it was the identity's last one
    ///
    /// On full disconnect every joined room has the identity's typing entry
    /// cleared (broadcasting stop-typing once per room that had one) and
    /// receives a `user_offline` signal. Membership edges are retained:
    /// a disconnect is not a leave.
    pub async fn deregister(&self, user_id: Uuid, connection_id: &str) {
        let mut state = self.state.write().await;
        let offline = state.registry.remove(user_id, connection_id);
        tracing::debug!(user_id = %user_id, connection_id = %connection_id, "connection deregistered");
        if !offline {
            return;
        }

        for room_id in state.rooms.rooms_of(user_id) {
            if state.typing.remove(&room_id, user_id) {
                state.broadcast(
                    &room_id,
                    &ServerFrame::UserTyping {
                        user_id,
                        user_name: None,
                        is_typing: false,
                    },
                    Some(user_id),
                );
            }
            state.broadcast(
                &room_id,
                &ServerFrame::UserOffline {
                    user_id,
                    room_id: room_id.clone(),
                    timestamp: Utc::now(),
                },
                Some(user_id),
            );
            self.presence.record(PresenceUpdate {
                user_id,
                room_id,
                status: PresenceStatus::Offline,
            });
        }
        tracing::debug!(user_id = %user_id, "identity fully offline");
    }

    /// Deliver the identity's pending notifications from the durable store
    ///
    /// Called once per successful registration. A fetch failure is logged
    /// and swallowed; it never affects the registered connection.
    pub async fn backfill_notifications(&self, user_id: Uuid) {
        let Some(store) = &self.notifications else {
            return;
        };
        match store.fetch_pending(user_id, self.pending_limit).await {
            Ok(notifications) => {
                if notifications.is_empty() {
                    return;
                }
                let count = notifications.len();
                self.deliver_to_identity(
                    user_id,
                    ServerFrame::PendingNotifications {
                        notifications,
                        count,
                    },
                )
                .await;
            }
            Err(e) => {
                let err = CollaboratorError::NotificationFetch {
                    message: e.to_string(),
                };
                tracing::warn!(user_id = %user_id, error = %err, "skipping notification backfill");
            }
        }
    }

    // === Room membership ===

    /// Join a room. Idempotent: a repeat join re-confirms to the caller
    /// without re-broadcasting to the room.
    pub async fn join_room(&self, user_id: Uuid, room_id: &str) {
        let mut state = self.state.write().await;
        let newly_joined = state.rooms.join(user_id, room_id);
        if newly_joined {
            state.broadcast(
                room_id,
                &ServerFrame::UserJoinedRoom {
                    user_id,
                    room_id: room_id.to_string(),
                    timestamp: Utc::now(),
                },
                Some(user_id),
            );
            self.presence.record(PresenceUpdate {
                user_id,
                room_id: room_id.to_string(),
                status: PresenceStatus::Online,
            });
            tracing::debug!(user_id = %user_id, room_id = %room_id, "joined room");
        }
        state.registry.send_to_user(
            user_id,
            &ServerFrame::RoomJoined {
                room_id: room_id.to_string(),
                timestamp: Utc::now(),
            },
        );
    }

    /// Leave a room. A non-member's leave is a no-op apart from the
    /// confirmation to the caller.
    pub async fn leave_room(&self, user_id: Uuid, room_id: &str) {
        let mut state = self.state.write().await;
        let was_member = state.rooms.leave(user_id, room_id);
        if was_member {
            state.broadcast(
                room_id,
                &ServerFrame::UserLeftRoom {
                    user_id,
                    room_id: room_id.to_string(),
                    timestamp: Utc::now(),
                },
                Some(user_id),
            );
            if state.typing.remove(room_id, user_id) {
                state.broadcast(
                    room_id,
                    &ServerFrame::UserTyping {
                        user_id,
                        user_name: None,
                        is_typing: false,
                    },
                    Some(user_id),
                );
            }
            self.presence.record(PresenceUpdate {
                user_id,
                room_id: room_id.to_string(),
                status: PresenceStatus::Offline,
            });
            tracing::debug!(user_id = %user_id, room_id = %room_id, "left room");
        }
        state.registry.send_to_user(
            user_id,
            &ServerFrame::RoomLeft {
                room_id: room_id.to_string(),
                timestamp: Utc::now(),
            },
        );
    }

    // === Ephemeral presence ===

    /// Record a typing indicator and announce it to the room
    pub async fn typing_start(&self, user_id: Uuid, room_id: &str, user_name: &str) {
        let mut state = self.state.write().await;
        if !state.rooms.contains(user_id, room_id) {
            tracing::debug!(user_id = %user_id, room_id = %room_id, "dropping typing_start from non-member");
            return;
        }
        state.typing.upsert(room_id, user_id, user_name.to_string());
        state.broadcast(
            room_id,
            &ServerFrame::UserTyping {
                user_id,
                user_name: Some(user_name.to_string()),
                is_typing: true,
            },
            Some(user_id),
        );
    }

    /// Clear a typing indicator and announce it to the room
    ///
    /// Always broadcasts when called explicitly, even if no entry existed.
    pub async fn typing_stop(&self, user_id: Uuid, room_id: &str) {
        let mut state = self.state.write().await;
        if !state.rooms.contains(user_id, room_id) {
            tracing::debug!(user_id = %user_id, room_id = %room_id, "dropping typing_stop from non-member");
            return;
        }
        state.typing.remove(room_id, user_id);
        state.broadcast(
            room_id,
            &ServerFrame::UserTyping {
                user_id,
                user_name: None,
                is_typing: false,
            },
            Some(user_id),
        );
    }

    // === Call/session signaling (pure relay) ===

    pub async fn screen_share_start(&self, user_id: Uuid, room_id: &str, user_name: &str) {
        self.relay(
            user_id,
            room_id,
            ServerFrame::ScreenShareStart {
                room_id: room_id.to_string(),
                user_id,
                user_name: user_name.to_string(),
                timestamp: Utc::now(),
            },
            true,
        )
        .await;
    }

    pub async fn screen_share_stop(&self, user_id: Uuid, room_id: &str, user_name: &str) {
        self.relay(
            user_id,
            room_id,
            ServerFrame::ScreenShareStop {
                room_id: room_id.to_string(),
                user_id,
                user_name: user_name.to_string(),
                timestamp: Utc::now(),
            },
            true,
        )
        .await;
    }

    pub async fn toggle_mute(&self, user_id: Uuid, room_id: &str, is_muted: bool) {
        self.relay(
            user_id,
            room_id,
            ServerFrame::UserMuteToggled {
                room_id: room_id.to_string(),
                user_id,
                is_muted,
                timestamp: Utc::now(),
            },
            true,
        )
        .await;
    }

    pub async fn toggle_video(&self, user_id: Uuid, room_id: &str, is_video_off: bool) {
        self.relay(
            user_id,
            room_id,
            ServerFrame::UserVideoToggled {
                room_id: room_id.to_string(),
                user_id,
                is_video_off,
                timestamp: Utc::now(),
            },
            true,
        )
        .await;
    }

    pub async fn participant_activity(&self, user_id: Uuid, room_id: &str, activity: Value) {
        self.relay(
            user_id,
            room_id,
            ServerFrame::ParticipantActivity {
                room_id: room_id.to_string(),
                user_id,
                activity,
                timestamp: Utc::now(),
            },
            true,
        )
        .await;
    }

    /// Focus timer frames go to the whole room, the originator included.
    pub async fn focus_timer_start(&self, user_id: Uuid, room_id: &str, timer_data: Value) {
        self.relay(
            user_id,
            room_id,
            ServerFrame::FocusTimerStarted {
                room_id: room_id.to_string(),
                timer_data,
                timestamp: Utc::now(),
            },
            false,
        )
        .await;
    }

    pub async fn focus_timer_stop(&self, user_id: Uuid, room_id: &str) {
        self.relay(
            user_id,
            room_id,
            ServerFrame::FocusTimerStopped {
                room_id: room_id.to_string(),
                timestamp: Utc::now(),
            },
            false,
        )
        .await;
    }

    pub async fn focus_timer_update(&self, user_id: Uuid, room_id: &str, timer_data: Value) {
        self.relay(
            user_id,
            room_id,
            ServerFrame::FocusTimerUpdate {
                room_id: room_id.to_string(),
                timer_data,
                timestamp: Utc::now(),
            },
            false,
        )
        .await;
    }

    /// Member-validated room relay with no state of its own
    async fn relay(&self, user_id: Uuid, room_id: &str, frame: ServerFrame, exclude_actor: bool) {
        let state = self.state.read().await;
        if !state.rooms.contains(user_id, room_id) {
            tracing::debug!(user_id = %user_id, room_id = %room_id, "dropping relay frame from non-member");
            return;
        }
        let exclude = exclude_actor.then_some(user_id);
        state.broadcast(room_id, &frame, exclude);
    }

    /// Answer a ping on the connection that sent it
    pub(crate) async fn pong(&self, user_id: Uuid, connection_id: &str) {
        let state = self.state.read().await;
        state.registry.send_to_connection(
            user_id,
            connection_id,
            ServerFrame::Pong {
                timestamp: Utc::now(),
            },
        );
    }

    // === Injected events (trusted collaborators) ===

    /// Fan a frame out to every live connection of an identity
    ///
    /// With zero open connections the frame is dropped, not queued.
    pub async fn deliver_to_identity(&self, user_id: Uuid, frame: ServerFrame) {
        let state = self.state.read().await;
        state.registry.send_to_user(user_id, &frame);
    }

    /// Fan a frame out to every member of a room, optionally excluding one
    pub async fn deliver_to_room(&self, room_id: &str, frame: ServerFrame, exclude: Option<Uuid>) {
        let state = self.state.read().await;
        state.broadcast(room_id, &frame, exclude);
    }

    /// Fan a frame out to every connected identity
    pub async fn broadcast_all(&self, frame: ServerFrame, exclude: Option<Uuid>) {
        let state = self.state.read().await;
        for user_id in state.registry.connected_users() {
            if Some(user_id) == exclude {
                continue;
            }
            state.registry.send_to_user(user_id, &frame);
        }
    }

    pub async fn send_notification(&self, user_id: Uuid, payload: Value) {
        self.deliver_to_identity(user_id, ServerFrame::Notification(payload))
            .await;
    }

    pub async fn send_achievement(&self, user_id: Uuid, payload: Value) {
        self.deliver_to_identity(user_id, ServerFrame::AchievementEarned(payload))
            .await;
    }

    pub async fn send_level_up(&self, user_id: Uuid, payload: Value) {
        self.deliver_to_identity(user_id, ServerFrame::LevelUp(payload))
            .await;
    }

    pub async fn send_friend_request(&self, user_id: Uuid, payload: Value) {
        self.deliver_to_identity(user_id, ServerFrame::FriendRequest(payload))
            .await;
    }

    pub async fn send_message_notification(&self, user_id: Uuid, payload: Value) {
        self.deliver_to_identity(user_id, ServerFrame::MessageReceived(payload))
            .await;
    }

    // === Introspection ===

    pub async fn is_online(&self, user_id: Uuid) -> bool {
        self.state.read().await.registry.is_online(user_id)
    }

    pub async fn connection_count(&self, user_id: Uuid) -> usize {
        self.state.read().await.registry.connection_count(user_id)
    }

    pub async fn room_participants(&self, room_id: &str) -> Vec<Uuid> {
        self.state.read().await.rooms.members_of(room_id)
    }

    pub async fn rooms_of(&self, user_id: Uuid) -> Vec<String> {
        self.state.read().await.rooms.rooms_of(user_id)
    }

    pub async fn connected_users(&self) -> Vec<Uuid> {
        self.state.read().await.registry.connected_users()
    }

    pub async fn health_snapshot(&self) -> HealthSnapshot {
        let state = self.state.read().await;
        HealthSnapshot {
            connected_identities: state.registry.identity_count(),
            active_rooms: state.rooms.room_count(),
            total_connections: state.registry.total_connections(),
            rooms_with_typing_activity: state.typing.active_room_count(),
        }
    }
}

/// Builder for the hub service
///
/// # Example
///
/// ```rust,ignore
/// let hub = Hub::builder()
///     .with_config(&config)
///     .with_notification_store(my_store)
///     .with_presence_store(my_presence)
///     .build();
/// ```
pub struct HubBuilder {
    notification_store: Option<Arc<dyn NotificationStore>>,
    presence_store: Option<Arc<dyn PresenceStore>>,
    pending_notification_limit: usize,
    presence_queue_capacity: usize,
}

impl HubBuilder {
    pub fn new() -> Self {
        Self {
            notification_store: None,
            presence_store: None,
            pending_notification_limit: 10,
            presence_queue_capacity: 256,
        }
    }

    /// Take tunables from a loaded configuration
    pub fn with_config(mut self, config: &crate::config::HubConfig) -> Self {
        self.pending_notification_limit = config.pending_notification_limit;
        self.presence_queue_capacity = config.presence_queue_capacity;
        self
    }

    /// Set the durable notification store used for reconnection catch-up
    pub fn with_notification_store(mut self, store: impl NotificationStore + 'static) -> Self {
        self.notification_store = Some(Arc::new(store));
        self
    }

    /// Set the best-effort presence sink
    pub fn with_presence_store(mut self, store: impl PresenceStore + 'static) -> Self {
        self.presence_store = Some(Arc::new(store));
        self
    }

    /// Build the hub, spawning the presence writer task when a store is set
    ///
    /// Must be called from within a tokio runtime.
    pub fn build(self) -> Arc<Hub> {
        let presence = match self.presence_store {
            Some(store) => PresenceWriter::spawn(store, self.presence_queue_capacity),
            None => PresenceWriter::disabled(),
        };
        Arc::new(Hub {
            state: RwLock::new(HubState::new()),
            notifications: self.notification_store,
            presence,
            pending_limit: self.pending_notification_limit,
        })
    }
}

impl Default for HubBuilder {
    fn default() -> Self {
        Self::new()
    }
}
