//! Wire protocol for the hub's WebSocket endpoint
//!
//! Defines the JSON frames exchanged between clients and the hub. Inbound
//! frames are decoded exactly once, at the router boundary, into the closed
//! [`ClientFrame`] sum type; anything that fails to decode is logged and
//! dropped without touching hub state.
//!
//! ## Client → Server Frames
//!
//! ```json
//! {"type": "join_room", "room_id": "study-42"}
//! {"type": "typing_start", "room_id": "study-42", "user_name": "Alice"}
//! {"type": "ping"}
//! ```
//!
//! ## Server → Client Frames
//!
//! Every outbound frame serializes as `{"type": <kind>, "data": {...}}`:
//!
//! ```json
//! {"type": "user_typing", "data": {"user_id": "...", "user_name": "Alice", "is_typing": true}}
//! {"type": "room_joined", "data": {"room_id": "study-42", "timestamp": "..."}}
//! {"type": "pong", "data": {"timestamp": "..."}}
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Frames sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Subscribe to a room's live events
    JoinRoom { room_id: String },
    /// Unsubscribe from a room
    LeaveRoom { room_id: String },
    /// Keepalive ping, answered on the same connection only
    Ping,
    /// The sender started typing in a room
    TypingStart { room_id: String, user_name: String },
    /// The sender stopped typing in a room
    TypingStop { room_id: String },
    /// Start a shared focus timer (relayed to the whole room, sender included)
    FocusTimerStart { room_id: String, timer_data: Value },
    /// Stop the shared focus timer
    FocusTimerStop { room_id: String },
    /// Progress update for the shared focus timer
    FocusTimerUpdate { room_id: String, timer_data: Value },
    /// The sender started sharing their screen
    ScreenShareStart { room_id: String, user_name: String },
    /// The sender stopped sharing their screen
    ScreenShareStop { room_id: String, user_name: String },
    /// The sender toggled their microphone
    ToggleMute { room_id: String, is_muted: bool },
    /// The sender toggled their camera
    ToggleVideo { room_id: String, is_video_off: bool },
    /// Free-form in-call activity signal (hand raised, reaction, ...)
    ParticipantActivity { room_id: String, activity: Value },
}

impl ClientFrame {
    /// The room this frame targets, if it is room-scoped
    pub fn room_id(&self) -> Option<&str> {
        match self {
            ClientFrame::Ping => None,
            ClientFrame::JoinRoom { room_id }
            | ClientFrame::LeaveRoom { room_id }
            | ClientFrame::TypingStart { room_id, .. }
            | ClientFrame::TypingStop { room_id }
            | ClientFrame::FocusTimerStart { room_id, .. }
            | ClientFrame::FocusTimerStop { room_id }
            | ClientFrame::FocusTimerUpdate { room_id, .. }
            | ClientFrame::ScreenShareStart { room_id, .. }
            | ClientFrame::ScreenShareStop { room_id, .. }
            | ClientFrame::ToggleMute { room_id, .. }
            | ClientFrame::ToggleVideo { room_id, .. }
            | ClientFrame::ParticipantActivity { room_id, .. } => Some(room_id),
        }
    }

    /// Short kind name for logging
    pub fn kind(&self) -> &'static str {
        match self {
            ClientFrame::JoinRoom { .. } => "join_room",
            ClientFrame::LeaveRoom { .. } => "leave_room",
            ClientFrame::Ping => "ping",
            ClientFrame::TypingStart { .. } => "typing_start",
            ClientFrame::TypingStop { .. } => "typing_stop",
            ClientFrame::FocusTimerStart { .. } => "focus_timer_start",
            ClientFrame::FocusTimerStop { .. } => "focus_timer_stop",
            ClientFrame::FocusTimerUpdate { .. } => "focus_timer_update",
            ClientFrame::ScreenShareStart { .. } => "screen_share_start",
            ClientFrame::ScreenShareStop { .. } => "screen_share_stop",
            ClientFrame::ToggleMute { .. } => "toggle_mute",
            ClientFrame::ToggleVideo { .. } => "toggle_video",
            ClientFrame::ParticipantActivity { .. } => "participant_activity",
        }
    }
}

/// Frames sent from server to client
///
/// Adjacently tagged so the wire shape is `{"type": ..., "data": {...}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ServerFrame {
    /// Sent to a connection right after successful registration
    ConnectionEstablished {
        message: String,
        timestamp: DateTime<Utc>,
    },
    /// Keepalive response
    Pong { timestamp: DateTime<Utc> },
    /// Join confirmation to the acting identity
    RoomJoined {
        room_id: String,
        timestamp: DateTime<Utc>,
    },
    /// Leave confirmation to the acting identity
    RoomLeft {
        room_id: String,
        timestamp: DateTime<Utc>,
    },
    /// A peer joined the room
    UserJoinedRoom {
        user_id: Uuid,
        room_id: String,
        timestamp: DateTime<Utc>,
    },
    /// A peer explicitly left the room
    UserLeftRoom {
        user_id: Uuid,
        room_id: String,
        timestamp: DateTime<Utc>,
    },
    /// A peer's last connection closed; its membership is retained
    UserOffline {
        user_id: Uuid,
        room_id: String,
        timestamp: DateTime<Utc>,
    },
    /// Typing indicator state for a peer
    UserTyping {
        user_id: Uuid,
        #[serde(skip_serializing_if = "Option::is_none")]
        user_name: Option<String>,
        is_typing: bool,
    },
    /// Shared focus timer started
    FocusTimerStarted {
        room_id: String,
        timer_data: Value,
        timestamp: DateTime<Utc>,
    },
    /// Shared focus timer stopped
    FocusTimerStopped {
        room_id: String,
        timestamp: DateTime<Utc>,
    },
    /// Shared focus timer progress
    FocusTimerUpdate {
        room_id: String,
        timer_data: Value,
        timestamp: DateTime<Utc>,
    },
    /// A peer started sharing their screen
    ScreenShareStart {
        room_id: String,
        user_id: Uuid,
        user_name: String,
        timestamp: DateTime<Utc>,
    },
    /// A peer stopped sharing their screen
    ScreenShareStop {
        room_id: String,
        user_id: Uuid,
        user_name: String,
        timestamp: DateTime<Utc>,
    },
    /// A peer toggled their microphone
    UserMuteToggled {
        room_id: String,
        user_id: Uuid,
        is_muted: bool,
        timestamp: DateTime<Utc>,
    },
    /// A peer toggled their camera
    UserVideoToggled {
        room_id: String,
        user_id: Uuid,
        is_video_off: bool,
        timestamp: DateTime<Utc>,
    },
    /// Free-form in-call activity from a peer
    ParticipantActivity {
        room_id: String,
        user_id: Uuid,
        activity: Value,
        timestamp: DateTime<Utc>,
    },
    /// Backfill of notifications persisted while the identity was offline
    PendingNotifications {
        notifications: Vec<Value>,
        count: usize,
    },
    /// Generic notification injected by a business collaborator
    Notification(Value),
    /// Gamification: achievement unlocked
    AchievementEarned(Value),
    /// Gamification: level up
    LevelUp(Value),
    /// Social: incoming friend request
    FriendRequest(Value),
    /// A durable chat message was committed for this identity
    MessageReceived(Value),
}
