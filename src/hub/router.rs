//! Inbound frame routing
//!
//! Raw text from a connection is decoded exactly once into [`ClientFrame`]
//! and dispatched to the matching hub operation. A frame that fails to
//! decode (unknown kind, missing field) is logged and discarded; the
//! connection is never torn down over a single bad frame. Membership
//! validation for room-scoped frames happens inside the hub operations,
//! under the same lock that serializes all mutations.

use super::Hub;
use super::protocol::ClientFrame;
use uuid::Uuid;

/// Decode and dispatch one inbound text frame
pub(crate) async fn handle_text(hub: &Hub, user_id: Uuid, connection_id: &str, text: &str) {
    let frame = match serde_json::from_str::<ClientFrame>(text) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::debug!(user_id = %user_id, error = %e, "discarding malformed frame");
            return;
        }
    };

    tracing::trace!(user_id = %user_id, kind = frame.kind(), "dispatching frame");
    dispatch(hub, user_id, connection_id, frame).await;
}

async fn dispatch(hub: &Hub, user_id: Uuid, connection_id: &str, frame: ClientFrame) {
    match frame {
        ClientFrame::JoinRoom { room_id } => hub.join_room(user_id, &room_id).await,
        ClientFrame::LeaveRoom { room_id } => hub.leave_room(user_id, &room_id).await,
        ClientFrame::Ping => hub.pong(user_id, connection_id).await,
        ClientFrame::TypingStart { room_id, user_name } => {
            hub.typing_start(user_id, &room_id, &user_name).await
        }
        ClientFrame::TypingStop { room_id } => hub.typing_stop(user_id, &room_id).await,
        ClientFrame::FocusTimerStart {
            room_id,
            timer_data,
        } => hub.focus_timer_start(user_id, &room_id, timer_data).await,
        ClientFrame::FocusTimerStop { room_id } => hub.focus_timer_stop(user_id, &room_id).await,
        ClientFrame::FocusTimerUpdate {
            room_id,
            timer_data,
        } => hub.focus_timer_update(user_id, &room_id, timer_data).await,
        ClientFrame::ScreenShareStart { room_id, user_name } => {
            hub.screen_share_start(user_id, &room_id, &user_name).await
        }
        ClientFrame::ScreenShareStop { room_id, user_name } => {
            hub.screen_share_stop(user_id, &room_id, &user_name).await
        }
        ClientFrame::ToggleMute { room_id, is_muted } => {
            hub.toggle_mute(user_id, &room_id, is_muted).await
        }
        ClientFrame::ToggleVideo {
            room_id,
            is_video_off,
        } => hub.toggle_video(user_id, &room_id, is_video_off).await,
        ClientFrame::ParticipantActivity { room_id, activity } => {
            hub.participant_activity(user_id, &room_id, activity).await
        }
    }
}
