//! WebSocket upgrade handler and per-connection loops
//!
//! Admission is decided before the upgrade completes: the credential token
//! from the query string is verified and a failure refuses the handshake
//! with 401. No connection state exists at that point and no frame from the
//! socket is ever read. An admitted connection gets:
//!
//! 1. Registration with the hub (which emits `connection_established`)
//! 2. A fire-and-forget backfill of pending notifications
//! 3. A writer task draining the connection's channel to the socket
//! 4. A read loop feeding inbound frames to the router
//!
//! Closing the socket (client close, read error, or a failed write) ends
//! the loops and triggers `deregister` synchronously in the cleanup path.

use super::AppState;
use crate::core::error::AdmissionError;
use crate::hub::Hub;
use crate::hub::router;
use axum::Json;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::{IntoResponse, Response};
use futures::SinkExt;
use futures::stream::StreamExt;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub(crate) struct WsParams {
    token: Option<String>,
}

/// Upgrade handler for the hub's WebSocket endpoint
pub(crate) async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsParams>,
    State(state): State<AppState>,
) -> Result<Response, AdmissionError> {
    let token = params.token.ok_or(AdmissionError::MissingToken)?;
    let user_id = state.verifier.verify(&token).await.inspect_err(|e| {
        tracing::debug!(error = %e, "refusing upgrade");
    })?;

    let hub = state.hub.clone();
    Ok(ws
        .on_upgrade(move |socket| handle_socket(socket, hub, user_id))
        .into_response())
}

/// Health endpoint backed by the hub's live counters
pub(crate) async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.hub.health_snapshot().await)
}

/// Run one admitted connection to completion
async fn handle_socket(socket: WebSocket, hub: Arc<Hub>, user_id: Uuid) {
    let (mut ws_write, mut ws_read) = socket.split();

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let connection_id = hub.register(user_id, tx).await;

    // Reconnection catch-up must never block or fail the registration
    {
        let hub = hub.clone();
        tokio::spawn(async move {
            hub.backfill_notifications(user_id).await;
        });
    }

    // Writer task: the only place this connection's socket is written
    let conn_id_write = connection_id.clone();
    let write_handle = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            match serde_json::to_string(&frame) {
                Ok(json) => {
                    if ws_write.send(Message::Text(json.into())).await.is_err() {
                        tracing::debug!(
                            connection_id = %conn_id_write,
                            "WebSocket write failed, closing"
                        );
                        break;
                    }
                }
                Err(e) => {
                    tracing::error!(
                        connection_id = %conn_id_write,
                        error = %e,
                        "Failed to serialize frame"
                    );
                }
            }
        }
    });

    // Read loop: inbound frames until the connection dies
    while let Some(result) = ws_read.next().await {
        match result {
            Ok(Message::Text(text)) => {
                router::handle_text(&hub, user_id, &connection_id, &text).await;
            }
            Ok(Message::Close(_)) => {
                tracing::debug!(connection_id = %connection_id, "Client sent close frame");
                break;
            }
            Ok(Message::Ping(_)) => {
                // axum answers transport-level pings automatically
            }
            Ok(_) => {
                // Ignore binary and other message types
            }
            Err(e) => {
                tracing::debug!(
                    connection_id = %connection_id,
                    error = %e,
                    "WebSocket read error"
                );
                break;
            }
        }
    }

    // Teardown is the only cancellation mechanism: deregister runs before
    // the handler task ends, in-flight sends to this connection no-op.
    write_handle.abort();
    hub.deregister(user_id, &connection_id).await;
}
