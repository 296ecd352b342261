//! Connection registry: identity → set of live connection handles
//!
//! One identity may hold several connections at once (multiple devices or
//! tabs). Each handle carries an unbounded channel sender; the actual socket
//! write happens in the connection's own writer task, so enqueueing here
//! never blocks. A send to a closed channel is tolerated: the owning handler
//! deregisters the connection as part of its own teardown.

use super::protocol::ServerFrame;
use std::collections::HashMap;
use tokio::sync::mpsc;
use uuid::Uuid;

/// A handle to a single live connection
pub(crate) struct ConnectionHandle {
    /// Unique connection id, `conn_<uuid>`
    pub id: String,
    /// Sender feeding the connection's writer task
    pub tx: mpsc::UnboundedSender<ServerFrame>,
}

/// All live connections, indexed by owning identity
#[derive(Default)]
pub(crate) struct ConnectionRegistry {
    connections: HashMap<Uuid, Vec<ConnectionHandle>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection for an identity, returning its generated id
    pub fn insert(&mut self, user_id: Uuid, tx: mpsc::UnboundedSender<ServerFrame>) -> String {
        let id = format!("conn_{}", Uuid::new_v4().simple());
        self.connections
            .entry(user_id)
            .or_default()
            .push(ConnectionHandle { id: id.clone(), tx });
        id
    }

    /// Remove a connection. Returns `true` when this was the identity's last
    /// connection, i.e. the identity is now fully offline.
    pub fn remove(&mut self, user_id: Uuid, connection_id: &str) -> bool {
        let Some(handles) = self.connections.get_mut(&user_id) else {
            return false;
        };
        handles.retain(|h| h.id != connection_id);
        if handles.is_empty() {
            self.connections.remove(&user_id);
            true
        } else {
            false
        }
    }

    /// Enqueue a frame on every connection of an identity
    ///
    /// Connections are independent: a closed sibling channel is skipped and
    /// never affects the others. With zero connections the frame is dropped.
    pub fn send_to_user(&self, user_id: Uuid, frame: &ServerFrame) {
        let Some(handles) = self.connections.get(&user_id) else {
            return;
        };
        for handle in handles {
            if handle.tx.send(frame.clone()).is_err() {
                tracing::debug!(
                    user_id = %user_id,
                    connection_id = %handle.id,
                    "skipping send to closed connection"
                );
            }
        }
    }

    /// Enqueue a frame on one specific connection of an identity
    pub fn send_to_connection(&self, user_id: Uuid, connection_id: &str, frame: ServerFrame) {
        let Some(handles) = self.connections.get(&user_id) else {
            return;
        };
        if let Some(handle) = handles.iter().find(|h| h.id == connection_id)
            && handle.tx.send(frame).is_err()
        {
            tracing::debug!(
                user_id = %user_id,
                connection_id = %connection_id,
                "skipping send to closed connection"
            );
        }
    }

    pub fn is_online(&self, user_id: Uuid) -> bool {
        self.connections.contains_key(&user_id)
    }

    pub fn connection_count(&self, user_id: Uuid) -> usize {
        self.connections.get(&user_id).map_or(0, Vec::len)
    }

    /// Identities with at least one open connection
    pub fn connected_users(&self) -> Vec<Uuid> {
        self.connections.keys().copied().collect()
    }

    pub fn identity_count(&self) -> usize {
        self.connections.len()
    }

    pub fn total_connections(&self) -> usize {
        self.connections.values().map(Vec::len).sum()
    }
}
