//! Fire-and-forget presence persistence
//!
//! Presence writes are best-effort: the hub hands each update to a bounded
//! channel and moves on. A dedicated writer task drains the channel and calls
//! the [`PresenceStore`] collaborator, logging failures without retrying.
//! A full queue drops the update rather than applying backpressure to the
//! delivery path.

use super::{PresenceStatus, PresenceStore};
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

/// One presence change to persist
#[derive(Debug, Clone)]
pub struct PresenceUpdate {
    pub user_id: Uuid,
    pub room_id: String,
    pub status: PresenceStatus,
}

/// Handle used by the hub to enqueue presence updates
///
/// Cheap to clone. A hub built without a presence store gets a disabled
/// writer whose `record` is a no-op.
#[derive(Clone)]
pub struct PresenceWriter {
    tx: Option<mpsc::Sender<PresenceUpdate>>,
}

impl PresenceWriter {
    /// Writer that discards every update (no store configured)
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Spawn the writer task and return a handle feeding it
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(store: Arc<dyn PresenceStore>, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        tokio::spawn(run_writer_loop(store, rx));
        Self { tx: Some(tx) }
    }

    /// Enqueue an update without waiting
    pub fn record(&self, update: PresenceUpdate) {
        let Some(tx) = &self.tx else {
            return;
        };
        if let Err(e) = tx.try_send(update) {
            tracing::warn!(error = %e, "presence update dropped");
        }
    }
}

/// Drain the queue until every sender is gone
///
/// A failing store call is logged and skipped; the loop itself never dies
/// from a collaborator error.
async fn run_writer_loop(store: Arc<dyn PresenceStore>, mut rx: mpsc::Receiver<PresenceUpdate>) {
    tracing::debug!("presence writer started");

    while let Some(update) = rx.recv().await {
        if let Err(e) = store
            .persist(update.user_id, &update.room_id, update.status)
            .await
        {
            tracing::warn!(
                user_id = %update.user_id,
                room_id = %update.room_id,
                error = %e,
                "presence persist failed"
            );
        }
    }

    tracing::debug!("presence writer stopped");
}
