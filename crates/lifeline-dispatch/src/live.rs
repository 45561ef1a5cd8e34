//! Live state fan-out.
//!
//! [`LiveHub`] owns a bounded [`broadcast`] channel of full-collection
//! snapshots. Every mutation calls [`LiveHub::broadcast_all`], which
//! re-reads the whole collection from the store and publishes it. Failures
//! are logged and swallowed: a broken observer or a failed re-read never
//! reaches the code that mutated the state.
//!
//! If an observer falls behind by more than [`BROADCAST_CAPACITY`]
//! snapshots it receives `RecvError::Lagged` and skips ahead, which is
//! harmless since every message is a complete snapshot.

use lifeline_db::Store;
use lifeline_types::{EntityKind, LiveMessage};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::error::DispatchError;

/// Capacity of the snapshot channel.
pub const BROADCAST_CAPACITY: usize = 256;

/// Publisher of live snapshots. Clones share the same channel.
#[derive(Debug, Clone)]
pub struct LiveHub {
    tx: broadcast::Sender<LiveMessage>,
    store: Store,
}

impl LiveHub {
    /// Create a hub reading snapshots from `store`.
    pub fn new(store: Store) -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self { tx, store }
    }

    /// Subscribe to the snapshot stream.
    pub fn subscribe(&self) -> broadcast::Receiver<LiveMessage> {
        self.tx.subscribe()
    }

    /// Number of live observers.
    pub fn connection_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Re-read the whole `kind` collection and push it to every observer.
    ///
    /// Returns the number of observers the snapshot was queued for.
    pub async fn broadcast_all(&self, kind: EntityKind) -> usize {
        // Nobody is listening: skip the query.
        if self.tx.receiver_count() == 0 {
            return 0;
        }

        let data = match self.snapshot(kind).await {
            Ok(data) => data,
            Err(e) => {
                warn!(kind = %kind, error = %e, "Failed to build live snapshot");
                return 0;
            }
        };

        // send only fails when the last receiver dropped in the meantime.
        let receivers = self.tx.send(LiveMessage { kind, data }).unwrap_or(0);
        debug!(kind = %kind, receivers, "Broadcast live snapshot");
        receivers
    }

    /// The current contents of one collection as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] if the store read or serialization fails.
    pub async fn snapshot(&self, kind: EntityKind) -> Result<serde_json::Value, DispatchError> {
        let value = match kind {
            EntityKind::Units => serde_json::to_value(self.store.list_units().await?)?,
            EntityKind::Events => serde_json::to_value(self.store.list_events(None).await?)?,
            EntityKind::Cameras => serde_json::to_value(self.store.list_cameras().await?)?,
        };
        Ok(value)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use chrono::Utc;
    use lifeline_types::{Coordinates, Unit};

    use super::*;

    #[tokio::test]
    async fn snapshot_reflects_store_at_call_time() {
        let store = Store::memory();
        let hub = LiveHub::new(store.clone());
        let mut rx = hub.subscribe();

        let unit = Unit::idle_at(Coordinates::new(40.0, -79.0), Utc::now());
        store.insert_unit(&unit).await.unwrap();
        assert_eq!(hub.broadcast_all(EntityKind::Units).await, 1);

        let msg = rx.recv().await.unwrap();
        assert_eq!(msg.kind, EntityKind::Units);
        let data = msg.data.as_array().unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data.first().unwrap()["id"], unit.id.to_string());
        assert_eq!(data.first().unwrap()["status"], "idle");
    }

    #[tokio::test]
    async fn no_observers_is_not_an_error() {
        let hub = LiveHub::new(Store::memory());
        assert_eq!(hub.connection_count(), 0);
        assert_eq!(hub.broadcast_all(EntityKind::Events).await, 0);
    }

    #[tokio::test]
    async fn counts_connections() {
        let hub = LiveHub::new(Store::memory());
        let a = hub.subscribe();
        let b = hub.subscribe();
        assert_eq!(hub.connection_count(), 2);
        drop(a);
        assert_eq!(hub.connection_count(), 1);
        drop(b);
        assert_eq!(hub.connection_count(), 0);
    }
}
