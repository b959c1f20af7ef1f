use super::messages::ProgressEvent;
use crate::session::SessionId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use tracing::debug;

/// Identifies one subscribed connection inside a room
pub type ConnectionId = u64;

type Room = HashMap<ConnectionId, mpsc::UnboundedSender<ProgressEvent>>;

/// Per-session publish/subscribe.
///
/// Delivery is fire-and-forget: events published to an empty room are
/// dropped, and a connection that joins late never sees earlier events.
#[derive(Clone, Default)]
pub struct Broadcaster {
    rooms: Arc<Mutex<HashMap<SessionId, Room>>>,
    next_connection: Arc<AtomicU64>,
}

/// A connection's membership in a room, plus the events routed to it
pub struct Subscription {
    pub session_id: SessionId,
    pub connection_id: ConnectionId,
    pub events: mpsc::UnboundedReceiver<ProgressEvent>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Join `session_id`'s room
    pub fn subscribe(&self, session_id: SessionId) -> Subscription {
        let connection_id = self.next_connection.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();

        self.lock()
            .entry(session_id)
            .or_default()
            .insert(connection_id, tx);

        debug!("Connection {} joined room {}", connection_id, session_id);

        Subscription {
            session_id,
            connection_id,
            events: rx,
        }
    }

    /// Leave a room; empty rooms are dropped
    pub fn unsubscribe(&self, session_id: SessionId, connection_id: ConnectionId) {
        let mut rooms = self.lock();
        if let Some(room) = rooms.get_mut(&session_id) {
            room.remove(&connection_id);
            if room.is_empty() {
                rooms.remove(&session_id);
            }
        }
        debug!("Connection {} left room {}", connection_id, session_id);
    }

    /// Deliver `event` to every current member of the room.
    ///
    /// Returns the number of connections that received it.
    pub fn publish(&self, session_id: SessionId, event: ProgressEvent) -> usize {
        let mut rooms = self.lock();
        let Some(room) = rooms.get_mut(&session_id) else {
            return 0;
        };

        // Receivers dropped without unsubscribing are pruned here
        room.retain(|_, tx| tx.send(event.clone()).is_ok());
        let delivered = room.len();
        if room.is_empty() {
            rooms.remove(&session_id);
        }
        delivered
    }

    pub fn subscriber_count(&self, session_id: SessionId) -> usize {
        self.lock().get(&session_id).map_or(0, HashMap::len)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SessionId, Room>> {
        // A poisoned map is still structurally valid
        self.rooms.lock().unwrap_or_else(|e| e.into_inner())
    }
}
