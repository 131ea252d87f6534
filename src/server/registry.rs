use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::debug;

pub type ConnectionId = u64;

/// Handle to one live client connection.
///
/// All writes go through `sender`; the receiving end is owned by a single
/// writer task per connection, so concurrent producers never interleave
/// frames on the wire.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    pub id: ConnectionId,
    pub peer: SocketAddr,
    pub sender: mpsc::Sender<WsMessage>,
}

/// The set of currently-open connections, shared between the accept loop and
/// the broadcast engine.
pub struct ConnectionRegistry {
    connections: Mutex<HashMap<ConnectionId, ConnectionHandle>>,
    next_id: AtomicU64,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Allocate the id for a connection about to be registered.
    pub fn allocate_id(&self) -> ConnectionId {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Idempotent: registering the same handle twice keeps one entry.
    pub fn register(&self, handle: ConnectionHandle) {
        let id = handle.id;
        self.connections.lock().unwrap().insert(id, handle);
        debug!(connection = id, "Connection registered");
    }

    /// Idempotent: unregistering an absent id is a no-op.
    pub fn unregister(&self, id: ConnectionId) {
        self.connections.lock().unwrap().remove(&id);
        debug!(connection = id, "Connection unregistered");
    }

    /// Point-in-time copy of the registered set, so iteration (e.g. a
    /// broadcast) never holds the registry lock during socket I/O.
    pub fn snapshot(&self) -> Vec<ConnectionHandle> {
        self.connections.lock().unwrap().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.connections.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
