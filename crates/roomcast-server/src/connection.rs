//! WebSocket client connection state.

use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicU64, Ordering},
};

use roomcast_core::ConnectionId;
use tokio::sync::{mpsc, watch};

/// Outbound side of one connected client.
///
/// The driver's actions are executed against this handle: frames are queued
/// on a bounded channel drained by the connection's writer task, so a slow
/// client never blocks delivery to anyone else.
pub struct ClientConnection {
    /// Connection ID assigned at accept time
    pub id: ConnectionId,
    /// Send channel to the client's WebSocket write task
    tx: mpsc::Sender<Arc<str>>,
    /// Whether the client has responded since the last ping
    is_alive: AtomicBool,
    /// Count of messages dropped due to a full or closed channel
    dropped_messages: AtomicU64,
    /// Flips to `true` once the server decides to close the connection
    closed: watch::Sender<bool>,
}

impl ClientConnection {
    /// Create a new connection handle.
    pub fn new(id: ConnectionId, tx: mpsc::Sender<Arc<str>>) -> Self {
        let (closed, _) = watch::channel(false);
        Self {
            id,
            tx,
            is_alive: AtomicBool::new(true),
            dropped_messages: AtomicU64::new(0),
            closed,
        }
    }

    /// Queue a text frame for the client.
    ///
    /// Returns `false` if the channel is full or closed, and increments the
    /// dropped message counter.
    pub fn send(&self, message: Arc<str>) -> bool {
        if self.is_closed() {
            return false;
        }

        if self.tx.try_send(message).is_ok() {
            true
        } else {
            self.dropped_messages.fetch_add(1, Ordering::Relaxed);
            false
        }
    }

    /// Total messages dropped for this connection.
    pub fn drop_count(&self) -> u64 {
        self.dropped_messages.load(Ordering::Relaxed)
    }

    /// Mark the connection as alive (pong or any frame received).
    pub fn mark_alive(&self) {
        self.is_alive.store(true, Ordering::Relaxed);
    }

    /// Check and reset the alive flag for the heartbeat.
    ///
    /// Returns `true` if the connection was alive since the last check.
    pub fn check_alive(&self) -> bool {
        self.is_alive.swap(false, Ordering::Relaxed)
    }

    /// Ask the reader and writer tasks to shut down.
    pub fn close(&self) {
        self.closed.send_replace(true);
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    /// Resolves once the connection is closed.
    pub async fn closed(&self) {
        let mut rx = self.closed.subscribe();
        let _ = rx.wait_for(|closed| *closed).await;
    }
}

impl std::fmt::Debug for ClientConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConnection")
            .field("id", &self.id)
            .field("closed", &self.is_closed())
            .field("dropped_messages", &self.drop_count())
            .finish()
    }
}
