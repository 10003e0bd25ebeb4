//! Outbound half of a peer's `WebSocket`.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use rendezvous_core::ServerMessage;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Handle used to write to one peer's socket.
///
/// Frames go through a bounded queue drained by the session's writer task.
/// Sending never blocks: a full or closed queue drops the frame.
pub struct PeerConnection {
    tx: mpsc::Sender<Arc<String>>,
    terminate: CancellationToken,
    dropped_messages: AtomicU64,
}

impl PeerConnection {
    /// Wrap the sending side of a session's outbound queue.
    pub fn new(tx: mpsc::Sender<Arc<String>>) -> Self {
        Self {
            tx,
            terminate: CancellationToken::new(),
            dropped_messages: AtomicU64::new(0),
        }
    }

    /// Whether frames can still be delivered.
    pub fn is_open(&self) -> bool {
        !self.terminate.is_cancelled() && !self.tx.is_closed()
    }

    /// Enqueue a text frame.
    ///
    /// Returns `false` if the connection is not open or the queue is full,
    /// and increments the dropped message counter.
    pub fn send(&self, text: Arc<String>) -> bool {
        if self.is_open() && self.tx.try_send(text).is_ok() {
            true
        } else {
            let _ = self.dropped_messages.fetch_add(1, Ordering::Relaxed);
            false
        }
    }

    /// Serialize and enqueue a server message.
    pub fn send_message(&self, message: &ServerMessage) -> bool {
        match message.to_json() {
            Ok(json) => self.send(Arc::new(json)),
            Err(error) => {
                warn!(kind = message.kind(), %error, "failed to serialize server message");
                false
            }
        }
    }

    /// Serialize and enqueue an arbitrary JSON value.
    pub fn send_json(&self, value: &serde_json::Value) -> bool {
        match serde_json::to_string(value) {
            Ok(json) => self.send(Arc::new(json)),
            Err(_) => false,
        }
    }

    /// Close the socket. Idempotent.
    pub fn terminate(&self) {
        self.terminate.cancel();
    }

    /// Whether [`terminate`](Self::terminate) has been called.
    pub fn is_terminated(&self) -> bool {
        self.terminate.is_cancelled()
    }

    /// Token cancelled on termination; the session's tasks watch it.
    pub fn termination_token(&self) -> CancellationToken {
        self.terminate.clone()
    }

    /// Total frames dropped for this connection.
    pub fn drop_count(&self) -> u64 {
        self.dropped_messages.load(Ordering::Relaxed)
    }
}
