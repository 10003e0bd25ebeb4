//! A connected, identified peer.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rendezvous_core::{DeviceName, DisplayNameInfo, OriginKey, PeerId, PeerInfo, ServerMessage};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::connection::PeerConnection;
use crate::identity::PeerIdentity;

/// A peer admitted (or about to be admitted) to a room.
pub struct Peer {
    /// Relay address of this peer.
    pub id: PeerId,
    /// Discovery scope.
    pub origin: OriginKey,
    /// Device descriptor shown to roommates.
    pub name: DeviceName,
    /// Whether the client can open direct WebRTC connections.
    pub rtc_supported: bool,
    /// Outbound socket handle.
    pub connection: PeerConnection,
    /// When the session was established.
    pub connected_at: Instant,
    last_beat: Mutex<Instant>,
    keepalive: CancellationToken,
}

impl Peer {
    /// Build a peer around a resolved identity and its outbound queue.
    pub fn new(identity: PeerIdentity, tx: mpsc::Sender<Arc<String>>) -> Self {
        let now = Instant::now();
        Self {
            id: identity.id,
            origin: identity.origin,
            name: identity.name,
            rtc_supported: identity.rtc_supported,
            connection: PeerConnection::new(tx),
            connected_at: now,
            last_beat: Mutex::new(now),
            keepalive: CancellationToken::new(),
        }
    }

    /// Public view sent to roommates.
    pub fn info(&self) -> PeerInfo {
        PeerInfo {
            id: self.id.clone(),
            name: self.name.clone(),
            rtc_supported: self.rtc_supported,
        }
    }

    /// The `display-name` greeting for this peer.
    pub fn display_name_message(&self) -> ServerMessage {
        ServerMessage::DisplayName {
            message: DisplayNameInfo {
                display_name: self.name.display_name.clone(),
                device_name: self.name.device_name.clone(),
            },
        }
    }

    /// Record a `pong`.
    pub fn mark_alive(&self) {
        *self.last_beat.lock() = Instant::now();
    }

    /// Time since the last `pong` (or since connecting).
    pub fn since_last_beat(&self) -> Duration {
        self.last_beat.lock().elapsed()
    }

    /// Token that stops this peer's keepalive loop.
    pub fn keepalive_token(&self) -> CancellationToken {
        self.keepalive.clone()
    }

    /// Stop the keepalive loop. Idempotent.
    pub fn cancel_keepalive(&self) {
        self.keepalive.cancel();
    }

    /// Send a server message to this peer.
    pub fn send(&self, message: &ServerMessage) -> bool {
        self.connection.send_message(message)
    }
}
