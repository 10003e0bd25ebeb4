//! Application-level liveness probes.
//!
//! Each admitted peer gets one task that, once per probe interval, either
//! evicts the peer (no `pong` for more than two intervals) or sends it a
//! `ping`. A `pong` only refreshes the peer's timestamp; it never reschedules
//! the cycle, so a silent peer is evicted between two and three intervals
//! after its last sign of life.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use rendezvous_core::ServerMessage;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::peer::Peer;
use super::rooms::RoomRegistry;
use crate::metrics::PEERS_EVICTED_TOTAL;

/// Outcome of a keepalive loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeepaliveResult {
    /// The peer went silent and was removed.
    Evicted,
    /// The peer was removed by something else.
    Cancelled,
}

/// Spawns keepalive loops against a shared registry.
#[derive(Clone)]
pub struct LivenessSupervisor {
    registry: Arc<RoomRegistry>,
    interval: Duration,
}

impl LivenessSupervisor {
    /// Create a supervisor probing every `interval`.
    pub fn new(registry: Arc<RoomRegistry>, interval: Duration) -> Self {
        Self { registry, interval }
    }

    /// Start probing `peer`. The loop ends when the peer's keepalive token
    /// is cancelled, which removal always does.
    pub fn watch(&self, peer: Arc<Peer>) -> JoinHandle<KeepaliveResult> {
        let registry = Arc::clone(&self.registry);
        let interval = self.interval;
        tokio::spawn(async move { run_keepalive(peer, registry, interval).await })
    }
}

/// Run the probe cycle for one peer.
pub async fn run_keepalive(
    peer: Arc<Peer>,
    registry: Arc<RoomRegistry>,
    interval: Duration,
) -> KeepaliveResult {
    let cancel = peer.keepalive_token();
    let deadline = interval.saturating_mul(2);

    loop {
        if cancel.is_cancelled() {
            return KeepaliveResult::Cancelled;
        }

        let silent_for = peer.since_last_beat();
        if silent_for > deadline {
            info!(peer_id = %peer.id, silent_secs = silent_for.as_secs(), "evicting unresponsive peer");
            if registry.remove(&peer) {
                counter!(PEERS_EVICTED_TOTAL).increment(1);
            }
            return KeepaliveResult::Evicted;
        }

        if !peer.send(&ServerMessage::Ping) {
            debug!(peer_id = %peer.id, "ping not queued");
        }

        tokio::select! {
            () = tokio::time::sleep(interval) => {}
            () = cancel.cancelled() => return KeepaliveResult::Cancelled,
        }
    }
}
