//! Room registry: peers grouped by origin.
//!
//! Every mutation happens under one lock and never awaits, so admission,
//! removal and routing are atomic with respect to each other. Sends are
//! non-blocking enqueues onto each peer's outbound queue.

use std::collections::HashMap;
use std::sync::Arc;

use metrics::{counter, gauge};
use parking_lot::Mutex;
use rendezvous_core::{OriginKey, PeerId, ServerMessage};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::peer::Peer;
use crate::metrics::{
    FRAMES_DROPPED_TOTAL, FRAMES_RELAYED_TOTAL, PEERS_ACTIVE, PEERS_JOINED_TOTAL,
    PEERS_LEFT_TOTAL, ROOMS_ACTIVE,
};

type Room = HashMap<PeerId, Arc<Peer>>;

/// Result of routing an addressed frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouteOutcome {
    /// The frame was queued for the recipient.
    Delivered,
    /// The sender's origin has no room.
    NoRoom,
    /// No peer with that id in the sender's room.
    UnknownRecipient,
    /// The recipient exists but its connection is closed or backed up.
    RecipientUnavailable,
}

/// All rooms, keyed by origin.
pub struct RoomRegistry {
    rooms: Mutex<HashMap<OriginKey, Room>>,
}

impl RoomRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
        }
    }

    /// Admit a peer into the room of its origin.
    ///
    /// Existing members receive `peer-joined`, then the newcomer receives
    /// `peers` with everyone already present, then it is inserted. A member
    /// already registered under the same id is replaced and its connection
    /// closed without a `peer-left`.
    pub fn admit(&self, peer: &Arc<Peer>) {
        let joined = serialize(&ServerMessage::PeerJoined { peer: peer.info() });

        let mut rooms = self.rooms.lock();
        let room = rooms.entry(peer.origin.clone()).or_default();

        let mut present = Vec::with_capacity(room.len());
        for (id, member) in room.iter() {
            if *id == peer.id {
                continue;
            }
            if let Some(frame) = &joined {
                broadcast(member, frame);
            }
            present.push(member.info());
        }
        let _ = peer.send(&ServerMessage::Peers { peers: present });

        let stale = room.insert(peer.id.clone(), Arc::clone(peer));
        let members = room.len();
        if let Some(stale) = stale.filter(|stale| !Arc::ptr_eq(stale, peer)) {
            info!(peer_id = %peer.id, "replacing stale connection for reconnecting peer");
            stale.cancel_keepalive();
            stale.connection.terminate();
        } else {
            counter!(PEERS_JOINED_TOTAL).increment(1);
        }

        info!(peer_id = %peer.id, origin = %peer.origin, members, "peer joined");
        publish_gauges(&rooms);
    }

    /// Remove a peer and announce its departure.
    ///
    /// No-op unless `peer` is the exact instance registered for its id, so a
    /// replaced connection cannot evict its successor. Returns whether the
    /// peer was removed.
    pub fn remove(&self, peer: &Arc<Peer>) -> bool {
        let mut rooms = self.rooms.lock();
        let Some(room) = rooms.get_mut(&peer.origin) else {
            return false;
        };
        match room.get(&peer.id) {
            Some(current) if Arc::ptr_eq(current, peer) => {}
            _ => return false,
        }

        peer.cancel_keepalive();
        peer.connection.terminate();
        let _ = room.remove(&peer.id);

        if room.is_empty() {
            let _ = rooms.remove(&peer.origin);
            debug!(origin = %peer.origin, "room emptied");
        } else if let Some(frame) = serialize(&ServerMessage::PeerLeft {
            peer_id: peer.id.clone(),
        }) {
            for member in room.values() {
                broadcast(member, &frame);
            }
        }

        counter!(PEERS_LEFT_TOTAL).increment(1);
        info!(peer_id = %peer.id, origin = %peer.origin, "peer left");
        publish_gauges(&rooms);
        true
    }

    /// Deliver a relayed frame to `to` within the sender's room.
    ///
    /// The sender does not need to be a member any more: a peer that just
    /// disconnected can still reach its former roommates.
    pub fn route(&self, sender: &Peer, to: &PeerId, frame: &Value) -> RouteOutcome {
        let recipient = {
            let rooms = self.rooms.lock();
            let Some(room) = rooms.get(&sender.origin) else {
                return RouteOutcome::NoRoom;
            };
            match room.get(to) {
                Some(recipient) => Arc::clone(recipient),
                None => return RouteOutcome::UnknownRecipient,
            }
        };

        if recipient.connection.send_json(frame) {
            counter!(FRAMES_RELAYED_TOTAL).increment(1);
            RouteOutcome::Delivered
        } else {
            counter!(FRAMES_DROPPED_TOTAL).increment(1);
            warn!(sender = %sender.id, recipient = %to, "relay dropped, recipient unavailable");
            RouteOutcome::RecipientUnavailable
        }
    }

    /// The registered peer with this id in this origin's room.
    pub fn lookup(&self, origin: &OriginKey, id: &PeerId) -> Option<Arc<Peer>> {
        self.rooms.lock().get(origin)?.get(id).cloned()
    }

    /// Ids of every member of an origin's room.
    pub fn members(&self, origin: &OriginKey) -> Vec<PeerId> {
        self.rooms
            .lock()
            .get(origin)
            .map(|room| room.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Total peers across all rooms.
    pub fn peer_count(&self) -> usize {
        self.rooms.lock().values().map(HashMap::len).sum()
    }

    /// Number of non-empty rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.lock().len()
    }

    /// Send `disconnect` to every peer, close every connection and clear
    /// all rooms. Used on server shutdown; no `peer-left` is sent.
    pub fn close_all(&self) -> usize {
        let drained: Vec<Arc<Peer>> = {
            let mut rooms = self.rooms.lock();
            let peers: Vec<Arc<Peer>> = rooms.drain().flat_map(|(_, room)| room.into_values()).collect();
            publish_gauges(&rooms);
            peers
        };
        for peer in &drained {
            let _ = peer.send(&ServerMessage::Disconnect);
            peer.cancel_keepalive();
            peer.connection.terminate();
        }
        info!(peers = drained.len(), "closed all peer connections");
        drained.len()
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn broadcast(member: &Peer, frame: &Arc<String>) {
    if !member.connection.send(Arc::clone(frame)) {
        counter!(FRAMES_DROPPED_TOTAL).increment(1);
        debug!(peer_id = %member.id, "room notification dropped");
    }
}

fn serialize(message: &ServerMessage) -> Option<Arc<String>> {
    match message.to_json() {
        Ok(json) => Some(Arc::new(json)),
        Err(error) => {
            warn!(kind = message.kind(), %error, "failed to serialize server message");
            None
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn publish_gauges(rooms: &HashMap<OriginKey, Room>) {
    let peers: usize = rooms.values().map(HashMap::len).sum();
    gauge!(PEERS_ACTIVE).set(peers as f64);
    gauge!(ROOMS_ACTIVE).set(rooms.len() as f64);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::websocket::peer::test_support::{drain, make_peer};
    use metrics_exporter_prometheus::PrometheusBuilder;
    use serde_json::json;

    const ORIGIN: &str = "10.0.0.1";

    fn types(frames: &[Value]) -> Vec<&str> {
        frames.iter().map(|f| f["type"].as_str().unwrap()).collect()
    }

    #[test]
    fn first_peer_gets_empty_list() {
        let registry = RoomRegistry::new();
        let (p1, mut rx1) = make_peer("p1", ORIGIN);
        registry.admit(&p1);

        let frames = drain(&mut rx1);
        assert_eq!(frames, vec![json!({"type": "peers", "peers": []})]);
        assert_eq!(registry.peer_count(), 1);
        assert_eq!(registry.room_count(), 1);
    }

    #[test]
    fn three_peers_join_in_order() {
        let registry = RoomRegistry::new();
        let (p1, mut rx1) = make_peer("p1", ORIGIN);
        let (p2, mut rx2) = make_peer("p2", ORIGIN);
        let (p3, mut rx3) = make_peer("p3", ORIGIN);

        registry.admit(&p1);
        registry.admit(&p2);
        registry.admit(&p3);

        let f1 = drain(&mut rx1);
        assert_eq!(types(&f1), ["peers", "peer-joined", "peer-joined"]);
        assert_eq!(f1[1]["peer"]["id"], "p2");
        assert_eq!(f1[2]["peer"]["id"], "p3");

        let f2 = drain(&mut rx2);
        assert_eq!(types(&f2), ["peers", "peer-joined"]);
        assert_eq!(f2[0]["peers"], json!([serde_json::to_value(p1.info()).unwrap()]));
        assert_eq!(f2[1]["peer"]["id"], "p3");

        let f3 = drain(&mut rx3);
        assert_eq!(types(&f3), ["peers"]);
        let mut ids: Vec<&str> = f3[0]["peers"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["id"].as_str().unwrap())
            .collect();
        ids.sort_unstable();
        assert_eq!(ids, ["p1", "p2"]);
    }

    #[test]
    fn peer_info_never_leaks_origin() {
        let registry = RoomRegistry::new();
        let (p1, mut rx1) = make_peer("p1", ORIGIN);
        let (p2, _rx2) = make_peer("p2", ORIGIN);
        registry.admit(&p1);
        registry.admit(&p2);

        let frames = drain(&mut rx1);
        let peer = frames[1]["peer"].as_object().unwrap();
        let mut keys: Vec<&str> = peer.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, ["id", "name", "rtcSupported"]);
    }

    #[test]
    fn origins_are_isolated() {
        let registry = RoomRegistry::new();
        let (a, mut rx_a) = make_peer("a", "10.0.0.1");
        let (b, mut rx_b) = make_peer("b", "10.0.0.2");
        registry.admit(&a);
        registry.admit(&b);

        assert_eq!(types(&drain(&mut rx_a)), ["peers"]);
        assert_eq!(drain(&mut rx_b), vec![json!({"type": "peers", "peers": []})]);
        assert_eq!(registry.room_count(), 2);
    }

    #[test]
    fn remove_announces_and_terminates() {
        let registry = RoomRegistry::new();
        let (p1, _rx1) = make_peer("p1", ORIGIN);
        let (p2, mut rx2) = make_peer("p2", ORIGIN);
        registry.admit(&p1);
        registry.admit(&p2);
        let _ = drain(&mut rx2);

        assert!(registry.remove(&p1));
        assert!(p1.connection.is_terminated());
        assert!(p1.keepalive_token().is_cancelled());
        assert_eq!(drain(&mut rx2), vec![json!({"type": "peer-left", "peerId": "p1"})]);
        assert_eq!(registry.members(&OriginKey::from(ORIGIN)), vec![PeerId::from("p2")]);
    }

    #[test]
    fn remove_last_peer_deletes_room() {
        let registry = RoomRegistry::new();
        let (p1, _rx1) = make_peer("p1", ORIGIN);
        registry.admit(&p1);

        assert!(registry.remove(&p1));
        assert_eq!(registry.room_count(), 0);
        assert_eq!(registry.peer_count(), 0);

        let (p2, mut rx2) = make_peer("p2", ORIGIN);
        registry.admit(&p2);
        assert_eq!(drain(&mut rx2), vec![json!({"type": "peers", "peers": []})]);
        assert_eq!(registry.members(&OriginKey::from(ORIGIN)), vec![PeerId::from("p2")]);
    }

    #[test]
    fn undeliverable_notifications_are_counted() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        metrics::with_local_recorder(&recorder, || {
            let registry = RoomRegistry::new();
            let (gone, gone_rx) = make_peer("gone", ORIGIN);
            let (p1, _rx1) = make_peer("p1", ORIGIN);
            registry.admit(&gone);
            drop(gone_rx);

            registry.admit(&p1);
            assert!(registry.remove(&p1));
        });
        assert!(handle.render().contains("frames_dropped_total 2"));
    }

    #[test]
    fn remove_twice_is_noop() {
        let registry = RoomRegistry::new();
        let (p1, _rx1) = make_peer("p1", ORIGIN);
        let (p2, mut rx2) = make_peer("p2", ORIGIN);
        registry.admit(&p1);
        registry.admit(&p2);
        let _ = drain(&mut rx2);

        assert!(registry.remove(&p1));
        assert!(!registry.remove(&p1));
        assert_eq!(drain(&mut rx2).len(), 1);
    }

    #[test]
    fn remove_unknown_peer_is_noop() {
        let registry = RoomRegistry::new();
        let (p1, _rx1) = make_peer("p1", ORIGIN);
        assert!(!registry.remove(&p1));
        assert!(!p1.connection.is_terminated());
    }

    #[test]
    fn reconnect_replaces_stale_peer_silently() {
        let registry = RoomRegistry::new();
        let (old, _old_rx) = make_peer("p1", ORIGIN);
        let (other, mut other_rx) = make_peer("p2", ORIGIN);
        let (fresh, mut fresh_rx) = make_peer("p1", ORIGIN);
        registry.admit(&old);
        registry.admit(&other);
        let _ = drain(&mut other_rx);

        registry.admit(&fresh);

        assert!(old.connection.is_terminated());
        assert!(old.keepalive_token().is_cancelled());
        let fresh_frames = drain(&mut fresh_rx);
        assert_eq!(fresh_frames[0]["peers"].as_array().unwrap().len(), 1);
        assert_eq!(fresh_frames[0]["peers"][0]["id"], "p2");
        assert_eq!(types(&drain(&mut other_rx)), ["peer-joined"]);

        // the stale instance can no longer evict its successor
        assert!(!registry.remove(&old));
        assert!(Arc::ptr_eq(
            &registry.lookup(&OriginKey::from(ORIGIN), &PeerId::from("p1")).unwrap(),
            &fresh
        ));
    }

    #[test]
    fn route_delivers_within_room() {
        let registry = RoomRegistry::new();
        let (p1, _rx1) = make_peer("p1", ORIGIN);
        let (p2, mut rx2) = make_peer("p2", ORIGIN);
        registry.admit(&p1);
        registry.admit(&p2);
        let _ = drain(&mut rx2);

        let frame = json!({"type": "signal", "sender": "p1"});
        let outcome = registry.route(&p1, &PeerId::from("p2"), &frame);
        assert_eq!(outcome, RouteOutcome::Delivered);
        assert_eq!(drain(&mut rx2), vec![frame]);
    }

    #[test]
    fn route_across_origins_is_unknown() {
        let registry = RoomRegistry::new();
        let (a, _rx_a) = make_peer("a", "10.0.0.1");
        let (b, mut rx_b) = make_peer("b", "10.0.0.2");
        registry.admit(&a);
        registry.admit(&b);
        let _ = drain(&mut rx_b);

        let outcome = registry.route(&a, &PeerId::from("b"), &json!({"type": "x"}));
        assert_eq!(outcome, RouteOutcome::UnknownRecipient);
        assert!(drain(&mut rx_b).is_empty());
    }

    #[test]
    fn route_without_room() {
        let registry = RoomRegistry::new();
        let (lonely, _rx) = make_peer("p1", ORIGIN);
        let outcome = registry.route(&lonely, &PeerId::from("p2"), &json!({}));
        assert_eq!(outcome, RouteOutcome::NoRoom);
    }

    #[test]
    fn route_to_closed_recipient() {
        let registry = RoomRegistry::new();
        let (p1, _rx1) = make_peer("p1", ORIGIN);
        let (p2, rx2) = make_peer("p2", ORIGIN);
        registry.admit(&p1);
        registry.admit(&p2);
        drop(rx2);

        let outcome = registry.route(&p1, &PeerId::from("p2"), &json!({}));
        assert_eq!(outcome, RouteOutcome::RecipientUnavailable);
    }

    #[test]
    fn close_all_disconnects_everyone() {
        let registry = RoomRegistry::new();
        let (a, mut rx_a) = make_peer("a", "10.0.0.1");
        let (b, mut rx_b) = make_peer("b", "10.0.0.2");
        registry.admit(&a);
        registry.admit(&b);
        let _ = drain(&mut rx_a);
        let _ = drain(&mut rx_b);

        assert_eq!(registry.close_all(), 2);
        assert_eq!(registry.peer_count(), 0);
        assert_eq!(registry.room_count(), 0);
        assert_eq!(drain(&mut rx_a), vec![json!({"type": "disconnect"})]);
        assert!(a.connection.is_terminated());
        assert!(b.connection.is_terminated());
    }
}
