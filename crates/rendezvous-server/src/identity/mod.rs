//! Peer identity: id cookie, origin and device descriptor.

pub mod user_agent;

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use rendezvous_core::naming::display_name_for;
use rendezvous_core::{DeviceClassification, DeviceName, NameGenerator, OriginKey, PeerId};

pub use user_agent::classify;

/// Cookie carrying a peer's persistent id.
pub const PEER_ID_COOKIE: &str = "peerid";

/// Request metadata gathered during the `WebSocket` handshake.
#[derive(Clone, Debug)]
pub struct PeerHandshake {
    /// Id from the cookie, or freshly minted.
    pub peer_id: PeerId,
    /// Raw `X-Forwarded-For` value, if trusted and present.
    pub forwarded_for: Option<String>,
    /// Socket remote address.
    pub remote_addr: String,
    /// Whether the client can open direct WebRTC connections.
    pub rtc_supported: bool,
    /// User-agent classification.
    pub device: DeviceClassification,
}

/// A fully resolved identity, ready to become a peer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PeerIdentity {
    /// Relay address.
    pub id: PeerId,
    /// Discovery scope.
    pub origin: OriginKey,
    /// Device descriptor including the display name.
    pub name: DeviceName,
    /// Whether the client can open direct WebRTC connections.
    pub rtc_supported: bool,
}

impl PeerHandshake {
    /// Derive origin, display name and device name.
    pub fn resolve(self, names: &dyn NameGenerator) -> PeerIdentity {
        let origin = OriginKey::resolve(self.forwarded_for.as_deref(), &self.remote_addr);
        let display_name = display_name_for(&self.peer_id, names);
        PeerIdentity {
            name: DeviceName::new(self.device, display_name),
            id: self.peer_id,
            origin,
            rtc_supported: self.rtc_supported,
        }
    }
}

/// Read the peer id cookie, minting and setting one when absent.
pub fn resolve_peer_id(jar: CookieJar) -> (CookieJar, PeerId) {
    if let Some(id) = jar
        .get(PEER_ID_COOKIE)
        .map(Cookie::value)
        .filter(|value| !value.is_empty())
    {
        let id = PeerId::from(id);
        return (jar, id);
    }

    let id = PeerId::generate();
    let cookie = Cookie::build((PEER_ID_COOKIE, id.to_string()))
        .same_site(SameSite::Strict)
        .secure(true);
    (jar.add(cookie), id)
}

/// Whether the upgrade path advertises WebRTC support.
pub fn rtc_supported(path: &str) -> bool {
    path.contains("webrtc")
}
