//! Wire protocol: server-originated messages and inbound client frames.
//!
//! Every frame is a JSON object. Server messages carry a `type` from a closed
//! set; client frames are opaque except for the optional `type` and `to`
//! fields, which drive control handling and relay.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::device::DeviceName;
use crate::errors::FrameError;
use crate::ids::PeerId;

/// Information about a peer visible to its roommates.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerInfo {
    /// Peer id, used as the relay address.
    pub id: PeerId,
    /// Device descriptor including the display name.
    pub name: DeviceName,
    /// Whether the client can open direct WebRTC connections.
    pub rtc_supported: bool,
}

/// Payload of the `display-name` message sent to a newly admitted peer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayNameInfo {
    /// Deterministic display name.
    pub display_name: String,
    /// Composed device label.
    pub device_name: String,
}

/// Messages the server originates.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// Tells a peer how it appears to others.
    DisplayName {
        /// Name details.
        message: DisplayNameInfo,
    },
    /// A new peer entered the room.
    PeerJoined {
        /// The newcomer.
        peer: PeerInfo,
    },
    /// Room membership at the moment of admission, excluding the recipient.
    Peers {
        /// Pre-existing members.
        peers: Vec<PeerInfo>,
    },
    /// A member left the room.
    PeerLeft {
        /// Id of the departed peer.
        #[serde(rename = "peerId")]
        peer_id: PeerId,
    },
    /// Server-initiated disconnect notice.
    Disconnect,
    /// Liveness probe; clients answer with `pong`.
    Ping,
    /// Liveness answer.
    Pong,
}

impl ServerMessage {
    /// Wire `type` string of this message.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DisplayName { .. } => "display-name",
            Self::PeerJoined { .. } => "peer-joined",
            Self::Peers { .. } => "peers",
            Self::PeerLeft { .. } => "peer-left",
            Self::Disconnect => "disconnect",
            Self::Ping => "ping",
            Self::Pong => "pong",
        }
    }

    /// Serialize to a JSON text frame.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Control `type` values the server acts on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Control {
    /// The client is leaving.
    Disconnect,
    /// Answer to a liveness probe.
    Pong,
}

/// A parsed client frame.
#[derive(Clone, Debug, PartialEq)]
pub struct InboundFrame {
    fields: Map<String, Value>,
}

impl InboundFrame {
    /// Parse a text frame. Anything but a JSON object is rejected.
    pub fn parse(text: &str) -> Result<Self, FrameError> {
        match serde_json::from_str::<Value>(text)? {
            Value::Object(fields) => Ok(Self { fields }),
            _ => Err(FrameError::NotAnObject),
        }
    }

    /// The raw `type` field, when it is a string.
    pub fn kind(&self) -> Option<&str> {
        self.fields.get("type").and_then(Value::as_str)
    }

    /// The control action requested by this frame, if any.
    pub fn control(&self) -> Option<Control> {
        match self.kind()? {
            "disconnect" => Some(Control::Disconnect),
            "pong" => Some(Control::Pong),
            _ => None,
        }
    }

    /// Relay target from the `to` field. Non-string values count as absent.
    pub fn recipient(&self) -> Option<PeerId> {
        self.fields
            .get("to")
            .and_then(Value::as_str)
            .filter(|to| !to.is_empty())
            .map(PeerId::from)
    }

    /// Rewrite for delivery: drop `to`, stamp `sender`, keep everything else.
    pub fn into_relayed(mut self, sender: &PeerId) -> Value {
        let _ = self.fields.remove("to");
        let _ = self
            .fields
            .insert("sender".into(), Value::String(sender.to_string()));
        Value::Object(self.fields)
    }
}
