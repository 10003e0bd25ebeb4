//! Inbound frame handling: control messages and relay.

use std::sync::Arc;

use rendezvous_core::{Control, InboundFrame};
use tracing::{debug, instrument};

use super::peer::Peer;
use super::rooms::{RoomRegistry, RouteOutcome};

/// What handling a frame did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HandleResult {
    /// Control action recognized in the frame, if any.
    pub control: Option<Control>,
    /// The sender was removed from its room by this frame.
    pub removed: bool,
    /// Relay outcome when the frame was addressed.
    pub route: Option<RouteOutcome>,
}

/// Handle one text frame from `sender`.
///
/// `disconnect` removes the sender, `pong` refreshes its liveness. Any frame
/// with a string `to` is then relayed within the sender's room with `to`
/// stripped and `sender` stamped. Both effects are independent: a
/// `disconnect` addressed to a roommate is still delivered. Frames that are
/// not JSON objects are dropped.
#[instrument(skip_all, fields(peer_id = %sender.id))]
pub fn handle_frame(text: &str, sender: &Arc<Peer>, registry: &RoomRegistry) -> HandleResult {
    let frame = match InboundFrame::parse(text) {
        Ok(frame) => frame,
        Err(error) => {
            debug!(%error, len = text.len(), "dropping malformed frame");
            return HandleResult::default();
        }
    };

    let mut result = HandleResult {
        control: frame.control(),
        ..HandleResult::default()
    };

    match result.control {
        Some(Control::Disconnect) => {
            debug!("peer requested disconnect");
            result.removed = registry.remove(sender);
        }
        Some(Control::Pong) => sender.mark_alive(),
        None => {}
    }

    if let Some(to) = frame.recipient() {
        let relayed = frame.into_relayed(&sender.id);
        let outcome = registry.route(sender, &to, &relayed);
        if outcome != RouteOutcome::Delivered {
            debug!(recipient = %to, ?outcome, "frame not relayed");
        }
        result.route = Some(outcome);
    }

    result
}
