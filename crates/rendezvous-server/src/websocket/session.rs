//! Peer session lifecycle: one connected client from upgrade through
//! disconnect.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use metrics::{counter, histogram};
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use super::keepalive::LivenessSupervisor;
use super::peer::Peer;
use super::rooms::RoomRegistry;
use super::router::handle_frame;
use crate::identity::PeerIdentity;
use crate::metrics::{WS_CONNECTIONS_TOTAL, WS_CONNECTION_DURATION_SECONDS};

/// How long a terminated session may spend flushing queued frames.
const FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

/// Run a session for an upgraded socket.
///
/// 1. Admits the peer into its room and starts its keepalive loop
/// 2. Sends the `display-name` greeting
/// 3. Forwards queued outbound frames to the socket
/// 4. Hands every inbound text frame to the router
/// 5. Removes the peer on a clean close
///
/// A read error only ends the loop; the keepalive evicts the peer later.
#[instrument(skip_all, fields(peer_id = %identity.id, origin = %identity.origin))]
pub async fn run_peer_session(
    ws: WebSocket,
    identity: PeerIdentity,
    registry: Arc<RoomRegistry>,
    supervisor: LivenessSupervisor,
    outbound_buffer: usize,
) {
    let (mut ws_tx, mut ws_rx) = ws.split();
    let (send_tx, mut send_rx) = mpsc::channel::<Arc<String>>(outbound_buffer);
    let peer = Arc::new(Peer::new(identity, send_tx));
    let terminated = peer.connection.termination_token();

    info!(rtc_supported = peer.rtc_supported, device = %peer.name.device_name, "peer connected");
    counter!(WS_CONNECTIONS_TOTAL).increment(1);

    registry.admit(&peer);
    let _keepalive = supervisor.watch(Arc::clone(&peer));
    let _ = peer.send(&peer.display_name_message());

    let writer_token = terminated.clone();
    let mut outbound = tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                msg = send_rx.recv() => {
                    let Some(text) = msg else { break };
                    if ws_tx.send(Message::Text(String::clone(&text).into())).await.is_err() {
                        break;
                    }
                }
                () = writer_token.cancelled() => {
                    while let Ok(text) = send_rx.try_recv() {
                        if ws_tx.send(Message::Text(String::clone(&text).into())).await.is_err() {
                            return;
                        }
                    }
                    let _ = ws_tx.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    });

    loop {
        let msg = tokio::select! {
            msg = ws_rx.next() => msg,
            () = terminated.cancelled() => break,
        };
        match msg {
            None | Some(Ok(Message::Close(_))) => {
                debug!("peer closed the connection");
                let _ = registry.remove(&peer);
                break;
            }
            Some(Err(error)) => {
                warn!(%error, "websocket read error");
                break;
            }
            Some(Ok(msg)) => {
                if let Some(text) = inbound_text(&msg) {
                    let _ = handle_frame(text, &peer, &registry);
                }
            }
        }
    }

    if terminated.is_cancelled() {
        if tokio::time::timeout(FLUSH_TIMEOUT, &mut outbound).await.is_err() {
            outbound.abort();
        }
    } else {
        outbound.abort();
    }

    let duration = peer.connected_at.elapsed();
    info!(dropped = peer.connection.drop_count(), duration_secs = duration.as_secs(), "peer session ended");
    histogram!(WS_CONNECTION_DURATION_SECONDS).record(duration.as_secs_f64());
}

/// Text carried by a data frame. Binary frames count when they are UTF-8.
fn inbound_text(msg: &Message) -> Option<&str> {
    match msg {
        Message::Text(text) => Some(text.as_str()),
        Message::Binary(data) => match std::str::from_utf8(data) {
            Ok(text) => Some(text),
            Err(_) => {
                debug!(len = data.len(), "dropping non-UTF-8 binary frame");
                None
            }
        },
        Message::Ping(_) | Message::Pong(_) | Message::Close(_) => None,
    }
}
