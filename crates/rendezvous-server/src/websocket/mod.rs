//! `WebSocket` peer handling: connections, rooms, relay and liveness.

pub mod connection;
pub mod keepalive;
pub mod peer;
pub mod rooms;
pub mod router;
pub mod session;
