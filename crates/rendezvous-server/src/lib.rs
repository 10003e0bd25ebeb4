//! # rendezvous-server
//!
//! Axum `WebSocket` server that lets browsers on the same network find each
//! other and exchange signaling messages.
//!
//! - Identity: peer id cookie, origin resolution, user-agent classification
//! - Rooms: peers grouped by origin, join/leave announcements
//! - Relay: addressed frames forwarded within a room, stamped with `sender`
//! - Liveness: application-level ping probes and eviction of silent peers
//! - HTTP endpoints: health check, Prometheus metrics
//! - Graceful shutdown via `CancellationToken`

#![deny(unsafe_code)]

pub mod config;
pub mod errors;
pub mod health;
pub mod identity;
pub mod loader;
pub mod metrics;
pub mod server;
pub mod shutdown;
pub mod websocket;

pub use config::ServerConfig;
pub use errors::{ConfigError, ServerError};
pub use server::RendezvousServer;
