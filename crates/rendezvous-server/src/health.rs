//! `/health` endpoint.

use serde::Serialize;
use std::time::Instant;

/// Health check response body.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` when the server is running.
    pub status: String,
    /// Seconds since the server started.
    pub uptime_secs: u64,
    /// Connected peers across all rooms.
    pub peers: usize,
    /// Non-empty rooms.
    pub rooms: usize,
}

/// Build a health response from live counters.
pub fn health_check(start_time: Instant, peers: usize, rooms: usize) -> HealthResponse {
    HealthResponse {
        status: "ok".into(),
        uptime_secs: start_time.elapsed().as_secs(),
        peers,
        rooms,
    }
}
