//! Prometheus metrics recorder and metric names.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Install the Prometheus metrics recorder (global).
///
/// Returns the handle used to render `/metrics`. Fails if a recorder is
/// already installed.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    info!("prometheus metrics recorder installed");
    Ok(handle)
}

/// Peers admitted, replacements excluded (counter).
pub const PEERS_JOINED_TOTAL: &str = "peers_joined_total";
/// Peers removed for any reason (counter).
pub const PEERS_LEFT_TOTAL: &str = "peers_left_total";
/// Peers removed by the liveness supervisor (counter).
pub const PEERS_EVICTED_TOTAL: &str = "peers_evicted_total";
/// Frames delivered to a recipient (counter).
pub const FRAMES_RELAYED_TOTAL: &str = "frames_relayed_total";
/// Relayed frames and room notifications (`peer-joined`, `peer-left`) dropped
/// because the recipient's queue was full or closed (counter).
pub const FRAMES_DROPPED_TOTAL: &str = "frames_dropped_total";
/// Connected peers (gauge).
pub const PEERS_ACTIVE: &str = "peers_active";
/// Non-empty rooms (gauge).
pub const ROOMS_ACTIVE: &str = "rooms_active";
/// `WebSocket` sessions opened (counter).
pub const WS_CONNECTIONS_TOTAL: &str = "ws_connections_total";
/// `WebSocket` session duration (histogram).
pub const WS_CONNECTION_DURATION_SECONDS: &str = "ws_connection_duration_seconds";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_without_global_install() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        metrics::with_local_recorder(&recorder, || {
            metrics::counter!(PEERS_JOINED_TOTAL).increment(2);
        });
        assert!(handle.render().contains("peers_joined_total 2"));
    }

    #[test]
    fn metric_constants_are_snake_case() {
        let names = [
            PEERS_JOINED_TOTAL,
            PEERS_LEFT_TOTAL,
            PEERS_EVICTED_TOTAL,
            FRAMES_RELAYED_TOTAL,
            FRAMES_DROPPED_TOTAL,
            PEERS_ACTIVE,
            ROOMS_ACTIVE,
            WS_CONNECTIONS_TOTAL,
            WS_CONNECTION_DURATION_SECONDS,
        ];
        for name in names {
            assert!(
                name.chars().all(|c| c.is_ascii_lowercase() || c == '_'),
                "metric name '{name}' must be snake_case"
            );
        }
    }
}
