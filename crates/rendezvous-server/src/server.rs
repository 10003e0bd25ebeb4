//! `RendezvousServer`: Axum HTTP + `WebSocket` server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{ConnectInfo, State};
use axum::http::header::{HeaderMap, USER_AGENT};
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum_extra::extract::cookie::CookieJar;
use metrics_exporter_prometheus::PrometheusHandle;
use rendezvous_core::{NameGenerator, WordListNames};
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tracing::{debug, info};

use crate::config::ServerConfig;
use crate::errors::ServerError;
use crate::health::{self, HealthResponse};
use crate::identity::{self, PeerHandshake};
use crate::shutdown::ShutdownCoordinator;
use crate::websocket::keepalive::LivenessSupervisor;
use crate::websocket::rooms::RoomRegistry;
use crate::websocket::session::run_peer_session;

const FORWARDED_FOR: &str = "x-forwarded-for";

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// All rooms.
    pub registry: Arc<RoomRegistry>,
    /// Keepalive task spawner.
    pub supervisor: LivenessSupervisor,
    /// Display name source.
    pub names: Arc<dyn NameGenerator>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// When the server started.
    pub start_time: Instant,
    /// Prometheus renderer, when a recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

/// The rendezvous server.
pub struct RendezvousServer {
    config: Arc<ServerConfig>,
    registry: Arc<RoomRegistry>,
    names: Arc<dyn NameGenerator>,
    metrics: Option<PrometheusHandle>,
    shutdown: Arc<ShutdownCoordinator>,
    start_time: Instant,
}

impl RendezvousServer {
    /// Create a server with word-list display names and no metrics endpoint.
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config: Arc::new(config),
            registry: Arc::new(RoomRegistry::new()),
            names: Arc::new(WordListNames),
            metrics: None,
            shutdown: Arc::new(ShutdownCoordinator::new()),
            start_time: Instant::now(),
        }
    }

    /// Use a different display name generator.
    #[must_use]
    pub fn with_name_generator(mut self, names: Arc<dyn NameGenerator>) -> Self {
        self.names = names;
        self
    }

    /// Serve `/metrics` from this Prometheus handle.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        let state = AppState {
            registry: Arc::clone(&self.registry),
            supervisor: LivenessSupervisor::new(
                Arc::clone(&self.registry),
                self.config.probe_interval(),
            ),
            names: Arc::clone(&self.names),
            config: Arc::clone(&self.config),
            start_time: self.start_time,
            metrics: self.metrics.clone(),
        };

        Router::new()
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .route("/server", get(ws_handler))
            .route("/server/{*path}", get(ws_handler))
            .with_state(state)
            .layer(CorsLayer::permissive())
    }

    /// Bind the configured address and serve until shutdown.
    ///
    /// Returns the bound address (useful with port `0`) and the serve task.
    pub async fn listen(&self) -> Result<(SocketAddr, JoinHandle<()>), ServerError> {
        let addr = self.config.bind_addr();
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.clone(),
                source,
            })?;
        let local_addr = listener.local_addr()?;

        let app = self
            .router()
            .into_make_service_with_connect_info::<SocketAddr>();
        let token = self.shutdown.token();
        let handle = tokio::spawn(async move {
            if let Err(error) = axum::serve(listener, app)
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await
            {
                tracing::error!(%error, "server terminated with error");
            }
        });

        info!(%local_addr, "rendezvous server listening");
        Ok((local_addr, handle))
    }

    /// Get the room registry.
    pub fn registry(&self) -> &Arc<RoomRegistry> {
        &self.registry
    }

    /// Get the shutdown coordinator.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health::health_check(
        state.start_time,
        state.registry.peer_count(),
        state.registry.room_count(),
    ))
}

/// GET /metrics
async fn metrics_handler(State(state): State<AppState>) -> Response {
    match state.metrics {
        Some(handle) => handle.render().into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response(),
    }
}

/// GET /server, /server/{*path}: upgrade and run a peer session.
///
/// A minted peer id is returned as a cookie on the upgrade response.
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    uri: Uri,
    headers: HeaderMap,
    jar: CookieJar,
) -> impl IntoResponse {
    let (jar, peer_id) = identity::resolve_peer_id(jar);

    let forwarded_for = state
        .config
        .trust_forwarded_for
        .then(|| header_str(&headers, FORWARDED_FOR))
        .flatten()
        .map(str::to_owned);
    let device = headers
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(identity::classify)
        .unwrap_or_default();

    let handshake = PeerHandshake {
        peer_id,
        forwarded_for,
        remote_addr: remote.ip().to_string(),
        rtc_supported: identity::rtc_supported(uri.path()),
        device,
    };
    let peer_identity = handshake.resolve(state.names.as_ref());
    debug!(peer_id = %peer_identity.id, origin = %peer_identity.origin, "upgrading peer");

    let registry = Arc::clone(&state.registry);
    let supervisor = state.supervisor.clone();
    let outbound_buffer = state.config.outbound_buffer;
    let upgrade = ws
        .max_message_size(state.config.max_message_size)
        .on_upgrade(move |socket| {
            run_peer_session(socket, peer_identity, registry, supervisor, outbound_buffer)
        });

    (jar, upgrade)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
