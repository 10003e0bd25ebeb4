//! # rendezvous-relay
//!
//! Rendezvous relay binary: loads configuration, installs logging and
//! metrics, and serves the signaling endpoint until Ctrl-C.

#![deny(unsafe_code)]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use rendezvous_core::logging;
use rendezvous_server::loader;
use rendezvous_server::{RendezvousServer, ServerConfig};

/// Rendezvous relay server.
#[derive(Parser, Debug)]
#[command(name = "rendezvous-relay", about = "Peer discovery and signaling relay")]
struct Cli {
    /// Path to a JSON config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Host to bind (overrides config).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, 0 for auto-assign (overrides config).
    #[arg(long)]
    port: Option<u16>,

    /// Log filter used when `RUST_LOG` is unset (overrides config).
    #[arg(long)]
    log_level: Option<String>,

    /// Emit logs as JSON lines.
    #[arg(long)]
    json_logs: bool,
}

impl Cli {
    /// Resolve the effective configuration: file and env first, flags last.
    fn server_config(&self) -> Result<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => loader::load_config_from_path(path)
                .with_context(|| format!("Failed to load config: {}", path.display()))?,
            None => loader::load_config().context("Invalid environment configuration")?,
        };
        if let Some(host) = &self.host {
            config.host.clone_from(host);
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(level) = &self.log_level {
            config.log_level.clone_from(level);
        }
        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    let config = args.server_config()?;

    if args.json_logs {
        logging::init_json_subscriber(&config.log_level);
    } else {
        logging::init_subscriber(&config.log_level);
    }

    let mut server = RendezvousServer::new(config);
    match rendezvous_server::metrics::install_recorder() {
        Ok(handle) => server = server.with_metrics(handle),
        Err(error) => tracing::warn!(%error, "metrics disabled"),
    }

    let (addr, handle) = server.listen().await.context("Failed to bind server")?;
    tracing::info!(
        probe_interval_secs = server.config().probe_interval_secs,
        "rendezvous relay listening on ws://{addr}/server"
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    tracing::info!("Shutting down...");
    server
        .shutdown()
        .graceful_shutdown(server.registry(), vec![handle], None)
        .await;

    tracing::info!("Shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_defaults_leave_config_untouched() {
        let cli = Cli::parse_from(["rendezvous-relay"]);
        assert!(cli.config.is_none());
        assert!(cli.port.is_none());
        assert!(!cli.json_logs);
    }

    #[test]
    fn flags_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay.json");
        std::fs::write(&path, r#"{"host": "10.0.0.5", "port": 4000, "probe_interval_secs": 12}"#)
            .unwrap();

        let cli = Cli::parse_from([
            "rendezvous-relay",
            "--config",
            path.to_str().unwrap(),
            "--port",
            "5000",
            "--log-level",
            "debug",
        ]);
        let config = cli.server_config().unwrap();
        assert_eq!(config.host, "10.0.0.5");
        assert_eq!(config.port, 5000);
        assert_eq!(config.probe_interval_secs, 12);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn bad_config_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay.json");
        std::fs::write(&path, "{").unwrap();

        let cli = Cli::parse_from(["rendezvous-relay", "--config", path.to_str().unwrap()]);
        let err = cli.server_config().unwrap_err();
        assert!(err.to_string().contains("Failed to load config"));
    }

    #[tokio::test]
    async fn server_graceful_shutdown() {
        let config = ServerConfig {
            host: "127.0.0.1".into(),
            port: 0,
            ..ServerConfig::default()
        };
        let server = RendezvousServer::new(config);
        let (_, handle) = server.listen().await.unwrap();

        tokio::time::timeout(
            std::time::Duration::from_secs(5),
            server
                .shutdown()
                .graceful_shutdown(server.registry(), vec![handle], None),
        )
        .await
        .expect("shutdown timed out");
    }
}
