//! Server error types.

use thiserror::Error;

/// Errors that can occur when loading or parsing configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the config file from disk.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    /// Failed to parse JSON in the config file.
    #[error("failed to parse config JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// A config value was invalid (e.g., out of range).
    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Errors raised while starting the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listen address could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Address that was requested.
        addr: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Any other socket-level failure.
    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}
