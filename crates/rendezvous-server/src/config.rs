//! Server configuration.

use std::ops::RangeInclusive;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// Accepted `probe_interval_secs` values.
pub const PROBE_INTERVAL_SECS_RANGE: RangeInclusive<u64> = 1..=3600;
/// Accepted `outbound_buffer` values.
pub const OUTBOUND_BUFFER_RANGE: RangeInclusive<usize> = 1..=65_536;
/// Accepted `max_message_size` values in bytes.
pub const MAX_MESSAGE_SIZE_RANGE: RangeInclusive<usize> = 1024..=64 * 1024 * 1024;

/// Configuration for the rendezvous server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind (default `"0.0.0.0"`).
    pub host: String,
    /// Port to bind (default `3000`, `0` for auto-assign).
    pub port: u16,
    /// Seconds between liveness probes. A peer silent for twice this long is evicted.
    pub probe_interval_secs: u64,
    /// Capacity of each peer's outbound queue; frames beyond it are dropped.
    pub outbound_buffer: usize,
    /// Max WebSocket message size in bytes.
    pub max_message_size: usize,
    /// Derive the origin from `X-Forwarded-For` when present.
    pub trust_forwarded_for: bool,
    /// Default log filter when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 3000,
            probe_interval_secs: 30,
            outbound_buffer: 256,
            max_message_size: 1024 * 1024, // 1 MB
            trust_forwarded_for: true,
            log_level: "info".into(),
        }
    }
}

impl ServerConfig {
    /// Liveness probe interval as a `Duration`.
    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.probe_interval_secs)
    }

    /// `host:port` string for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Reject values the server cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("probe_interval_secs", self.probe_interval_secs, &PROBE_INTERVAL_SECS_RANGE)?;
        check_range("outbound_buffer", self.outbound_buffer, &OUTBOUND_BUFFER_RANGE)?;
        check_range("max_message_size", self.max_message_size, &MAX_MESSAGE_SIZE_RANGE)?;
        if self.host.trim().is_empty() {
            return Err(ConfigError::InvalidValue("host must not be empty".into()));
        }
        Ok(())
    }
}

fn check_range<T>(key: &str, value: T, range: &RangeInclusive<T>) -> Result<(), ConfigError>
where
    T: PartialOrd + std::fmt::Display,
{
    if range.contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue(format!(
            "{key} must be between {} and {}, got {value}",
            range.start(),
            range.end()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_host_and_port() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.host, "0.0.0.0");
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.bind_addr(), "0.0.0.0:3000");
    }

    #[test]
    fn default_probe_interval_is_thirty_seconds() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.probe_interval(), Duration::from_secs(30));
    }

    #[test]
    fn default_trusts_forwarded_header() {
        assert!(ServerConfig::default().trust_forwarded_for);
    }

    #[test]
    fn defaults_are_valid() {
        assert!(ServerConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_interval_rejected() {
        let cfg = ServerConfig {
            probe_interval_secs: 0,
            ..ServerConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn zero_buffer_rejected() {
        let cfg = ServerConfig {
            outbound_buffer: 0,
            ..ServerConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn oversized_interval_rejected() {
        let cfg: ServerConfig =
            serde_json::from_str(r#"{"probe_interval_secs": 18446744073709551615}"#).unwrap();
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("probe_interval_secs"));

        let at_limit = ServerConfig {
            probe_interval_secs: 3600,
            ..ServerConfig::default()
        };
        assert!(at_limit.validate().is_ok());
    }

    #[test]
    fn tiny_message_size_rejected() {
        let cfg = ServerConfig {
            max_message_size: 0,
            ..ServerConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidValue(msg)) if msg.contains("max_message_size")));
    }

    #[test]
    fn missing_fields_take_defaults() {
        let cfg: ServerConfig = serde_json::from_str(r#"{"port":8080}"#).unwrap();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.host, "0.0.0.0");
        assert_eq!(cfg.probe_interval_secs, 30);
    }

    #[test]
    fn deserialize_from_json_string() {
        let json = r#"{"host":"10.0.0.1","port":4000,"probe_interval_secs":10,"outbound_buffer":8,"max_message_size":512,"trust_forwarded_for":false,"log_level":"debug"}"#;
        let cfg: ServerConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.host, "10.0.0.1");
        assert_eq!(cfg.port, 4000);
        assert_eq!(cfg.probe_interval_secs, 10);
        assert!(!cfg.trust_forwarded_for);
        assert_eq!(cfg.log_level, "debug");
    }
}
