//! Configuration loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`ServerConfig::default()`]
//! 2. If a config file is given and exists, deep-merge its values over defaults
//! 3. Apply `RENDEZVOUS_*` environment variable overrides (highest priority)
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::Path;

use serde_json::Value;
use tracing::{debug, warn};

use crate::config::{
    MAX_MESSAGE_SIZE_RANGE, OUTBOUND_BUFFER_RANGE, PROBE_INTERVAL_SECS_RANGE, ServerConfig,
};
use crate::errors::ConfigError;

/// Load configuration from defaults and environment only.
pub fn load_config() -> Result<ServerConfig, ConfigError> {
    let mut config = ServerConfig::default();
    apply_env_overrides(&mut config);
    config.validate()?;
    Ok(config)
}

/// Load configuration from a JSON file with env var overrides.
///
/// A missing file yields defaults. Invalid JSON is an error.
pub fn load_config_from_path(path: &Path) -> Result<ServerConfig, ConfigError> {
    let defaults = serde_json::to_value(ServerConfig::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading config from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "config file not found, using defaults");
        defaults
    };

    let mut config: ServerConfig = serde_json::from_value(merged)?;
    apply_env_overrides(&mut config);
    config.validate()?;
    Ok(config)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `RENDEZVOUS_*` environment overrides.
pub fn apply_env_overrides(config: &mut ServerConfig) {
    apply_overrides(config, |key| std::env::var(key).ok());
}

/// Apply overrides from an arbitrary key lookup.
///
/// Invalid or out-of-range values are ignored with a warning.
pub fn apply_overrides(config: &mut ServerConfig, lookup: impl Fn(&str) -> Option<String>) {
    let read = |key: &str| lookup(key).filter(|v| !v.is_empty());

    if let Some(v) = read("RENDEZVOUS_HOST") {
        config.host = v;
    }
    if let Some(v) = read("RENDEZVOUS_PORT") {
        match parse_u16_range(&v, 0, 65535) {
            Some(port) => config.port = port,
            None => warn!(key = "RENDEZVOUS_PORT", value = %v, "invalid u16 env var, ignoring"),
        }
    }
    if let Some(v) = read("RENDEZVOUS_PROBE_INTERVAL_SECS") {
        match parse_u64_range(&v, *PROBE_INTERVAL_SECS_RANGE.start(), *PROBE_INTERVAL_SECS_RANGE.end()) {
            Some(secs) => config.probe_interval_secs = secs,
            None => warn!(
                key = "RENDEZVOUS_PROBE_INTERVAL_SECS",
                value = %v,
                "invalid u64 env var, ignoring"
            ),
        }
    }
    if let Some(v) = read("RENDEZVOUS_OUTBOUND_BUFFER") {
        match parse_usize_range(&v, *OUTBOUND_BUFFER_RANGE.start(), *OUTBOUND_BUFFER_RANGE.end()) {
            Some(n) => config.outbound_buffer = n,
            None => warn!(
                key = "RENDEZVOUS_OUTBOUND_BUFFER",
                value = %v,
                "invalid usize env var, ignoring"
            ),
        }
    }
    if let Some(v) = read("RENDEZVOUS_MAX_MESSAGE_SIZE") {
        match parse_usize_range(&v, *MAX_MESSAGE_SIZE_RANGE.start(), *MAX_MESSAGE_SIZE_RANGE.end()) {
            Some(n) => config.max_message_size = n,
            None => warn!(
                key = "RENDEZVOUS_MAX_MESSAGE_SIZE",
                value = %v,
                "invalid usize env var, ignoring"
            ),
        }
    }
    if let Some(v) = read("RENDEZVOUS_TRUST_FORWARDED_FOR") {
        match parse_bool(&v) {
            Some(flag) => config.trust_forwarded_for = flag,
            None => warn!(
                key = "RENDEZVOUS_TRUST_FORWARDED_FOR",
                value = %v,
                "invalid boolean env var, ignoring"
            ),
        }
    }
    if let Some(v) = read("RENDEZVOUS_LOG_LEVEL") {
        config.log_level = v;
    }
}

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u16` within a range.
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `usize` within a range.
pub fn parse_usize_range(val: &str, min: usize, max: usize) -> Option<usize> {
    let n: usize = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}
