//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::observability::rotating::{DEFAULT_MAX_BACKUPS, DEFAULT_MAX_SIZE_BYTES};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Directory holding `sys.log` and `sql.log`. Console output when unset.
    pub log_path: Option<PathBuf>,

    /// Threshold for the system log (debug, info, warn, error).
    pub log_level: String,

    /// Size and retention limits shared by both log files.
    pub log_rotation: LogRotationConfig,

    /// Listener configuration.
    pub listener: ListenerConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            log_path: None,
            log_level: "error".to_string(),
            log_rotation: LogRotationConfig::default(),
            listener: ListenerConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Log file rotation limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LogRotationConfig {
    /// Rotate once a write would push the file past this size.
    pub max_size_bytes: u64,

    /// Rotated generations kept next to the active file.
    pub max_backups: usize,
}

impl Default for LogRotationConfig {
    fn default() -> Self {
        Self {
            max_size_bytes: DEFAULT_MAX_SIZE_BYTES,
            max_backups: DEFAULT_MAX_BACKUPS,
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:9696").
    pub bind_address: String,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:9696".to_string(),
            max_connections: 10_000,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9697".to_string(),
        }
    }
}
