//! Server configuration.

use std::{fs, path::Path, time::Duration};

use serde::Deserialize;

use crate::error::ConfigError;

/// Default port
pub const DEFAULT_PORT: u16 = 8080;
/// Default socket send/receive buffer size (2 MiB)
pub const DEFAULT_BUFFER_BYTES: u32 = 2 * 1024 * 1024;
/// Default listen backlog
pub const DEFAULT_MAX_PENDING_CONNECTIONS: u32 = 8;
/// Default delay between polling cycles (microseconds)
pub const DEFAULT_IDLE_DELAY_MICROS: u64 = 10;

/// Configuration for a `TcpServer`
///
/// Every field is optional in JSON; missing fields take the defaults.
///
/// ```json
/// { "address": "0.0.0.0", "port": 9000, "max_pending_connections": 16 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// IP address to bind
    pub address: String,
    pub port: u16,
    /// Listen backlog
    pub max_pending_connections: u32,
    /// SO_SNDBUF / SO_RCVBUF size, also the per-cycle read cap per client
    pub buffer_bytes: u32,
    /// Delay between polling cycles
    pub idle_delay_micros: u64,
    /// Name of the worker thread
    pub socket_name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            max_pending_connections: DEFAULT_MAX_PENDING_CONNECTIONS,
            buffer_bytes: DEFAULT_BUFFER_BYTES,
            idle_delay_micros: DEFAULT_IDLE_DELAY_MICROS,
            socket_name: "TCP-server".to_string(),
        }
    }
}

impl ServerConfig {
    /// Load a config from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Parse a config from a JSON string
    pub fn from_json_str(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn idle_delay(&self) -> Duration {
        Duration::from_micros(self.idle_delay_micros)
    }

    /// Per-cycle read cap for a single client
    pub fn read_limit(&self) -> usize {
        (self.buffer_bytes as usize).max(1)
    }
}
