//! Error types for the tcpframe server.

use std::io;

use thiserror::Error;

/// Notification code carried by `ServerEvent::ListenSocketError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketErrorKind {
    /// The listening socket could not be constructed or bound
    SocketCreationError,
    /// The bound socket could not start listening
    SocketStartError,
}

/// Errors returned by `TcpServer::start`
#[derive(Debug, Error)]
pub enum SocketError {
    /// The bind address is not an IP address
    #[error("Invalid bind address '{0}'")]
    InvalidAddress(String),

    /// Socket construction, option setup or bind failed
    #[error("Failed to create listen socket on {endpoint}: {source}")]
    Creation {
        endpoint: String,
        #[source]
        source: io::Error,
    },

    /// Listening (or launching the worker) failed
    #[error("Failed to start listening on {endpoint}: {source}")]
    Start {
        endpoint: String,
        #[source]
        source: io::Error,
    },

    /// The server is already running
    #[error("Server is already listening on {0}")]
    AlreadyRunning(String),
}

impl SocketError {
    /// Notification code for this error
    pub fn kind(&self) -> SocketErrorKind {
        match self {
            SocketError::InvalidAddress(_) | SocketError::Creation { .. } => {
                SocketErrorKind::SocketCreationError
            }
            SocketError::Start { .. } | SocketError::AlreadyRunning(_) => {
                SocketErrorKind::SocketStartError
            }
        }
    }
}

/// Errors raised while loading a `ServerConfig`
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    /// The config file is not valid JSON for `ServerConfig`
    #[error("Failed to parse config file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
