//! Error types for the tcpframe client.

use thiserror::Error;

/// Client-specific errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// Could not connect to the server
    #[error("Connection error: {0}")]
    Connection(String),

    /// The server closed the connection
    #[error("Connection closed by server")]
    Closed,

    /// Socket or stdin I/O failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Gave up after too many reconnection attempts
    #[error("Failed to reconnect after {0} attempts")]
    ReconnectLimit(u32),
}
