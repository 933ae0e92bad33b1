//! Polling TCP server with broadcast messaging.
//!
//! The server accepts any number of clients on one listening socket, reads
//! whatever they send, and writes every queued message (payload followed by
//! a tab delimiter) to every connected client. Everything the host needs to
//! know is reported through an [`EventSink`].

// layers
pub mod domain;
pub mod infrastructure;
pub mod server;

pub mod config;
pub mod error;

pub use config::ServerConfig;
pub use domain::{ClientId, EventSink, NullEventSink, ServerEvent, ServerStatus};
pub use error::{ConfigError, SocketError, SocketErrorKind};
pub use infrastructure::MessageSender;
pub use server::TcpServer;
