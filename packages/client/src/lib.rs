//! Line-oriented TCP client for tcpframe servers.
//!
//! Sends delimiter-terminated messages and reassembles the server's
//! tab-delimited stream back into whole messages.

pub mod error;
pub mod formatter;
pub mod runner;
pub mod session;

pub use error::ClientError;
pub use runner::run_client;
pub use session::{MessageReader, MessageWriter, connect};
