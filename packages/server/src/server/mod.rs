//! TCP server lifecycle and its background worker.

mod lifecycle;
mod worker;

pub use lifecycle::TcpServer;
