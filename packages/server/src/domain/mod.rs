//! Domain layer
//!
//! サーバーのコアとなる値型と通知（イベント）の定義。
//! ソケットやランタイムには依存しません。

mod event;
mod message;

pub use event::{EventSink, NullEventSink, ServerEvent};
#[cfg(test)]
pub use event::MockEventSink;
pub use message::PendingMessage;

use std::fmt;

/// Identifier of an accepted client connection.
///
/// Assigned in accept order, starting at 1, and never reused within a
/// server run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(u64);

impl ClientId {
    /// Create a ClientId from its raw value
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Raw numeric value
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client#{}", self.0)
    }
}

/// Hands out ClientIds in accept order.
#[derive(Debug)]
pub struct ClientIdFactory {
    next: u64,
}

impl ClientIdFactory {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    pub fn generate(&mut self) -> ClientId {
        let id = ClientId(self.next);
        self.next += 1;
        id
    }
}

impl Default for ClientIdFactory {
    fn default() -> Self {
        Self::new()
    }
}

/// Lifecycle state of a server instance.
///
/// ```text
/// Stopped -> Starting -> Running -> Stopping -> Stopped
///               |
///               +-> Stopped (bind/listen failure)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerStatus {
    Stopped,
    Starting,
    Running,
    Stopping,
}

impl ServerStatus {
    /// Whether `self -> next` is an edge of the lifecycle state machine
    pub fn can_transition_to(self, next: ServerStatus) -> bool {
        use ServerStatus::{Running, Starting, Stopped, Stopping};

        matches!(
            (self, next),
            (Stopped, Starting)
                | (Starting, Running)
                | (Starting, Stopped)
                | (Running, Stopping)
                | (Stopping, Stopped)
        )
    }
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ServerStatus::Stopped => "Stopped",
            ServerStatus::Starting => "Starting",
            ServerStatus::Running => "Running",
            ServerStatus::Stopping => "Stopping",
        };
        f.write_str(name)
    }
}
