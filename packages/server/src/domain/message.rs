//! Outbound message entry.

use super::ClientId;

/// A message waiting in the outbound log.
///
/// `seq` orders entries and is what client cursors point at. Once `expired`
/// is set the entry is never handed to a client again and the next enqueue
/// sweeps it away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMessage {
    pub seq: u64,
    pub payload: String,
    /// `None` broadcasts to every client
    pub target: Option<ClientId>,
    /// Handed to at least one client
    pub delivered: bool,
    pub expired: bool,
}

impl PendingMessage {
    pub fn new(seq: u64, payload: String, target: Option<ClientId>) -> Self {
        Self {
            seq,
            payload,
            target,
            delivered: false,
            expired: false,
        }
    }

    /// Whether this entry should be written to `client`
    pub fn is_addressed_to(&self, client: ClientId) -> bool {
        self.target.is_none_or(|target| target == client)
    }
}
