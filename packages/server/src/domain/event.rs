//! Notifications delivered to the host of a server.
//!
//! ## 設計ノート
//!
//! 通知はすべて所有権を持つ値として渡します。バックグラウンドスレッドから
//! サーバー内部への参照が外に漏れることはありません。`stop()` がワーカーの
//! join を待ってから `ListenSocketStop` を通知するため、停止後に通知が
//! 届くこともありません。

use std::net::SocketAddr;

use tokio::sync::mpsc;

use crate::error::SocketErrorKind;

use super::ClientId;

/// A notification emitted by the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// The listening socket is up and the worker is about to run
    ListenSocketStart { local_addr: SocketAddr },
    /// The worker has exited and every socket is closed
    ListenSocketStop,
    /// `start()` failed
    ListenSocketError(SocketErrorKind),
    /// A client was accepted
    ClientConnected {
        client: ClientId,
        address: String,
        connected_at: i64,
    },
    /// A client closed its connection or failed; it has been evicted
    ClientDisconnected { client: ClientId, address: String },
    /// Raw bytes read from a client in one polling cycle
    ReceivedBytes { client: ClientId, bytes: Vec<u8> },
    /// The same bytes decoded as UTF-8 (delimiter kept)
    ReceivedString { client: ClientId, message: String },
}

/// Receiver of server notifications.
///
/// Called from the caller thread for lifecycle notifications and from the
/// worker thread for connection and traffic notifications, so
/// implementations must not block for long.
#[cfg_attr(test, mockall::automock)]
pub trait EventSink: Send + Sync {
    /// Deliver one notification
    fn notify(&self, event: ServerEvent);
}

impl EventSink for mpsc::UnboundedSender<ServerEvent> {
    fn notify(&self, event: ServerEvent) {
        // 受信側が先に破棄されている場合は通知を捨てる
        if self.send(event).is_err() {
            tracing::trace!("Event receiver dropped, notification discarded");
        }
    }
}

/// Sink that drops every notification
#[derive(Debug, Clone, Copy, Default)]
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn notify(&self, _event: ServerEvent) {}
}
