//! Background polling cycle.
//!
//! 1 サイクルは 2 つのフェーズを順番に実行します:
//!
//! 1. accept フェーズ: 最大 `idle_delay` だけ新規接続を待ち、来ていれば
//!    accept してレジストリに登録する
//! 2. I/O フェーズ: 登録済みの各クライアントについて、受信 → 送信 →
//!    切断処理を行う
//!
//! どちらのフェーズも同じタスク上で逐次に動くため、レジストリへの追加と
//! 走査が交差することはありません。ソケット操作はすべてノンブロッキングで、
//! サイクル内の待機は accept フェーズの上限付き待機だけです。accept が
//! 即座に失敗した場合も `idle_delay` だけ待ってから次のサイクルへ進みます。

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};

use tcpframe_shared::{framing::decode_payload, time::Clock};

use crate::domain::{ClientId, ClientIdFactory, EventSink, ServerEvent};
use crate::infrastructure::{ClientConnection, ClientRegistry, MessageSender};

/// Size of the scratch buffer used for a single `try_read`
const READ_CHUNK_BYTES: usize = 64 * 1024;

/// State owned by the worker thread
pub(crate) struct Worker {
    listener: TcpListener,
    registry: ClientRegistry,
    queue: MessageSender,
    events: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,
    running: Arc<AtomicBool>,
    ids: ClientIdFactory,
    idle_delay: Duration,
    read_limit: usize,
    scratch: Vec<u8>,
}

impl Worker {
    pub(crate) fn new(
        listener: TcpListener,
        queue: MessageSender,
        events: Arc<dyn EventSink>,
        clock: Arc<dyn Clock>,
        running: Arc<AtomicBool>,
        idle_delay: Duration,
        read_limit: usize,
    ) -> Self {
        Self {
            listener,
            registry: ClientRegistry::new(),
            queue,
            events,
            clock,
            running,
            ids: ClientIdFactory::new(),
            idle_delay,
            read_limit,
            scratch: vec![0; READ_CHUNK_BYTES.min(read_limit.max(1))],
        }
    }

    /// Run cycles until the running flag clears, then close every socket
    pub(crate) async fn run(mut self) {
        tracing::info!("Server worker running");

        while self.running.load(Ordering::Acquire) {
            self.accept_phase().await;
            self.io_phase();
        }

        let closed = self.registry.close_all();
        tracing::info!(
            "Server worker exiting, closed {} client connection(s)",
            closed
        );
        // listener は self と一緒にここで破棄される
    }

    async fn accept_phase(&mut self) {
        let accepted = accept_or_idle(self.listener.accept(), self.idle_delay).await;
        if let Some((stream, address)) = accepted {
            self.register(stream, address);
        }
    }

    fn register(&mut self, stream: TcpStream, address: SocketAddr) {
        let id = self.ids.generate();
        let connected_at = self.clock.now_millis();
        let cursor = self.queue.lock().first_pending();

        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!("Failed to set TCP_NODELAY for {}: {}", address, e);
        }

        tracing::info!("Incoming connection: {} as {}", address, id);
        self.registry
            .add(ClientConnection::new(id, stream, address, cursor));

        self.events.notify(ServerEvent::ClientConnected {
            client: id,
            address: address.to_string(),
            connected_at,
        });
    }

    fn io_phase(&mut self) {
        let mut disconnected: Vec<ClientId> = Vec::new();

        for connection in self.registry.iter_mut() {
            let id = connection.id;

            // 1. receive (EOF / read error doubles as the disconnection check)
            let inbound = connection.read_available(&mut self.scratch, self.read_limit);
            if !inbound.bytes.is_empty() {
                tracing::debug!("Received {} bytes from {}", inbound.bytes.len(), id);
                let message = decode_payload(&inbound.bytes);
                self.events.notify(ServerEvent::ReceivedBytes {
                    client: id,
                    bytes: inbound.bytes,
                });
                self.events
                    .notify(ServerEvent::ReceivedString { client: id, message });
            }
            if inbound.closed {
                disconnected.push(id);
                continue;
            }

            // 2. send
            let (payloads, cursor) = self.queue.lock().drain_for(id, connection.cursor);
            connection.cursor = cursor;
            connection.stage(payloads);

            if connection.unsent_len() == 0 {
                continue;
            }
            match connection.flush() {
                Ok(0) => {}
                Ok(written) => tracing::debug!("Sent {} bytes to {}", written, id),
                Err(e) => {
                    tracing::warn!("Probably disconnected: {} ({}): {}", id, connection.address, e);
                    disconnected.push(id);
                }
            }
        }

        // 3. evict
        for id in disconnected {
            if let Some(connection) = self.registry.remove(id) {
                let address = connection.address.to_string();
                tracing::info!("Client disconnected: {} ({})", id, address);
                connection.close();
                self.events
                    .notify(ServerEvent::ClientDisconnected { client: id, address });
            }
        }

        let cursors = self.registry.cursors();
        self.queue.lock().expire_delivered(&cursors);
    }
}

/// Wait at most `idle_delay` for a connection.
///
/// A failed accept counts as "no connection this cycle" and still waits out
/// the idle delay, so a persistent error such as EMFILE cannot spin the worker.
async fn accept_or_idle<T, F>(accept: F, idle_delay: Duration) -> Option<T>
where
    F: Future<Output = io::Result<T>>,
{
    tokio::select! {
        biased;
        accepted = accept => match accepted {
            Ok(connection) => Some(connection),
            Err(e) => {
                tracing::warn!("Accept failed: {}", e);
                tokio::time::sleep(idle_delay).await;
                None
            }
        },
        () = tokio::time::sleep(idle_delay) => None,
    }
}
