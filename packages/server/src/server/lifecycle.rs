//! Server lifecycle: start, stop, send.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use tcpframe_shared::time::{Clock, SystemClock};

use crate::config::ServerConfig;
use crate::domain::{ClientId, EventSink, ServerEvent, ServerStatus};
use crate::error::SocketError;
use crate::infrastructure::{MessageSender, listener};

use super::worker::Worker;

/// Handle to the worker thread of a running server
struct RunningWorker {
    running: Arc<AtomicBool>,
    handle: JoinHandle<()>,
    local_addr: SocketAddr,
}

/// Polling TCP server
///
/// Owns a background worker thread while running. The worker accepts
/// clients, reads whatever they send and writes every queued message to
/// every connected client, reporting everything to the `EventSink`.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
///
/// use tcpframe_server::{ServerConfig, TcpServer};
/// use tokio::sync::mpsc;
///
/// let (events, _rx) = mpsc::unbounded_channel();
/// let mut server = TcpServer::new(ServerConfig::default(), Arc::new(events));
///
/// server.start("127.0.0.1", 9000)?;
/// server.send("ping");
/// // ... consume notifications from `_rx` ...
/// server.stop();
/// # Ok::<(), tcpframe_server::SocketError>(())
/// ```
pub struct TcpServer {
    config: ServerConfig,
    events: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,
    sender: MessageSender,
    status: ServerStatus,
    worker: Option<RunningWorker>,
}

impl TcpServer {
    /// Create a stopped server
    ///
    /// # Arguments
    ///
    /// * `config` - Backlog, buffer sizes, idle delay and thread name
    /// * `events` - Receiver of every notification
    pub fn new(config: ServerConfig, events: Arc<dyn EventSink>) -> Self {
        Self {
            config,
            events,
            clock: Arc::new(SystemClock),
            sender: MessageSender::new(),
            status: ServerStatus::Stopped,
            worker: None,
        }
    }

    /// Replace the clock used for connection timestamps
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Bind `address:port` and start the worker.
    ///
    /// Uses the configured backlog and buffer size. On success emits
    /// `ListenSocketStart` and returns the bound address (useful with port
    /// 0). On failure emits `ListenSocketError` and leaves the server stopped.
    ///
    /// # Errors
    ///
    /// - `InvalidAddress` / `Creation` if the socket cannot be created or bound
    /// - `Start` if listening or launching the worker fails
    /// - `AlreadyRunning` if the server is already started
    pub fn start(&mut self, address: &str, port: u16) -> Result<SocketAddr, SocketError> {
        if let Some(worker) = &self.worker {
            let error = SocketError::AlreadyRunning(worker.local_addr.to_string());
            tracing::warn!("{}", error);
            self.events.notify(ServerEvent::ListenSocketError(error.kind()));
            return Err(error);
        }

        self.transition(ServerStatus::Starting);

        match self.launch(address, port) {
            Ok(worker) => {
                let local_addr = worker.local_addr;
                self.worker = Some(worker);
                self.transition(ServerStatus::Running);
                Ok(local_addr)
            }
            Err(error) => {
                tracing::error!("{}", error);
                self.transition(ServerStatus::Stopped);
                self.events.notify(ServerEvent::ListenSocketError(error.kind()));
                Err(error)
            }
        }
    }

    /// Stop the worker and close every socket.
    ///
    /// Blocks until the worker thread has exited. No-op when not running.
    /// Called automatically on drop.
    pub fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };

        self.transition(ServerStatus::Stopping);
        worker.running.store(false, Ordering::Release);

        if worker.handle.join().is_err() {
            tracing::error!("Server worker panicked before shutdown");
        }

        self.transition(ServerStatus::Stopped);
        tracing::info!("Server on {} stopped", worker.local_addr);
        self.events.notify(ServerEvent::ListenSocketStop);
    }

    /// Queue a message for every connected client (fire-and-forget)
    pub fn send(&self, message: impl Into<String>) {
        self.sender.send(message);
    }

    /// Queue a message for a single client (fire-and-forget)
    pub fn send_to(&self, client: ClientId, message: impl Into<String>) {
        self.sender.send_to(client, message);
    }

    /// Cloneable handle for sending from other threads
    pub fn sender(&self) -> MessageSender {
        self.sender.clone()
    }

    /// Number of queued entries, expired ones included
    pub fn pending_messages(&self) -> usize {
        self.sender.pending_messages()
    }

    pub fn status(&self) -> ServerStatus {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Address the listening socket is bound to, while running
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.worker.as_ref().map(|worker| worker.local_addr)
    }

    fn launch(&self, address: &str, port: u16) -> Result<RunningWorker, SocketError> {
        let endpoint = listener::resolve_endpoint(address, port)?;
        let socket = listener::bind_socket(endpoint, self.config.buffer_bytes)?;

        let start_error = |source| SocketError::Start {
            endpoint: endpoint.to_string(),
            source,
        };

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(start_error)?;

        let listened = {
            let _guard = runtime.enter();
            listener::start_listening(socket, endpoint, self.config.max_pending_connections)
        };
        let tcp_listener = match listened {
            Ok(tcp_listener) => tcp_listener,
            Err(error) => {
                runtime.shutdown_background();
                return Err(error);
            }
        };
        let local_addr = tcp_listener.local_addr().unwrap_or(endpoint);

        let running = Arc::new(AtomicBool::new(true));
        let worker = Worker::new(
            tcp_listener,
            self.sender.clone(),
            Arc::clone(&self.events),
            Arc::clone(&self.clock),
            Arc::clone(&running),
            self.config.idle_delay(),
            self.config.read_limit(),
        );

        // ListenSocketStart はワーカースレッド上で最初に送る。spawn に失敗した
        // 場合は送られず、以降の接続通知より必ず先に届く
        let events = Arc::clone(&self.events);
        let handle = thread::Builder::new()
            .name(self.config.socket_name.clone())
            .spawn(move || {
                tracing::info!("TCP server listening on {}", local_addr);
                events.notify(ServerEvent::ListenSocketStart { local_addr });
                runtime.block_on(worker.run());
            })
            .map_err(start_error)?;

        Ok(RunningWorker {
            running,
            handle,
            local_addr,
        })
    }

    fn transition(&mut self, next: ServerStatus) {
        debug_assert!(
            self.status.can_transition_to(next),
            "invalid server state transition {} -> {}",
            self.status,
            next
        );
        tracing::debug!("Server state: {} -> {}", self.status, next);
        self.status = next;
    }
}

impl Drop for TcpServer {
    fn drop(&mut self) {
        self.stop();
    }
}
