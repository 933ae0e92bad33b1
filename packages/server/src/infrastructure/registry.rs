//! Connected client registry
//!
//! ## 責務
//!
//! - accept 済みクライアントのソケットとアドレスを保持する
//! - ノンブロッキングの読み書き（`try_read` / `try_write`）
//! - 切断されたクライアントの除去と、停止時の一括クローズ
//!
//! レジストリはワーカーだけが触ります。accept と各クライアントの I/O は
//! 同じサイクル内の逐次フェーズなので、ロックは不要です。

use std::collections::HashMap;
use std::io;
use std::net::{Shutdown, SocketAddr};

use tokio::net::TcpStream;

use tcpframe_shared::framing::encode_message_into;

use crate::domain::ClientId;

/// Result of draining a client's readable bytes for one cycle
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Inbound {
    pub bytes: Vec<u8>,
    /// EOF or a hard read error was observed
    pub closed: bool,
}

/// An accepted client connection
#[derive(Debug)]
pub struct ClientConnection {
    pub id: ClientId,
    pub address: SocketAddr,
    /// Next outbound log sequence this client has not been handed yet
    pub cursor: u64,
    stream: TcpStream,
    outbound: Vec<u8>,
}

impl ClientConnection {
    pub fn new(
        id: ClientId,
        stream: TcpStream,
        address: SocketAddr,
        cursor: u64,
    ) -> Self {
        Self {
            id,
            address,
            cursor,
            stream,
            outbound: Vec::new(),
        }
    }

    /// Read everything currently available without blocking.
    ///
    /// Stops after `limit` bytes so one chatty client cannot starve the rest
    /// of the cycle; the remainder is picked up next cycle.
    pub fn read_available(&mut self, scratch: &mut [u8], limit: usize) -> Inbound {
        let mut inbound = Inbound::default();

        while inbound.bytes.len() < limit {
            match self.stream.try_read(scratch) {
                Ok(0) => {
                    inbound.closed = true;
                    break;
                }
                Ok(n) => inbound.bytes.extend_from_slice(&scratch[..n]),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::debug!("Read from {} failed: {}", self.address, e);
                    inbound.closed = true;
                    break;
                }
            }
        }

        inbound
    }

    /// Encode payloads (payload + delimiter) into the write buffer
    pub fn stage<I>(&mut self, payloads: I)
    where
        I: IntoIterator<Item = String>,
    {
        for payload in payloads {
            encode_message_into(&payload, &mut self.outbound);
        }
    }

    /// Write as much of the buffer as the socket accepts right now.
    ///
    /// Returns the number of bytes written. `WouldBlock` leaves the rest for
    /// the next cycle; any other failure means the peer is gone.
    pub fn flush(&mut self) -> io::Result<usize> {
        let mut written = 0;

        while written < self.outbound.len() {
            match self.stream.try_write(&self.outbound[written..]) {
                Ok(0) => return Err(io::Error::from(io::ErrorKind::WriteZero)),
                Ok(n) => written += n,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }

        self.outbound.drain(..written);
        Ok(written)
    }

    /// Bytes staged but not yet written
    pub fn unsent_len(&self) -> usize {
        self.outbound.len()
    }

    /// Shut down both directions of the socket and release it
    pub fn close(self) {
        match self.stream.into_std() {
            Ok(stream) => {
                // 既に切断済みのソケットでは ENOTCONN が返るので無視する
                let _ = stream.shutdown(Shutdown::Both);
            }
            Err(e) => tracing::debug!("Failed to detach {} for shutdown: {}", self.address, e),
        }
    }
}

/// Live client connections keyed by ClientId, iterated in accept order
#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: Vec<ClientConnection>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, connection: ClientConnection) {
        tracing::debug!(
            "{} ({}) added to registry",
            connection.id,
            connection.address
        );
        self.clients.push(connection);
    }

    /// Evict a client, returning its connection
    pub fn remove(&mut self, id: ClientId) -> Option<ClientConnection> {
        let index = self.clients.iter().position(|c| c.id == id)?;
        let connection = self.clients.remove(index);
        tracing::debug!(
            "{} ({}) removed from registry",
            connection.id,
            connection.address
        );
        Some(connection)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ClientConnection> {
        self.clients.iter_mut()
    }

    /// Outbound cursor of every registered client
    pub fn cursors(&self) -> HashMap<ClientId, u64> {
        self.clients.iter().map(|c| (c.id, c.cursor)).collect()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Close every connection and empty the registry
    pub fn close_all(&mut self) -> usize {
        let count = self.clients.len();
        for connection in self.clients.drain(..) {
            connection.close();
        }
        count
    }
}
