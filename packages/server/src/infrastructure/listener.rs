//! Listening socket construction.
//!
//! 生成は 2 段階に分かれています:
//!
//! 1. `bind_socket`: ソケット生成、`SO_REUSEADDR`、送受信バッファ、bind
//!    （失敗は `SocketCreationError`）
//! 2. `start_listening`: バックログを指定して listen
//!    （失敗は `SocketStartError`）
//!
//! `start_listening` はリアクターに登録するため、tokio ランタイムの
//! コンテキスト内で呼ぶ必要があります。

use std::net::{IpAddr, SocketAddr};

use tokio::net::{TcpListener, TcpSocket};

use crate::error::SocketError;

/// Parse the bind address into an endpoint
pub fn resolve_endpoint(address: &str, port: u16) -> Result<SocketAddr, SocketError> {
    let ip: IpAddr = address
        .trim()
        .parse()
        .map_err(|_| SocketError::InvalidAddress(address.to_string()))?;
    Ok(SocketAddr::new(ip, port))
}

/// Create a reusable socket with the given buffer sizes and bind it
pub fn bind_socket(endpoint: SocketAddr, buffer_bytes: u32) -> Result<TcpSocket, SocketError> {
    let creation_error = |source| SocketError::Creation {
        endpoint: endpoint.to_string(),
        source,
    };

    let socket = if endpoint.is_ipv4() {
        TcpSocket::new_v4()
    } else {
        TcpSocket::new_v6()
    }
    .map_err(creation_error)?;

    socket.set_reuseaddr(true).map_err(creation_error)?;
    socket
        .set_recv_buffer_size(buffer_bytes)
        .map_err(creation_error)?;
    socket
        .set_send_buffer_size(buffer_bytes)
        .map_err(creation_error)?;
    socket.bind(endpoint).map_err(creation_error)?;

    Ok(socket)
}

/// Start listening with the given backlog
pub fn start_listening(
    socket: TcpSocket,
    endpoint: SocketAddr,
    backlog: u32,
) -> Result<TcpListener, SocketError> {
    socket.listen(backlog).map_err(|source| SocketError::Start {
        endpoint: endpoint.to_string(),
        source,
    })
}
