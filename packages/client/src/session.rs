//! TCP client session.

use std::collections::VecDeque;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

use tcpframe_shared::framing::{MessageAssembler, encode_message};

use crate::error::ClientError;

const READ_BUFFER_BYTES: usize = 8 * 1024;

/// Connect to a server and split the stream into reader and writer halves
pub async fn connect(addr: &str) -> Result<(MessageReader, MessageWriter), ClientError> {
    let stream = TcpStream::connect(addr)
        .await
        .map_err(|e| ClientError::Connection(format!("{}: {}", addr, e)))?;
    stream.set_nodelay(true)?;
    let local_addr = stream.local_addr()?;
    let (reader, writer) = stream.into_split();

    tracing::info!("Connected to {} from {}", addr, local_addr);

    Ok((
        MessageReader {
            reader,
            assembler: MessageAssembler::new(),
            ready: VecDeque::new(),
            buf: vec![0; READ_BUFFER_BYTES],
        },
        MessageWriter { writer },
    ))
}

/// Receiving half: yields whole messages
pub struct MessageReader {
    reader: OwnedReadHalf,
    assembler: MessageAssembler,
    ready: VecDeque<String>,
    buf: Vec<u8>,
}

impl MessageReader {
    /// Wait for the next complete message (delimiter removed).
    ///
    /// Cancel safe: bytes already read stay buffered for the next call.
    pub async fn next_message(&mut self) -> Result<String, ClientError> {
        loop {
            if let Some(message) = self.ready.pop_front() {
                return Ok(message);
            }

            let n = self.reader.read(&mut self.buf).await?;
            if n == 0 {
                if self.assembler.pending_len() > 0 {
                    tracing::warn!(
                        "Discarding {} bytes of unterminated message",
                        self.assembler.pending_len()
                    );
                }
                return Err(ClientError::Closed);
            }
            self.ready.extend(self.assembler.push(&self.buf[..n]));
        }
    }
}

/// Sending half
pub struct MessageWriter {
    writer: OwnedWriteHalf,
}

impl MessageWriter {
    /// Send one message followed by the delimiter
    pub async fn send(&mut self, message: &str) -> Result<(), ClientError> {
        self.writer.write_all(&encode_message(message)).await?;
        tracing::debug!("Sent {} bytes", message.len() + 1);
        Ok(())
    }

    /// Close the sending direction
    pub async fn shutdown(mut self) -> Result<(), ClientError> {
        self.writer.shutdown().await?;
        Ok(())
    }
}
