//! Client execution logic with reconnection support.

use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};

use tcpframe_shared::time::unix_timestamp_millis;

use crate::{error::ClientError, formatter::MessageFormatter, session::connect};

const MAX_RECONNECT_ATTEMPTS: u32 = 5;
const RECONNECT_INTERVAL_SECS: u64 = 5;

/// How a session ended without an error
#[derive(Debug, PartialEq, Eq)]
enum SessionEnd {
    /// Input reached EOF
    InputClosed,
}

/// Run the client with reconnection logic
///
/// Lines from `input` are sent to the server; every message received is
/// printed to stdout. Returns when `input` is exhausted.
pub async fn run_client<R>(addr: String, input: R) -> Result<(), ClientError>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    let mut reconnect_count = 0;

    loop {
        tracing::info!(
            "Attempting to connect to {} (attempt {}/{})",
            addr,
            reconnect_count + 1,
            MAX_RECONNECT_ATTEMPTS
        );

        match run_client_session(&addr, &mut lines).await {
            Ok(SessionEnd::InputClosed) => {
                tracing::info!("Client session ended normally");
                return Ok(());
            }
            Err(e) => {
                tracing::warn!("Connection lost: {}", e);
                reconnect_count += 1;

                if reconnect_count >= MAX_RECONNECT_ATTEMPTS {
                    return Err(ClientError::ReconnectLimit(MAX_RECONNECT_ATTEMPTS));
                }

                tracing::info!(
                    "Reconnecting in {} seconds... (attempt {}/{})",
                    RECONNECT_INTERVAL_SECS,
                    reconnect_count + 1,
                    MAX_RECONNECT_ATTEMPTS
                );

                tokio::time::sleep(Duration::from_secs(RECONNECT_INTERVAL_SECS)).await;
            }
        }
    }
}

async fn run_client_session<R>(
    addr: &str,
    lines: &mut Lines<R>,
) -> Result<SessionEnd, ClientError>
where
    R: AsyncBufRead + Unpin,
{
    let (mut reader, mut writer) = connect(addr).await?;
    print!("{}", MessageFormatter::format_connected(addr));

    loop {
        tokio::select! {
            received = reader.next_message() => match received {
                Ok(message) => {
                    print!(
                        "{}",
                        MessageFormatter::format_message(&message, unix_timestamp_millis())
                    );
                }
                Err(e) => {
                    print!("{}", MessageFormatter::format_disconnected(addr));
                    return Err(e);
                }
            },
            line = lines.next_line() => match line? {
                Some(line) => writer.send(&line).await?,
                None => {
                    writer.shutdown().await?;
                    return Ok(SessionEnd::InputClosed);
                }
            },
        }
    }
}
