//! tcpframe server host.
//!
//! Starts a TCP server, logs every notification, and broadcasts each line
//! read from stdin to all connected clients. Stops on Ctrl+C or stdin EOF.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin tcpframe-server
//! cargo run --bin tcpframe-server -- --host 0.0.0.0 --port 9000
//! cargo run --bin tcpframe-server -- --config server.json
//! ```

use std::{path::PathBuf, sync::Arc};

use clap::Parser;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc,
};

use tcpframe_server::{ServerConfig, ServerEvent, TcpServer};
use tcpframe_shared::{logger::setup_logger, time::timestamp_to_rfc3339};

#[derive(Parser, Debug)]
#[command(name = "tcpframe-server")]
#[command(about = "Polling TCP server that broadcasts stdin lines to every client", long_about = None)]
struct Args {
    /// JSON config file (flags below override its values)
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Host address to bind the server to
    #[arg(short = 'H', long)]
    host: Option<String>,

    /// Port number to bind the server to
    #[arg(short = 'p', long)]
    port: Option<u16>,

    /// Listen backlog
    #[arg(long)]
    backlog: Option<u32>,

    /// Socket send/receive buffer size in bytes
    #[arg(long)]
    buffer_bytes: Option<u32>,

    /// Default log level (overridden by RUST_LOG)
    #[arg(long, default_value = "debug")]
    log_level: String,
}

impl Args {
    fn into_config(self) -> Result<ServerConfig, tcpframe_server::ConfigError> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::from_json_file(path)?,
            None => ServerConfig::default(),
        };

        if let Some(host) = self.host {
            config.address = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(backlog) = self.backlog {
            config.max_pending_connections = backlog;
        }
        if let Some(buffer_bytes) = self.buffer_bytes {
            config.buffer_bytes = buffer_bytes;
        }

        Ok(config)
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), &args.log_level);

    let config = match args.into_config() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    };

    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let address = config.address.clone();
    let port = config.port;
    let mut server = TcpServer::new(config, Arc::new(events_tx));

    // start() / stop() は同期的にブロックするので block_in_place で呼ぶ
    let started = tokio::task::block_in_place(|| server.start(&address, port));
    if let Err(e) = started {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
    tracing::info!("Type a line and press Enter to broadcast it. Press Ctrl+C to exit.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received Ctrl+C, shutting down");
                break;
            }
            line = lines.next_line() => match line {
                Ok(Some(line)) => server.send(line),
                Ok(None) => {
                    tracing::info!("stdin closed, shutting down");
                    break;
                }
                Err(e) => {
                    tracing::error!("Failed to read stdin: {}", e);
                    break;
                }
            },
            Some(event) = events_rx.recv() => log_event(&event),
        }
    }

    tokio::task::block_in_place(|| server.stop());
    while let Ok(event) = events_rx.try_recv() {
        log_event(&event);
    }
}

fn log_event(event: &ServerEvent) {
    match event {
        ServerEvent::ListenSocketStart { local_addr } => {
            tracing::info!("Listen socket started on {}", local_addr);
        }
        ServerEvent::ListenSocketStop => tracing::info!("Listen socket stopped"),
        ServerEvent::ListenSocketError(kind) => tracing::error!("Listen socket error: {:?}", kind),
        ServerEvent::ClientConnected {
            client,
            address,
            connected_at,
        } => tracing::info!(
            "{} connected from {} at {}",
            client,
            address,
            timestamp_to_rfc3339(*connected_at)
        ),
        ServerEvent::ClientDisconnected { client, address } => {
            tracing::info!("{} ({}) disconnected", client, address);
        }
        ServerEvent::ReceivedBytes { client, bytes } => {
            tracing::debug!("{} sent {} bytes", client, bytes.len());
        }
        ServerEvent::ReceivedString { client, message } => {
            tracing::info!("{}: {:?}", client, message);
        }
    }
}
