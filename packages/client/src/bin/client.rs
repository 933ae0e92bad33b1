//! Simple tcpframe client with reconnection support.
//!
//! Connects to a tcpframe server, sends each stdin line as a tab-delimited
//! message, and prints every message the server broadcasts.
//! Automatically reconnects on disconnection (max 5 attempts with 5 second interval).
//!
//! Run with:
//! ```not_rust
//! cargo run --bin tcpframe-client
//! cargo run --bin tcpframe-client -- --addr 127.0.0.1:9000
//! ```

use clap::Parser;
use tokio::io::BufReader;

use tcpframe_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "tcpframe-client")]
#[command(about = "Line-oriented client for tcpframe servers", long_about = None)]
struct Args {
    /// Server address (host:port)
    #[arg(short = 'a', long, default_value = "127.0.0.1:8080")]
    addr: String,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();

    // Run the client
    let stdin = BufReader::new(tokio::io::stdin());
    if let Err(e) = tcpframe_client::run_client(args.addr, stdin).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}
