//! Shared utilities for the tcpframe server and client.
//!
//! - `framing`: tab-delimited wire convention (encode, decode, reassembly)
//! - `logger`: tracing subscriber setup for the binaries
//! - `time`: clock abstraction and timestamp formatting

pub mod framing;
pub mod logger;
pub mod time;
