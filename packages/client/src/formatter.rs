//! Message formatting for terminal output.

use tcpframe_shared::time::timestamp_to_local_time;

/// Formats server messages for display
pub struct MessageFormatter;

impl MessageFormatter {
    /// Format a message received from the server
    pub fn format_message(message: &str, timestamp_millis: i64) -> String {
        format!(
            "[{}] {}\n",
            timestamp_to_local_time(timestamp_millis),
            message.trim_end_matches(['\r', '\n'])
        )
    }

    /// Banner shown once a connection is up
    pub fn format_connected(server_addr: &str) -> String {
        format!(
            "\nConnected to {}. Type messages and press Enter to send. Press Ctrl+D to exit.\n\n",
            server_addr
        )
    }

    /// Notice shown when the server goes away
    pub fn format_disconnected(server_addr: &str) -> String {
        format!("\n[disconnected from {}]\n", server_addr)
    }
}
