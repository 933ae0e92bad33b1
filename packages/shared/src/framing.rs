//! Wire framing for tcpframe.
//!
//! Every outbound message is its UTF-8 payload followed by a single tab
//! character. Inbound data carries no framing of its own: the server hands
//! raw chunks to its host, and receivers that want whole messages feed the
//! chunks into a [`MessageAssembler`].

/// Message delimiter appended to every outbound payload.
pub const DELIMITER: char = '\t';

const DELIMITER_BYTE: u8 = b'\t';

/// Encode a payload for the wire (payload bytes + delimiter).
pub fn encode_message(payload: &str) -> Vec<u8> {
    let mut frame = Vec::with_capacity(payload.len() + 1);
    frame.extend_from_slice(payload.as_bytes());
    frame.push(DELIMITER_BYTE);
    frame
}

/// Append an encoded payload to an existing write buffer.
pub fn encode_message_into(payload: &str, buffer: &mut Vec<u8>) {
    buffer.reserve(payload.len() + 1);
    buffer.extend_from_slice(payload.as_bytes());
    buffer.push(DELIMITER_BYTE);
}

/// Decode raw inbound bytes as text.
///
/// Invalid UTF-8 sequences are replaced and trailing NUL bytes are dropped.
/// The delimiter is NOT stripped.
pub fn decode_payload(bytes: &[u8]) -> String {
    let end = bytes
        .iter()
        .rposition(|&b| b != 0)
        .map_or(0, |last| last + 1);
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

/// Reassembles delimiter-terminated messages from arbitrary byte chunks.
///
/// Bytes after the last delimiter are kept until a later chunk completes
/// them. Splitting happens on raw bytes, so a multi-byte UTF-8 character
/// cut across two chunks is still decoded correctly.
#[derive(Debug, Default)]
pub struct MessageAssembler {
    partial: Vec<u8>,
}

impl MessageAssembler {
    /// Create an empty assembler
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return every message it completed (without delimiters).
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut messages = Vec::new();

        for &byte in chunk {
            if byte == DELIMITER_BYTE {
                let frame = std::mem::take(&mut self.partial);
                messages.push(decode_payload(&frame));
            } else {
                self.partial.push(byte);
            }
        }

        messages
    }

    /// Number of buffered bytes waiting for a delimiter
    pub fn pending_len(&self) -> usize {
        self.partial.len()
    }
}
