//! Wire frames for the tail stream.
//!
//! The stream endpoint speaks newline-delimited JSON over a duplex socket.
//! The client opens the connection and sends a single [`ClientFrame::Subscribe`]
//! for its topic; the server acks with [`ServerFrame::Subscribed`] and then
//! pushes one [`ServerFrame::Log`] per record. Frames never span lines.

use serde::{Deserialize, Serialize};
use tailview_core::LogEntry;

/// Frames the client sends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    Subscribe { topic: String },
}

/// Frames the server sends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// Handshake ack for a subscribe.
    Subscribed { topic: String },
    /// One pushed log record.
    Log { entry: LogEntry },
    /// Server-side failure report; informational, the connection stays up.
    Error { message: String },
}

/// Encode a frame as a single line (no trailing newline — the codec adds it).
pub fn encode<F: Serialize>(frame: &F) -> Result<String, serde_json::Error> {
    serde_json::to_string(frame)
}

/// Decode one inbound line. Total: malformed input is an `Err` value.
pub fn decode(line: &str) -> Result<ServerFrame, serde_json::Error> {
    serde_json::from_str(line)
}
