//! Error types for the query and stream layers.
//!
//! Transport errors are non-fatal by contract — the transport logs them and
//! drives its retry loop. Query errors surface to the session's caller as a
//! failure notification; nothing in either layer panics on bad input or bad
//! peers.

use std::time::Duration;

/// A historical-query failure, surfaced to the UI collaborator.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// The request never completed (connect refused, reset, DNS, …).
    #[error("request failed: {0}")]
    Http(#[from] hyper_util::client::legacy::Error),

    /// The request could not be constructed.
    #[error("invalid request: {0}")]
    Request(#[from] hyper::http::Error),

    /// Reading the response body failed mid-stream.
    #[error("response body error: {0}")]
    Body(#[from] hyper::Error),

    /// The server answered with a non-success status.
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    /// The client-side deadline elapsed before a response arrived.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The body did not decode as the expected payload.
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Rejected before dispatch (empty required field, inverted time range).
    #[error("{0}")]
    Validation(String),
}

/// A stream-transport failure. Internal to the reconnect loop; tests inspect
/// it through handshake helpers.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("dial failed: {0}")]
    Dial(#[source] std::io::Error),

    #[error("socket error during handshake: {0}")]
    Io(#[from] tokio_util::codec::LinesCodecError),

    #[error("could not encode subscribe frame: {0}")]
    Encode(#[source] serde_json::Error),

    /// The server closed or answered with something other than the matching
    /// subscribe ack.
    #[error("subscription rejected: {0}")]
    Handshake(String),

    #[error("handshake timed out after {0:?}")]
    Timeout(Duration),
}
