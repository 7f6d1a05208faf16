//! Core types for tailview-core.
//!
//! This module defines the data structures shared across all layers: the
//! [`LogEntry`] wire record and its [`LogLevel`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One observed log record, as pushed on the tail stream or returned by a
/// historical query.
///
/// Only `timestamp` and `level` are required; the service populates the
/// remaining fields when it has them. Unrecognized top-level keys from the
/// wire are preserved in `extra` so nothing is lost between receipt and
/// display.
///
/// Entries are immutable once admitted to a buffer — nothing in this crate
/// hands out `&mut LogEntry`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// Server-assigned record id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Event instant (UTC, ISO-8601 on the wire).
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Severity level.
    pub level: LogLevel,
    /// Originating module (deployment unit), e.g. `order-api`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    /// Logical service name within the module.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    /// Host or instance address the record came from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Deployment environment, e.g. `dev`, `prod`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<String>,
    /// Distributed-trace correlation id (wire key `traceId`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    /// Span id within the trace (wire key `spanId`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span_id: Option<String>,
    /// Emitting thread name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread: Option<String>,
    /// Human-readable message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Rendered exception / stack trace, if the record carries one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception: Option<String>,
    /// Flat string tags attached at ingest time.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub tags: HashMap<String, String>,
    /// Structured context payload.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub context: serde_json::Map<String, serde_json::Value>,
    /// Any top-level wire fields not covered above.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl LogEntry {
    /// Minimal constructor used by callers that build entries locally
    /// (test-send drafts, fixtures). Everything optional starts empty.
    pub fn new(timestamp: chrono::DateTime<chrono::Utc>, level: LogLevel) -> Self {
        Self {
            id: None,
            timestamp,
            level,
            module: None,
            service: None,
            address: None,
            env: None,
            trace_id: None,
            span_id: None,
            thread: None,
            message: None,
            exception: None,
            tags: HashMap::new(),
            context: serde_json::Map::new(),
            extra: serde_json::Map::new(),
        }
    }
}

/// Log severity level. Wire representation is the uppercase name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// All levels, lowest severity first.
    pub const ALL: [LogLevel; 5] = [
        LogLevel::Trace,
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Warn,
        LogLevel::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // pad() so width specifiers in render formats apply.
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for LogLevel {
    type Err = ParseLevelError;

    /// Case-insensitive parse of a level name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "TRACE" => Ok(LogLevel::Trace),
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARN" => Ok(LogLevel::Warn),
            "ERROR" => Ok(LogLevel::Error),
            _ => Err(ParseLevelError(s.to_string())),
        }
    }
}

/// Error returned when a string is not a recognized [`LogLevel`] name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown log level {0:?}")]
pub struct ParseLevelError(pub String);
