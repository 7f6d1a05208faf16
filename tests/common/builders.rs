//! Test builders — ergonomic constructors for `LogEntry` fixtures.
//!
//! These builders are designed for readability in test assertions, not for
//! production use. Defaults are chosen so the default `FilterCriteria`
//! (env = "dev") admits every built entry.

use tailview_core::{LogEntry, LogLevel};

/// Fluent builder for [`LogEntry`] test fixtures.
///
/// # Example
///
/// ```rust
/// let entry = LogEntryBuilder::new("timeout connecting to db")
///     .level(LogLevel::Error)
///     .service("checkout")
///     .trace_id("t-42")
///     .build();
/// ```
pub struct LogEntryBuilder {
    inner: LogEntry,
}

impl LogEntryBuilder {
    pub fn new(message: impl Into<String>) -> Self {
        let mut inner = LogEntry::new(chrono::Utc::now(), LogLevel::Info);
        inner.module = Some("test-module".to_string());
        inner.service = Some("test-service".to_string());
        inner.env = Some("dev".to_string());
        inner.message = Some(message.into());
        Self { inner }
    }

    pub fn level(mut self, level: LogLevel) -> Self {
        self.inner.level = level;
        self
    }

    pub fn module(mut self, module: impl Into<String>) -> Self {
        self.inner.module = Some(module.into());
        self
    }

    pub fn service(mut self, service: impl Into<String>) -> Self {
        self.inner.service = Some(service.into());
        self
    }

    pub fn env(mut self, env: impl Into<String>) -> Self {
        self.inner.env = Some(env.into());
        self
    }

    pub fn timestamp(mut self, ts: chrono::DateTime<chrono::Utc>) -> Self {
        self.inner.timestamp = ts;
        self
    }

    pub fn trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.inner.trace_id = Some(trace_id.into());
        self
    }

    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.inner.tags.insert(key.into(), value.into());
        self
    }

    pub fn build(self) -> LogEntry {
        self.inner
    }
}

// ---------------------------------------------------------------------------
// Convenience constructors
// ---------------------------------------------------------------------------

/// Build an INFO entry.
pub fn info_entry(message: &str) -> LogEntry {
    LogEntryBuilder::new(message).build()
}

/// Build an ERROR entry.
pub fn error_entry(message: &str) -> LogEntry {
    LogEntryBuilder::new(message).level(LogLevel::Error).build()
}

/// Build an entry attributed to a specific service.
pub fn service_entry(service: &str, message: &str) -> LogEntry {
    LogEntryBuilder::new(message).service(service).build()
}

/// Messages of a displayed slice, for order assertions.
pub fn messages(entries: &[LogEntry]) -> Vec<&str> {
    entries.iter().map(|e| e.message.as_deref().unwrap_or("-")).collect()
}
