//! Filter criteria — the predicate shared by live admission and historical
//! queries.
//!
//! The same [`FilterCriteria`] value drives both paths, but they read it
//! differently: live admission uses module/service/env/level/keyword and
//! ignores the time range; historical queries forward every field to the
//! server. See [`FilterCriteria::admits`].

use crate::types::{LogEntry, LogLevel};

/// Environment selected when the caller does not name one.
pub const DEFAULT_ENV: &str = "dev";

/// Inclusive time window for historical queries. Only constructible with
/// `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: chrono::DateTime<chrono::Utc>,
    pub end: chrono::DateTime<chrono::Utc>,
}

impl TimeRange {
    pub fn new(
        start: chrono::DateTime<chrono::Utc>,
        end: chrono::DateTime<chrono::Utc>,
    ) -> Result<Self, InvalidTimeRange> {
        if start > end {
            return Err(InvalidTimeRange { start, end });
        }
        Ok(Self { start, end })
    }
}

/// Rejected before dispatch — an inverted window would silently match nothing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid time range: start {start} is after end {end}")]
pub struct InvalidTimeRange {
    pub start: chrono::DateTime<chrono::Utc>,
    pub end: chrono::DateTime<chrono::Utc>,
}

/// The active query/admission predicate.
///
/// `None` (or an empty string, as normalized by [`FilterCriteria::normalized`])
/// means "any" for that field.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCriteria {
    pub module: Option<String>,
    pub service: Option<String>,
    pub env: Option<String>,
    pub level: Option<LogLevel>,
    /// Free-text needle, matched case-insensitively against the serialized
    /// entry.
    pub keyword: Option<String>,
    /// Historical queries only; live admission ignores it.
    pub range: Option<TimeRange>,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            module: None,
            service: None,
            env: Some(DEFAULT_ENV.to_string()),
            level: None,
            keyword: None,
            range: None,
        }
    }
}

impl FilterCriteria {
    /// Returns a copy with empty-string fields collapsed to `None`, so UI
    /// callers can pass raw input without special-casing "".
    pub fn normalized(mut self) -> Self {
        for field in [&mut self.module, &mut self.service, &mut self.env, &mut self.keyword] {
            if field.as_deref().is_some_and(|s| s.is_empty()) {
                *field = None;
            }
        }
        self
    }

    /// Live admission predicate.
    ///
    /// module/service/env match exactly when set (an entry missing the field
    /// does not match a set filter); level matches exactly when set; keyword
    /// is a case-insensitive substring test over the JSON-serialized entry,
    /// so it also hits tags, context, and trace ids. The time range is not
    /// consulted.
    pub fn admits(&self, entry: &LogEntry) -> bool {
        if !field_matches(self.module.as_deref(), entry.module.as_deref()) {
            return false;
        }
        if !field_matches(self.service.as_deref(), entry.service.as_deref()) {
            return false;
        }
        if !field_matches(self.env.as_deref(), entry.env.as_deref()) {
            return false;
        }
        if let Some(level) = self.level {
            if entry.level != level {
                return false;
            }
        }
        if let Some(keyword) = self.keyword.as_deref() {
            if !keyword.is_empty() {
                let haystack = match serde_json::to_string(entry) {
                    Ok(s) => s.to_lowercase(),
                    // An entry that cannot re-serialize cannot match a keyword.
                    Err(_) => return false,
                };
                if !haystack.contains(&keyword.to_lowercase()) {
                    return false;
                }
            }
        }
        true
    }
}

fn field_matches(wanted: Option<&str>, actual: Option<&str>) -> bool {
    match wanted {
        None | Some("") => true,
        Some(w) => actual == Some(w),
    }
}
