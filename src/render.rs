//! Plain-text rendering of log entries for the CLI.
//!
//! One entry per line: timestamp, padded level, `module/service` origin,
//! message, and the trace id when the record carries one. Kept out of
//! `main.rs` so the harnesses can assert on exact output.

use tailview_core::LogEntry;

/// Render one entry as a single output line.
pub fn line(entry: &LogEntry) -> String {
    let mut out = format!(
        "{} {:<5}",
        entry.timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
        entry.level
    );

    match (entry.module.as_deref(), entry.service.as_deref()) {
        (Some(module), Some(service)) => {
            out.push_str(&format!(" {module}/{service}"));
        }
        (Some(origin), None) | (None, Some(origin)) => {
            out.push_str(&format!(" {origin}"));
        }
        (None, None) => {}
    }

    out.push_str(" | ");
    out.push_str(entry.message.as_deref().unwrap_or("-"));

    if let Some(trace_id) = entry.trace_id.as_deref() {
        out.push_str(&format!(" trace={trace_id}"));
    }
    out
}
