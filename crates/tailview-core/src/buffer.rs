//! Live buffer — the capacity-bounded, newest-first sequence behind Live
//! mode.
//!
//! Entries pass the admission filter exactly once, on arrival. A non-matching
//! entry is dropped and never reconsidered: changing the filter later does not
//! resurrect it. Matching entries go in at the front; overflow is trimmed from
//! the back, so index 0 is always the most recently admitted entry.

use crate::filter::FilterCriteria;
use crate::types::LogEntry;

/// Default number of entries kept in Live mode.
pub const DEFAULT_CAPACITY: usize = 500;

/// Bounded newest-first buffer with filter-then-admit semantics.
#[derive(Debug, Clone)]
pub struct LiveBuffer {
    entries: Vec<LogEntry>,
    capacity: usize,
    /// Entries admitted since the last [`clear`](LiveBuffer::clear).
    received: u64,
}

impl Default for LiveBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl LiveBuffer {
    /// A capacity of 0 is clamped to 1 — a buffer that can never hold an
    /// entry has no observable behavior.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            capacity: capacity.max(1),
            received: 0,
        }
    }

    /// Evaluate `filter` against `entry` and insert at the front on a match.
    ///
    /// Returns `true` when the entry was admitted. After insertion the buffer
    /// is trimmed from the tail back to capacity. Rejected entries are
    /// discarded outright.
    pub fn admit(&mut self, entry: LogEntry, filter: &FilterCriteria) -> bool {
        if !filter.admits(&entry) {
            return false;
        }
        self.entries.insert(0, entry);
        self.received += 1;
        if self.entries.len() > self.capacity {
            self.entries.truncate(self.capacity);
        }
        true
    }

    /// Empty the buffer and reset the received counter.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.received = 0;
    }

    /// Change capacity, trimming the tail immediately if the buffer is now
    /// over it.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        if self.entries.len() > self.capacity {
            self.entries.truncate(self.capacity);
        }
    }

    /// Entries, newest first. Shared access only — admitted entries are
    /// immutable.
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total entries admitted since the last clear. Monotonic between clears;
    /// counts entries that have since been evicted.
    pub fn received(&self) -> u64 {
        self.received
    }
}
