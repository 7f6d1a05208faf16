//! tailview-core — data model and state for the tailview client.
//!
//! This crate holds everything that is pure state: the [`LogEntry`] wire
//! record, the [`FilterCriteria`] admission/query predicate, the bounded
//! newest-first [`LiveBuffer`], [`Pagination`], and the layered [`config`].
//!
//! # Architecture
//!
//! ```text
//! stream transport ──► LiveBuffer ◄── FilterCriteria ──► query client
//!                          │                                  │
//!                          └────────── session ───────────────┘
//! ```
//!
//! I/O lives in `tailview-client`; nothing here suspends or owns a socket.

pub mod buffer;
pub mod config;
pub mod filter;
pub mod page;
pub mod types;

pub use buffer::LiveBuffer;
pub use filter::{FilterCriteria, TimeRange};
pub use page::{Page, Pagination};
pub use types::{LogEntry, LogLevel};
