//! tailview-client — I/O layers for the tailview client.
//!
//! Three layers, leaf-first:
//!
//! - [`query`] — stateless HTTP client for the log service's search, export,
//!   retention, and statistics endpoints.
//! - [`transport`] — the reconnecting stream subscription, run as an actor
//!   task behind a channel-based handle.
//! - [`session`] — the Live/Historical mode controller that owns both and
//!   exposes one authoritative displayed sequence.
//!
//! The session is single-owner; background tasks only talk to it over
//! channels, never by sharing state.

pub mod error;
pub mod protocol;
pub mod query;
pub mod session;
pub mod transport;

pub use error::{QueryError, TransportError};
pub use query::{IngestRecord, QueryClient};
pub use session::{Session, SessionUpdate, ViewMode};
pub use transport::{ConnectionState, StreamTransport};
