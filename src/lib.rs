//! tailview — live-tail and search client for a centralized logging service.
//!
//! The interesting machinery lives in the workspace members:
//!
//! ```text
//! tailview-core    data model, admission filter, live buffer, pagination, config
//! tailview-client  stream transport, query client, session controller
//! ```
//!
//! This crate is the CLI shell plus the plain-text entry renderer, exposed
//! here so the integration harnesses can import it.

pub mod render;
