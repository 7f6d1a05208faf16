#![allow(dead_code)]
//! Shared test utilities for tailview integration harnesses.
//!
//! Import everything you need via `mod common; use common::*;` at the top of
//! each harness file. The fake servers bind random loopback ports so
//! harnesses can run in parallel.

pub mod builders;
pub mod fake_log_api;
pub mod fake_stream;

pub use builders::*;
pub use fake_log_api::FakeLogApi;
pub use fake_stream::FakeStreamServer;

use tailview_core::config::Config;

/// A config wired to the given fake servers, with short timeouts so failure
/// paths resolve quickly.
pub fn test_config(api: &FakeLogApi, stream: &FakeStreamServer) -> Config {
    let mut config = Config::defaults();
    config.api.base_url = api.base_url();
    config.api.timeout_secs = 5;
    config.stream.addr = stream.addr();
    config.stream.reconnect_delay_secs = 1;
    config.stream.handshake_timeout_secs = 2;
    config
}
