//! Configuration types for tailview.
//!
//! [`Config::load`] reads `~/.config/tailview/config.toml`, creating it with
//! hardcoded defaults if it does not yet exist. [`Config::defaults`] returns
//! the same defaults without touching the filesystem (useful in tests).

use serde::Deserialize;
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// Embedded defaults
// ---------------------------------------------------------------------------

const DEFAULT_CONFIG: &str = r#"
[api]
base_url     = "http://127.0.0.1:8080"
timeout_secs = 15

[stream]
addr                    = "127.0.0.1:9440"
topic                   = "logs"
reconnect_delay_secs    = 3
handshake_timeout_secs  = 5
keep_warm_in_historical = true

[live]
capacity = 500

[query]
default_env = "dev"
page_size   = 100
"#;

// ---------------------------------------------------------------------------
// Public config types
// ---------------------------------------------------------------------------

/// Top-level application configuration, loaded from
/// `~/.config/tailview/config.toml`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub live: LiveConfig,
    #[serde(default)]
    pub query: QueryConfig,
}

/// `[api]` section — the HTTP query service.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Client-side timeout for every query round-trip.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String { "http://127.0.0.1:8080".to_string() }
fn default_timeout_secs() -> u64 { 15 }

impl Default for ApiConfig {
    fn default() -> Self {
        Self { base_url: default_base_url(), timeout_secs: default_timeout_secs() }
    }
}

/// `[stream]` section — the tail stream endpoint and reconnect policy.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamConfig {
    /// `host:port` of the duplex stream endpoint.
    #[serde(default = "default_stream_addr")]
    pub addr: String,
    /// Topic subscribed to after the handshake.
    #[serde(default = "default_topic")]
    pub topic: String,
    /// Fixed delay between reconnect attempts.
    #[serde(default = "default_reconnect_delay_secs")]
    pub reconnect_delay_secs: u64,
    /// How long the subscribe handshake may take before the attempt counts
    /// as failed.
    #[serde(default = "default_handshake_timeout_secs")]
    pub handshake_timeout_secs: u64,
    /// When true, the transport stays connected while in Historical mode so
    /// Live re-entry is warm. When false, entering Historical disconnects.
    #[serde(default = "default_keep_warm")]
    pub keep_warm_in_historical: bool,
}

fn default_stream_addr() -> String { "127.0.0.1:9440".to_string() }
fn default_topic() -> String { "logs".to_string() }
fn default_reconnect_delay_secs() -> u64 { 3 }
fn default_handshake_timeout_secs() -> u64 { 5 }
fn default_keep_warm() -> bool { true }

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            addr: default_stream_addr(),
            topic: default_topic(),
            reconnect_delay_secs: default_reconnect_delay_secs(),
            handshake_timeout_secs: default_handshake_timeout_secs(),
            keep_warm_in_historical: default_keep_warm(),
        }
    }
}

/// `[live]` section — live buffer sizing.
#[derive(Debug, Clone, Deserialize)]
pub struct LiveConfig {
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

fn default_capacity() -> usize { 500 }

impl Default for LiveConfig {
    fn default() -> Self {
        Self { capacity: default_capacity() }
    }
}

/// `[query]` section — historical query defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryConfig {
    #[serde(default = "default_env")]
    pub default_env: String,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_env() -> String { "dev".to_string() }
fn default_page_size() -> usize { 100 }

impl Default for QueryConfig {
    fn default() -> Self {
        Self { default_env: default_env(), page_size: default_page_size() }
    }
}

impl Config {
    /// Load from `~/.config/tailview/config.toml`, layered on top of the
    /// built-in defaults. Creates the file with defaults if it does not exist.
    pub fn load() -> anyhow::Result<Self> {
        let path = config_path();

        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, DEFAULT_CONFIG.trim_start())?;
        }

        config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml))
            .add_source(config::File::from(path.as_path()).required(false))
            .build()?
            .try_deserialize()
            .map_err(Into::into)
    }

    /// Return the built-in defaults without touching the filesystem.
    pub fn defaults() -> Self {
        config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml))
            .build()
            .expect("built-in default config must be valid TOML")
            .try_deserialize()
            .expect("built-in default config must deserialize correctly")
    }
}

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

fn config_path() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".to_string()))
                .join(".config")
        })
        .join("tailview")
        .join("config.toml")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
