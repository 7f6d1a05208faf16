//! Fake log query API for integration tests.
//!
//! Spins up a minimal `axum` HTTP server on a random TCP port bound to
//! 127.0.0.1, serving the same surface the real service exposes under
//! `/api/logs`. Responses use the service's envelope
//! (`{"code": 0, "data": …, "total": …}`).
//!
//! Request shaping for race and failure tests is keyed by query-string
//! substrings: [`FakeLogApi::delay_matching`] holds a matching response for
//! a duration, [`FakeLogApi::fail_matching`] turns it into a 500. Every
//! request is recorded (method, path, normalized query) for assertions.
//!
//! # Example
//!
//! ```rust,no_run
//! # tokio_test::block_on(async {
//! use common::fake_log_api::FakeLogApi;
//!
//! let api = FakeLogApi::start().await.unwrap();
//! api.set_services("dev", &["order-service"]).await;
//! // Point your QueryClient at api.base_url()
//! # });
//! ```

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get},
    Json, Router,
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tailview_core::LogEntry;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

/// State shared between the router and test code.
#[derive(Default)]
struct ApiState {
    /// Entries served by /api/logs and /api/logs/export.
    entries: Vec<LogEntry>,
    /// env → service names for /api/logs/meta/services.
    services: HashMap<String, Vec<String>>,
    /// Bodies received by POST /api/logs.
    ingested: Vec<serde_json::Value>,
    /// Every request, as "METHOD path?query" with keys sorted.
    requests: Vec<String>,
    /// Query-substring → response delay.
    delays: Vec<(String, Duration)>,
    /// Query-substrings answered with a 500.
    failures: Vec<String>,
}

/// Handle to the running fake API server.
pub struct FakeLogApi {
    addr: SocketAddr,
    state: Arc<Mutex<ApiState>>,
}

impl FakeLogApi {
    /// Start the fake API on a random port. Returns once the server is
    /// listening.
    pub async fn start() -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let state = Arc::new(Mutex::new(ApiState::default()));

        let app = Router::new()
            .route("/api/logs", get(search_logs).post(ingest_log))
            .route("/api/logs/meta/services", get(list_services))
            .route("/api/logs/export", get(export_logs))
            .route("/api/logs/before", delete(delete_before))
            .route("/api/logs/module/{module}/before", delete(delete_module_before))
            .route("/api/logs/stats/overview", get(stats_overview))
            .route("/api/logs/stats/hourly", get(stats_hourly))
            .route("/api/logs/stats/histogram", get(stats_histogram))
            .route("/api/logs/aggs/top/services", get(top_rows))
            .route("/api/logs/aggs/top/addresses", get(top_rows))
            .route("/api/logs/aggs/top/errors", get(top_rows))
            .with_state(state.clone());

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Give the task a moment to register.
        tokio::time::sleep(Duration::from_millis(5)).await;

        Ok(Self { addr, state })
    }

    /// Base URL for the API (e.g. `http://127.0.0.1:PORT`).
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Add an entry to the searchable store.
    pub async fn add_entry(&self, entry: LogEntry) {
        self.state.lock().await.entries.push(entry);
    }

    /// Set the service list for an environment.
    pub async fn set_services(&self, env: &str, names: &[&str]) {
        self.state
            .lock()
            .await
            .services
            .insert(env.to_string(), names.iter().map(|s| s.to_string()).collect());
    }

    /// Delay any response whose normalized query string contains `needle`.
    pub async fn delay_matching(&self, needle: &str, delay: Duration) {
        self.state.lock().await.delays.push((needle.to_string(), delay));
    }

    /// Answer any request whose normalized query string contains `needle`
    /// with a 500.
    pub async fn fail_matching(&self, needle: &str) {
        self.state.lock().await.failures.push(needle.to_string());
    }

    /// All requests seen so far, as "METHOD path?query".
    pub async fn requests(&self) -> Vec<String> {
        self.state.lock().await.requests.clone()
    }

    /// Bodies received by the ingest endpoint.
    pub async fn ingested(&self) -> Vec<serde_json::Value> {
        self.state.lock().await.ingested.clone()
    }
}

// ---------------------------------------------------------------------------
// Request bookkeeping
// ---------------------------------------------------------------------------

/// Record the request and return the shaping decisions for it.
async fn note(
    state: &Arc<Mutex<ApiState>>,
    method: &str,
    path: &str,
    params: &HashMap<String, String>,
) -> (Option<Duration>, bool) {
    let mut keys: Vec<_> = params.keys().collect();
    keys.sort();
    let query = keys
        .iter()
        .map(|k| format!("{k}={}", params[k.as_str()]))
        .collect::<Vec<_>>()
        .join("&");

    let mut state = state.lock().await;
    state.requests.push(format!("{method} {path}?{query}"));

    let delay = state
        .delays
        .iter()
        .find(|(needle, _)| query.contains(needle))
        .map(|(_, d)| *d);
    let fail = state.failures.iter().any(|needle| query.contains(needle));
    (delay, fail)
}

fn envelope(data: serde_json::Value, total: Option<usize>) -> Json<serde_json::Value> {
    let mut body = serde_json::json!({"code": 0, "data": data});
    if let Some(total) = total {
        body["total"] = total.into();
    }
    Json(body)
}

fn matches(params: &HashMap<String, String>, entry: &LogEntry) -> bool {
    let field = |key: &str, actual: Option<&str>| match params.get(key).map(String::as_str) {
        None | Some("") => true,
        Some(wanted) => actual == Some(wanted),
    };
    field("module", entry.module.as_deref())
        && field("service", entry.service.as_deref())
        && field("env", entry.env.as_deref())
        && field("level", Some(entry.level.as_str()))
        && match params.get("keyword").map(String::as_str) {
            None | Some("") => true,
            Some(keyword) => serde_json::to_string(entry)
                .map(|s| s.to_lowercase().contains(&keyword.to_lowercase()))
                .unwrap_or(false),
        }
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

async fn search_logs(
    State(state): State<Arc<Mutex<ApiState>>>,
    Query(params): Query<HashMap<String, String>>,
) -> axum::response::Response {
    let (delay, fail) = note(&state, "GET", "/api/logs", &params).await;
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    if fail {
        return (StatusCode::INTERNAL_SERVER_ERROR, "search exploded").into_response();
    }

    let state = state.lock().await;
    let matched: Vec<&LogEntry> =
        state.entries.iter().filter(|e| matches(&params, e)).collect();
    let total = matched.len();

    // The wire page parameter is 0-based.
    let page: usize = params.get("page").and_then(|p| p.parse().ok()).unwrap_or(0);
    let size: usize = params.get("size").and_then(|s| s.parse().ok()).unwrap_or(100);
    let items: Vec<&LogEntry> = matched.into_iter().skip(page * size).take(size).collect();

    envelope(serde_json::to_value(items).unwrap(), Some(total)).into_response()
}

async fn ingest_log(
    State(state): State<Arc<Mutex<ApiState>>>,
    Json(body): Json<serde_json::Value>,
) -> impl IntoResponse {
    let mut state = state.lock().await;
    state.requests.push("POST /api/logs?".to_string());
    state.ingested.push(body);
    envelope(serde_json::json!("test-id-1"), None)
}

async fn list_services(
    State(state): State<Arc<Mutex<ApiState>>>,
    Query(params): Query<HashMap<String, String>>,
) -> axum::response::Response {
    let (delay, fail) = note(&state, "GET", "/api/logs/meta/services", &params).await;
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    if fail {
        return (StatusCode::INTERNAL_SERVER_ERROR, "meta exploded").into_response();
    }

    let state = state.lock().await;
    let names = params
        .get("env")
        .and_then(|env| state.services.get(env))
        .cloned()
        .unwrap_or_default();
    envelope(serde_json::to_value(names).unwrap(), None).into_response()
}

async fn export_logs(
    State(state): State<Arc<Mutex<ApiState>>>,
    Query(params): Query<HashMap<String, String>>,
) -> axum::response::Response {
    let _ = note(&state, "GET", "/api/logs/export", &params).await;
    let state = state.lock().await;
    let body = state
        .entries
        .iter()
        .filter(|e| matches(&params, e))
        .map(|e| serde_json::to_string(e).unwrap())
        .collect::<Vec<_>>()
        .join("\n");
    (StatusCode::OK, body).into_response()
}

async fn delete_before(
    State(state): State<Arc<Mutex<ApiState>>>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let _ = note(&state, "DELETE", "/api/logs/before", &params).await;
    (StatusCode::OK, "ok")
}

async fn delete_module_before(
    Path(module): Path<String>,
    State(state): State<Arc<Mutex<ApiState>>>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let path = format!("/api/logs/module/{module}/before");
    let _ = note(&state, "DELETE", &path, &params).await;
    (StatusCode::OK, "ok")
}

async fn stats_overview(State(state): State<Arc<Mutex<ApiState>>>) -> impl IntoResponse {
    let _ = note(&state, "GET", "/api/logs/stats/overview", &HashMap::new()).await;
    envelope(
        serde_json::json!({
            "levels": {"INFO": 10, "WARN": 3, "ERROR": 2},
            "modules": {"im-auth": 5}
        }),
        None,
    )
}

async fn stats_hourly(
    State(state): State<Arc<Mutex<ApiState>>>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let _ = note(&state, "GET", "/api/logs/stats/hourly", &params).await;
    envelope(serde_json::json!({"2026080609": 1, "2026080610": 4}), None)
}

async fn stats_histogram(
    State(state): State<Arc<Mutex<ApiState>>>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let _ = note(&state, "GET", "/api/logs/stats/histogram", &params).await;
    envelope(serde_json::json!({"2026080610": 2}), None)
}

async fn top_rows(
    State(state): State<Arc<Mutex<ApiState>>>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let _ = note(&state, "GET", "/api/logs/aggs/top", &params).await;
    envelope(
        serde_json::json!([
            {"name": "checkout", "count": 7},
            {"name": "gateway", "count": 3}
        ]),
        None,
    )
}
