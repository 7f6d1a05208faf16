//! Query client — the HTTP surface of the logging service.
//!
//! Stateless beyond request/response. Every call is bounded by the
//! configured client-side timeout; a timeout is reported as a plain
//! [`QueryError::Timeout`], indistinguishable in handling from any other
//! failed query.
//!
//! All endpoints share the service's envelope convention: the interesting
//! payload is the envelope's `data` field when present, otherwise the raw
//! body. [`unwrap_envelope`] implements that exactly once for every caller.

use crate::error::QueryError;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{header, Method, Request};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tailview_core::config::ApiConfig;
use tailview_core::{FilterCriteria, LogEntry, LogLevel, Page, Pagination, TimeRange};

/// One test-send payload, POSTed to verify the ingest pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct IngestRecord {
    pub module: String,
    pub service: String,
    pub env: String,
    pub level: LogLevel,
    pub message: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl IngestRecord {
    /// Reject obviously bad payloads before any I/O happens.
    pub fn validate(&self) -> Result<(), QueryError> {
        for (name, value) in [
            ("module", &self.module),
            ("service", &self.service),
            ("message", &self.message),
        ] {
            if value.trim().is_empty() {
                return Err(QueryError::Validation(format!("{name} must not be empty")));
            }
        }
        Ok(())
    }
}

/// Per-level and per-module record counts.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Overview {
    #[serde(default)]
    pub levels: HashMap<String, u64>,
    #[serde(default)]
    pub modules: HashMap<String, u64>,
}

/// One row of a top-N aggregation.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TopEntry {
    pub name: String,
    pub count: u64,
}

/// HTTP client for the log query API. Cheap to clone — spawned query tasks
/// each take their own copy.
#[derive(Debug, Clone)]
pub struct QueryClient {
    http: Client<HttpConnector, Full<Bytes>>,
    base_url: String,
    timeout: Duration,
}

impl QueryClient {
    pub fn new(config: &ApiConfig) -> Self {
        Self {
            http: Client::builder(TokioExecutor::new()).build_http(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    // -- Search / metadata --------------------------------------------------

    /// `GET /api/logs` — one page of matching entries plus the total count.
    pub async fn search(
        &self,
        filter: &FilterCriteria,
        pagination: &Pagination,
    ) -> Result<Page, QueryError> {
        let qs = search_query(filter, pagination);
        let (payload, total) = self.get_enveloped(&format!("/api/logs?{qs}")).await?;
        let items: Vec<LogEntry> = serde_json::from_value(payload)?;
        let total = total.unwrap_or(items.len() as u64) as usize;
        Ok(Page { items, total })
    }

    /// `GET /api/logs/meta/services` — service names for an environment.
    pub async fn services(&self, env: Option<&str>) -> Result<Vec<String>, QueryError> {
        let mut qs = QueryString::new();
        qs.push_opt("env", env);
        let (payload, _) = self.get_enveloped(&format!("/api/logs/meta/services?{}", qs.build())).await?;
        Ok(serde_json::from_value(payload)?)
    }

    // -- Ingest -------------------------------------------------------------

    /// `POST /api/logs` — send one test record through the pipeline.
    /// Returns the server-assigned record id.
    pub async fn ingest(&self, record: &IngestRecord) -> Result<String, QueryError> {
        record.validate()?;
        let body = serde_json::to_vec(record)?;
        let req = Request::builder()
            .method(Method::POST)
            .uri(format!("{}/api/logs", self.base_url))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Full::new(Bytes::from(body)))?;
        let bytes = self.send(req).await?;
        let (payload, _) = unwrap_envelope(parse_body(&bytes));
        Ok(match payload {
            serde_json::Value::String(id) => id,
            other => other.to_string(),
        })
    }

    // -- Export -------------------------------------------------------------

    /// URL for an NDJSON export of everything matching `filter` — handed to
    /// the surrounding UI for direct navigation rather than parsed here.
    pub fn export_url(&self, filter: &FilterCriteria) -> String {
        let qs = filter_query(filter).build();
        format!("{}/api/logs/export?{qs}", self.base_url)
    }

    /// Fetch the export body raw. Not enveloped, not parsed as JSON.
    pub async fn export(&self, filter: &FilterCriteria) -> Result<Bytes, QueryError> {
        let req = Request::builder()
            .method(Method::GET)
            .uri(self.export_url(filter))
            .body(Full::default())?;
        self.send(req).await
    }

    // -- Retention ----------------------------------------------------------

    /// `DELETE /api/logs/before` — drop all records older than `cutoff`.
    pub async fn delete_before(
        &self,
        cutoff: chrono::DateTime<chrono::Utc>,
    ) -> Result<(), QueryError> {
        let mut qs = QueryString::new();
        qs.push("cutoff", &cutoff.to_rfc3339());
        self.delete(&format!("/api/logs/before?{}", qs.build())).await
    }

    /// `DELETE /api/logs/module/{module}/before` — per-module retention.
    pub async fn delete_module_before(
        &self,
        module: &str,
        cutoff: chrono::DateTime<chrono::Utc>,
    ) -> Result<(), QueryError> {
        let mut qs = QueryString::new();
        qs.push("cutoff", &cutoff.to_rfc3339());
        self.delete(&format!(
            "/api/logs/module/{}/before?{}",
            urlencoding::encode(module),
            qs.build()
        ))
        .await
    }

    // -- Statistics ---------------------------------------------------------

    /// `GET /api/logs/stats/overview`.
    pub async fn stats_overview(&self) -> Result<Overview, QueryError> {
        let (payload, _) = self.get_enveloped("/api/logs/stats/overview").await?;
        Ok(serde_json::from_value(payload)?)
    }

    /// `GET /api/logs/stats/hourly` — `yyyymmddHH` bucket → count for the
    /// last `hours` hours at one level.
    pub async fn stats_hourly(
        &self,
        level: LogLevel,
        hours: u32,
    ) -> Result<BTreeMap<String, u64>, QueryError> {
        let mut qs = QueryString::new();
        qs.push("level", level.as_str());
        qs.push("hours", &hours.to_string());
        let (payload, _) = self.get_enveloped(&format!("/api/logs/stats/hourly?{}", qs.build())).await?;
        Ok(serde_json::from_value(payload)?)
    }

    /// `GET /api/logs/stats/histogram` — bucketed counts for a filter.
    pub async fn histogram(
        &self,
        filter: &FilterCriteria,
        interval: &str,
    ) -> Result<BTreeMap<String, u64>, QueryError> {
        let mut qs = filter_query(filter);
        qs.push("interval", interval);
        let (payload, _) = self.get_enveloped(&format!("/api/logs/stats/histogram?{}", qs.build())).await?;
        Ok(serde_json::from_value(payload)?)
    }

    pub async fn top_services(
        &self,
        range: TimeRange,
        limit: usize,
    ) -> Result<Vec<TopEntry>, QueryError> {
        self.top("/api/logs/aggs/top/services", range, limit).await
    }

    pub async fn top_addresses(
        &self,
        range: TimeRange,
        limit: usize,
    ) -> Result<Vec<TopEntry>, QueryError> {
        self.top("/api/logs/aggs/top/addresses", range, limit).await
    }

    pub async fn top_errors(
        &self,
        range: TimeRange,
        limit: usize,
    ) -> Result<Vec<TopEntry>, QueryError> {
        self.top("/api/logs/aggs/top/errors", range, limit).await
    }

    async fn top(
        &self,
        path: &str,
        range: TimeRange,
        limit: usize,
    ) -> Result<Vec<TopEntry>, QueryError> {
        let mut qs = QueryString::new();
        qs.push("start", &range.start.to_rfc3339());
        qs.push("end", &range.end.to_rfc3339());
        qs.push("limit", &limit.to_string());
        let (payload, _) = self.get_enveloped(&format!("{path}?{}", qs.build())).await?;
        Ok(serde_json::from_value(payload)?)
    }

    // -- Plumbing -----------------------------------------------------------

    async fn get_enveloped(
        &self,
        path_and_query: &str,
    ) -> Result<(serde_json::Value, Option<u64>), QueryError> {
        let req = Request::builder()
            .method(Method::GET)
            .uri(format!("{}{path_and_query}", self.base_url))
            .header(header::ACCEPT, "application/json")
            .body(Full::default())?;
        let bytes = self.send(req).await?;
        let body: serde_json::Value = serde_json::from_slice(&bytes)?;
        Ok(unwrap_envelope(body))
    }

    async fn delete(&self, path_and_query: &str) -> Result<(), QueryError> {
        let req = Request::builder()
            .method(Method::DELETE)
            .uri(format!("{}{path_and_query}", self.base_url))
            .body(Full::default())?;
        self.send(req).await?;
        Ok(())
    }

    /// One bounded round-trip: non-success statuses and elapsed deadlines
    /// both come back as errors, never as payloads.
    async fn send(&self, req: Request<Full<Bytes>>) -> Result<Bytes, QueryError> {
        tracing::debug!(method = %req.method(), uri = %req.uri(), "query");
        let round_trip = async {
            let response = self.http.request(req).await?;
            let status = response.status();
            let bytes = response.into_body().collect().await?.to_bytes();
            if !status.is_success() {
                return Err(QueryError::Status {
                    status: status.as_u16(),
                    body: String::from_utf8_lossy(&bytes).into_owned(),
                });
            }
            Ok(bytes)
        };
        match tokio::time::timeout(self.timeout, round_trip).await {
            Ok(result) => result,
            Err(_) => Err(QueryError::Timeout(self.timeout)),
        }
    }
}

// ---------------------------------------------------------------------------
// Envelope + query strings
// ---------------------------------------------------------------------------

/// Unwrap the service's response envelope: `data` when present, else the
/// body itself; `total` when the envelope reports one.
fn unwrap_envelope(body: serde_json::Value) -> (serde_json::Value, Option<u64>) {
    match body {
        serde_json::Value::Object(mut map) if map.contains_key("data") => {
            let total = map.get("total").and_then(serde_json::Value::as_u64);
            let payload = map.remove("data").unwrap_or(serde_json::Value::Null);
            (payload, total)
        }
        other => (other, None),
    }
}

/// Parse a body that may be JSON or plain text (some maintenance endpoints
/// answer `text/plain`).
fn parse_body(bytes: &Bytes) -> serde_json::Value {
    serde_json::from_slice(bytes).unwrap_or_else(|_| {
        serde_json::Value::String(String::from_utf8_lossy(bytes).into_owned())
    })
}

/// The filter portion of a query string, shared by search, export, and
/// histogram. Unset fields are omitted entirely.
fn filter_query(filter: &FilterCriteria) -> QueryString {
    let mut qs = QueryString::new();
    qs.push_opt("module", filter.module.as_deref());
    qs.push_opt("service", filter.service.as_deref());
    qs.push_opt("env", filter.env.as_deref());
    qs.push_opt("level", filter.level.map(|l| l.as_str()));
    qs.push_opt("keyword", filter.keyword.as_deref());
    if let Some(range) = filter.range {
        qs.push("start", &range.start.to_rfc3339());
        qs.push("end", &range.end.to_rfc3339());
    }
    qs
}

/// Full search query: filter plus pagination. The wire `page` parameter is
/// 0-based; [`Pagination`] is 1-based everywhere else.
fn search_query(filter: &FilterCriteria, pagination: &Pagination) -> String {
    let mut qs = filter_query(filter);
    qs.push("page", &(pagination.page() - 1).to_string());
    qs.push("size", &pagination.size().to_string());
    qs.build()
}

struct QueryString {
    pairs: Vec<String>,
}

impl QueryString {
    fn new() -> Self {
        Self { pairs: Vec::new() }
    }

    fn push(&mut self, key: &str, value: &str) {
        self.pairs.push(format!("{key}={}", urlencoding::encode(value)));
    }

    fn push_opt(&mut self, key: &str, value: Option<&str>) {
        if let Some(value) = value {
            if !value.is_empty() {
                self.push(key, value);
            }
        }
    }

    fn build(self) -> String {
        self.pairs.join("&")
    }
}
