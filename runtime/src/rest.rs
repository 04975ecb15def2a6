// Copyright 2026 Indices Contributors
// SPDX-License-Identifier: Apache-2.0

//! HTTP REST API.
//!
//! Every endpoint answers JSON. Query parameters arrive as raw string pairs,
//! the first occurrence of a repeated key wins, and they are interpreted
//! here: booleans are true only for a case-insensitive `true`, and a
//! `limit` that is not a whole number fails the request.

use crate::model::IndexRecord;
use crate::pipeline::Pipeline;
use crate::store::{IndexStore, RetentionPolicy, StoreError};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

/// Default cap on stored records in bounded mode.
pub const DEFAULT_LIMIT: usize = 100;

/// State shared by all handlers.
pub struct AppState {
    pub pipeline: Pipeline,
    /// `None` when the store could not be opened at startup.
    pub store: Option<IndexStore>,
}

/// Failures surfaced to clients as a 500 JSON payload.
#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("invalid value for '{name}': {value}")]
    InvalidParam { name: &'static str, value: String },

    #[error("Failed to connect to document store")]
    StoreUnavailable,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Failed to fetch page content")]
    FetchFailed,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!(error = %self, "request failed");
        let (message, data) = match &self {
            ApiError::StoreUnavailable => (self.to_string(), json!([])),
            ApiError::FetchFailed => (self.to_string(), Value::Null),
            _ => (format!("Error: {self}"), json!([])),
        };
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "success": false,
                "message": message,
                "data": data,
            })),
        )
            .into_response()
    }
}

/// Build the axum Router with all REST endpoints.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(describe))
        .route("/api/healthcheck", get(healthcheck))
        .route("/api/scrape", get(scrape))
        .route("/api/data", get(data))
        .route("/api/raw_data", get(raw_data))
        .layer(cors)
        .with_state(state)
}

/// Serve the REST API until Ctrl-C.
pub async fn start(host: &str, port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    info!("REST API listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("received shutdown signal");
        })
        .await?;
    Ok(())
}

// ── Parameters ──────────────────────────────────────────────────

/// Raw query parameters; every field is optional.
#[derive(Debug, Default)]
struct ScrapeParams {
    selenium: Option<String>,
    store_db: Option<String>,
    limit: Option<String>,
    use_limit: Option<String>,
    scrape_first: Option<String>,
}

impl ScrapeParams {
    /// Fold query pairs, keeping the first value of each known key.
    fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut params = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "selenium" => &mut params.selenium,
                "store_db" => &mut params.store_db,
                "limit" => &mut params.limit,
                "use_limit" => &mut params.use_limit,
                "scrape_first" => &mut params.scrape_first,
                _ => continue,
            };
            slot.get_or_insert(value);
        }
        params
    }
}

/// Parameters after defaults and validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ScrapeOptions {
    selenium: bool,
    store_db: bool,
    retention: RetentionPolicy,
}

impl ScrapeOptions {
    fn from_params(params: &ScrapeParams) -> Result<Self, ApiError> {
        let limit = match params.limit.as_deref() {
            None => DEFAULT_LIMIT,
            Some(raw) => raw.trim().parse().map_err(|_| ApiError::InvalidParam {
                name: "limit",
                value: raw.to_string(),
            })?,
        };
        Ok(Self {
            selenium: flag(&params.selenium, false),
            store_db: flag(&params.store_db, true),
            retention: RetentionPolicy::from_params(flag(&params.use_limit, true), limit),
        })
    }
}

fn flag(value: &Option<String>, default: bool) -> bool {
    value
        .as_deref()
        .map_or(default, |v| v.eq_ignore_ascii_case("true"))
}

// ── Handlers ────────────────────────────────────────────────────

async fn describe() -> Json<Value> {
    Json(json!({
        "name": "Global Indices Scraper API",
        "description": "API to scrape global market indices and keep a bounded history of them",
        "endpoints": {
            "/api/scrape": "Scrape the source site and return the data",
            "/api/data": "Get stored data with option to scrape fresh data first",
            "/api/raw_data": "Get raw unfiltered data from the source site without storing it",
            "/api/healthcheck": "Health check endpoint"
        },
        "parameters": {
            "selenium": "true/false - Whether to render the page in a headless browser (default: false)",
            "store_db": "true/false - Whether to store results (default: true)",
            "limit": format!("Number of records to keep in the store (default: {DEFAULT_LIMIT})"),
            "use_limit": "true/false - Whether to limit records (default: true)",
            "scrape_first": "true/false - Whether to scrape fresh data before returning results (default: true)"
        }
    }))
}

async fn healthcheck() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

async fn scrape(
    State(state): State<Arc<AppState>>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<Value>, ApiError> {
    let params = ScrapeParams::from_pairs(pairs);
    let opts = ScrapeOptions::from_params(&params)?;

    let mut indices = state.pipeline.run(opts.selenium).await.records;
    if opts.store_db && !indices.is_empty() {
        indices = persist_and_reload(state.store.as_ref(), indices, opts.retention).await;
    }

    Ok(Json(json!({
        "success": true,
        "message": format!("Successfully scraped {} indices", indices.len()),
        "count": indices.len(),
        "indices": indices,
    })))
}

async fn data(
    State(state): State<Arc<AppState>>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<Value>, ApiError> {
    let params = ScrapeParams::from_pairs(pairs);
    let opts = ScrapeOptions::from_params(&params)?;
    let scrape_first = flag(&params.scrape_first, true);

    let store = state.store.as_ref().ok_or(ApiError::StoreUnavailable)?;
    if let Err(e) = store.ping().await {
        error!(error = %e, "document store unreachable");
        return Err(ApiError::StoreUnavailable);
    }

    if scrape_first {
        info!("scraping fresh data before returning results");
        let indices = state.pipeline.run(opts.selenium).await.records;
        if opts.store_db && !indices.is_empty() {
            if let Err(e) = store.save(indices, opts.retention).await {
                error!(error = %e, "failed to store scraped indices");
            }
        }
    }

    let data = store.find_latest_first().await?;
    Ok(Json(json!({
        "success": true,
        "count": data.len(),
        "data": data,
    })))
}

async fn raw_data(
    State(state): State<Arc<AppState>>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<Value>, ApiError> {
    let params = ScrapeParams::from_pairs(pairs);
    let data = state
        .pipeline
        .raw(flag(&params.selenium, false))
        .await
        .ok_or(ApiError::FetchFailed)?;

    Ok(Json(json!({
        "success": true,
        "message": "Successfully retrieved raw data",
        "data": data,
    })))
}

/// Write the batch and return the stored collection. Any store failure
/// falls back to the freshly scraped records.
async fn persist_and_reload(
    store: Option<&IndexStore>,
    records: Vec<IndexRecord>,
    retention: RetentionPolicy,
) -> Vec<IndexRecord> {
    let Some(store) = store else {
        warn!("document store unavailable; returning scraped indices unsaved");
        return records;
    };

    if let Err(e) = store.save(records.clone(), retention).await {
        error!(error = %e, "failed to store scraped indices");
        return records;
    }
    match store.find_all().await {
        Ok(stored) => stored,
        Err(e) => {
            error!(error = %e, "failed to read back stored indices");
            records
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Parse through the same extractor the router uses.
    fn params(pairs: &[(&str, &str)]) -> ScrapeParams {
        let query: Vec<String> = pairs.iter().map(|(k, v)| format!("{k}={v}")).collect();
        let uri: axum::http::Uri = format!("/?{}", query.join("&")).parse().unwrap();
        ScrapeParams::from_pairs(Query::<Vec<(String, String)>>::try_from_uri(&uri).unwrap().0)
    }

    #[test]
    fn test_repeated_key_keeps_first_value() {
        let p = params(&[
            ("store_db", "false"),
            ("store_db", "true"),
            ("limit", "7"),
            ("unknown", "x"),
        ]);
        assert_eq!(p.store_db.as_deref(), Some("false"));
        assert_eq!(p.limit.as_deref(), Some("7"));
        assert!(p.selenium.is_none());
    }

    #[test]
    fn test_defaults() {
        let opts = ScrapeOptions::from_params(&ScrapeParams::default()).unwrap();
        assert!(!opts.selenium);
        assert!(opts.store_db);
        assert_eq!(opts.retention, RetentionPolicy::Bounded(DEFAULT_LIMIT));
    }

    #[test]
    fn test_booleans_are_true_only_for_true() {
        let opts = ScrapeOptions::from_params(&params(&[
            ("selenium", "TRUE"),
            ("store_db", "yes"),
            ("use_limit", "0"),
        ]))
        .unwrap();
        assert!(opts.selenium);
        assert!(!opts.store_db);
        assert_eq!(opts.retention, RetentionPolicy::Unbounded);

        assert!(!flag(&Some(String::new()), true));
        assert!(flag(&None, true));
    }

    #[test]
    fn test_limit_parsing() {
        let opts = ScrapeOptions::from_params(&params(&[("limit", "10")])).unwrap();
        assert_eq!(opts.retention, RetentionPolicy::Bounded(10));

        for bad in ["abc", "-5", "1.5"] {
            assert!(matches!(
                ScrapeOptions::from_params(&params(&[("limit", bad)])),
                Err(ApiError::InvalidParam { name: "limit", .. })
            ));
        }
    }

    #[tokio::test]
    async fn test_error_payloads() {
        let resp = ApiError::StoreUnavailable.into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let resp = ApiError::FetchFailed.into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let value: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["success"], false);
        assert_eq!(value["message"], "Failed to fetch page content");
        assert!(value["data"].is_null());
    }
}
