//! Fetch strategies for the source site.
//!
//! Three independent producers of raw content: the JSON API, the plain
//! page, and the browser-rendered page. They share one contract,
//! [`Fetcher::attempt`], and report failure as `None` so the pipeline can
//! treat "fetch failed" as ordinary control flow.

pub mod api;
pub mod http_client;
pub mod page;
pub mod rendered;

use async_trait::async_trait;
use serde_json::Value;

pub use api::ApiFetcher;
pub use page::PageFetcher;
pub use rendered::RenderedFetcher;

/// Raw content produced by a fetcher.
#[derive(Debug, Clone, PartialEq)]
pub enum RawContent {
    /// Decoded JSON body.
    Json(Value),
    /// HTML page source.
    Html(String),
}

impl RawContent {
    /// The JSON body, if this is JSON content.
    pub fn into_json(self) -> Option<Value> {
        match self {
            RawContent::Json(v) => Some(v),
            RawContent::Html(_) => None,
        }
    }

    /// The page source, if this is HTML content.
    pub fn into_html(self) -> Option<String> {
        match self {
            RawContent::Html(s) => Some(s),
            RawContent::Json(_) => None,
        }
    }
}

/// A single fetch strategy.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Make one attempt. `None` on any failure; never panics or errors.
    async fn attempt(&self) -> Option<RawContent>;
}
