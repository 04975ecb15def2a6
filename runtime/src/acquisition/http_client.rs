//! Async HTTP client wrapping reqwest.
//!
//! Not a browser, just HTTP requests dressed up with the headers a desktop
//! Chrome would send to the source site. No retries: every call is a single
//! attempt and any failure is returned to the caller.

use crate::config::SourceConfig;
use anyhow::{Context, Result};
use reqwest::header::{self, HeaderMap, HeaderValue};
use serde_json::Value;

/// Desktop Chrome user agent presented to the source site.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
                              AppleWebKit/537.36 (KHTML, like Gecko) \
                              Chrome/91.0.4472.124 Safari/537.36";

/// HTTP client preconfigured with browser-mimicking headers.
#[derive(Clone)]
pub struct SourceClient {
    client: reqwest::Client,
}

impl SourceClient {
    /// Build a client sending `Referer`/`Origin` for the configured site.
    pub fn new(source: &SourceConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("application/json, text/plain, */*"),
        );
        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-US,en;q=0.9"),
        );
        headers.insert(
            header::REFERER,
            HeaderValue::from_str(&source.referer()).context("invalid referer header")?,
        );
        headers.insert(
            header::ORIGIN,
            HeaderValue::from_str(&source.origin()).context("invalid origin header")?,
        );

        let client = reqwest::Client::builder()
            .timeout(source.timeout)
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self { client })
    }

    /// GET a JSON document. Non-2xx statuses and undecodable bodies are errors.
    pub async fn get_json(&self, url: &str) -> Result<Value> {
        let resp = self
            .client
            .get(url)
            .header(header::CONTENT_TYPE, "application/json")
            .send()
            .await
            .with_context(|| format!("request to {url} failed"))?
            .error_for_status()?;

        resp.json::<Value>()
            .await
            .with_context(|| format!("malformed JSON body from {url}"))
    }

    /// GET a page as text. Non-2xx statuses are errors.
    pub async fn get_text(&self, url: &str) -> Result<String> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("request to {url} failed"))?
            .error_for_status()?;

        resp.text()
            .await
            .with_context(|| format!("failed to read body from {url}"))
    }
}
