//! The fallback chain: API → script-tag state → page markup.
//!
//! Strategies are tried cheapest and most structured first. The first
//! non-empty extraction ends the run. Parsed documents never outlive the
//! synchronous extraction step, so no `scraper::Html` crosses an await.

use crate::acquisition::http_client::SourceClient;
use crate::acquisition::{ApiFetcher, Fetcher, PageFetcher, RenderedFetcher};
use crate::config::Config;
use crate::extraction::{
    extract_from_html, extract_from_script_tags, is_empty_document, process_json_data,
};
use crate::model::IndexRecord;
use crate::renderer::Renderer;
use anyhow::Result;
use scraper::Html;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info};

/// Characters of serialized markup kept in a raw dump.
pub const RAW_STRUCTURE_LIMIT: usize = 10_000;

/// Which strategy produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionSource {
    Api,
    ScriptTag,
    Html,
}

impl ExtractionSource {
    pub fn as_str(self) -> &'static str {
        match self {
            ExtractionSource::Api => "api",
            ExtractionSource::ScriptTag => "script_tag",
            ExtractionSource::Html => "html",
        }
    }
}

/// Result of one pipeline run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScrapeOutcome {
    pub records: Vec<IndexRecord>,
    /// `None` when every strategy came up empty.
    pub source: Option<ExtractionSource>,
}

impl ScrapeOutcome {
    fn found(records: Vec<IndexRecord>, source: ExtractionSource) -> Self {
        Self {
            records,
            source: Some(source),
        }
    }
}

/// Unfiltered data for inspection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RawData {
    /// JSON from the API or a script tag.
    Structured(Value),
    /// Page text and a truncated markup dump.
    Page {
        html_content: String,
        html_structure: String,
    },
}

/// Runs fetchers and extractors in priority order.
#[derive(Clone)]
pub struct Pipeline {
    api: Arc<dyn Fetcher>,
    page: Arc<dyn Fetcher>,
    rendered: Arc<dyn Fetcher>,
}

impl Pipeline {
    pub fn new(api: Arc<dyn Fetcher>, page: Arc<dyn Fetcher>, rendered: Arc<dyn Fetcher>) -> Self {
        Self {
            api,
            page,
            rendered,
        }
    }

    /// Wire the production fetchers from configuration.
    pub fn from_config(config: &Config, renderer: Arc<dyn Renderer>) -> Result<Self> {
        let client = SourceClient::new(&config.source)?;
        Ok(Self::new(
            Arc::new(ApiFetcher::new(client.clone(), &config.source.api_url)),
            Arc::new(PageFetcher::new(client, &config.source.page_url)),
            Arc::new(RenderedFetcher::new(
                renderer,
                &config.source.page_url,
                config.render.timings,
            )),
        ))
    }

    /// Run the fallback chain once.
    pub async fn run(&self, use_renderer: bool) -> ScrapeOutcome {
        if let Some(data) = self.fetch_api().await {
            let records = process_json_data(&data);
            if !records.is_empty() {
                info!(count = records.len(), source = "api", "extracted indices");
                return ScrapeOutcome::found(records, ExtractionSource::Api);
            }
        }

        let Some(page) = self.fetch_page(use_renderer).await else {
            error!("failed to fetch page content");
            return ScrapeOutcome::default();
        };

        let outcome = extract_from_page(&page);
        match outcome.source {
            Some(source) => {
                info!(count = outcome.records.len(), source = source.as_str(), "extracted indices");
            }
            None => error!("no indices data found"),
        }
        outcome
    }

    /// Best-effort raw data: API JSON, else script-tag state, else the page
    /// itself. `None` only when nothing could be fetched.
    pub async fn raw(&self, use_renderer: bool) -> Option<RawData> {
        if let Some(data) = self.fetch_api().await {
            return Some(RawData::Structured(data));
        }

        let page = self.fetch_page(use_renderer).await?;
        Some(raw_from_page(&page))
    }

    /// API JSON, unless the call failed or returned an empty document.
    async fn fetch_api(&self) -> Option<Value> {
        self.api
            .attempt()
            .await
            .and_then(|c| c.into_json())
            .filter(|v| !is_empty_document(v))
    }

    /// Page HTML from the renderer when asked, else from plain HTTP.
    async fn fetch_page(&self, use_renderer: bool) -> Option<String> {
        if use_renderer {
            let rendered = self
                .rendered
                .attempt()
                .await
                .and_then(|c| c.into_html())
                .filter(|h| !h.is_empty());
            if rendered.is_some() {
                return rendered;
            }
            info!(
                fetcher = self.rendered.name(),
                "rendered fetch yielded nothing; falling back to plain page"
            );
        }
        self.page
            .attempt()
            .await
            .and_then(|c| c.into_html())
            .filter(|h| !h.is_empty())
    }
}

/// Script-tag state first, then the markup itself.
pub fn extract_from_page(page: &str) -> ScrapeOutcome {
    let document = Html::parse_document(page);

    if let Some(state) = extract_from_script_tags(&document) {
        let records = process_json_data(&state);
        if !records.is_empty() {
            return ScrapeOutcome::found(records, ExtractionSource::ScriptTag);
        }
    }

    let records = extract_from_html(&document);
    if !records.is_empty() {
        return ScrapeOutcome::found(records, ExtractionSource::Html);
    }

    ScrapeOutcome::default()
}

/// Script-tag state if present, otherwise page text plus a markup dump.
pub fn raw_from_page(page: &str) -> RawData {
    let document = Html::parse_document(page);

    if let Some(state) = extract_from_script_tags(&document).filter(|v| !is_empty_document(v)) {
        return RawData::Structured(state);
    }

    let html_content: String = document.root_element().text().collect();
    RawData::Page {
        html_content,
        html_structure: truncate_chars(&document.html(), RAW_STRUCTURE_LIMIT),
    }
}

/// First `limit` characters, with `...` appended when anything was cut.
fn truncate_chars(s: &str, limit: usize) -> String {
    match s.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}...", &s[..cut]),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::RawContent;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns canned content and counts attempts.
    struct Canned {
        content: Option<RawContent>,
        attempts: AtomicUsize,
    }

    impl Canned {
        fn new(content: Option<RawContent>) -> Arc<Self> {
            Arc::new(Self {
                content,
                attempts: AtomicUsize::new(0),
            })
        }

        fn attempts(&self) -> usize {
            self.attempts.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Fetcher for Canned {
        fn name(&self) -> &'static str {
            "canned"
        }

        async fn attempt(&self) -> Option<RawContent> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            self.content.clone()
        }
    }

    fn html(s: &str) -> Option<RawContent> {
        Some(RawContent::Html(s.to_string()))
    }

    const SCRIPT_PAGE: &str = r#"<html><head><script>
        window.__INITIAL_STATE__ = {"data": {"indices": [{"name": "FROM SCRIPT"}]}};
    </script></head><body></body></html>"#;

    const TABLE_PAGE: &str = r#"<html><body><table>
        <tr><th>Index</th><th>Change</th></tr>
        <tr><td>FROM TABLE</td><td>+1</td><td>x</td></tr>
    </table></body></html>"#;

    #[tokio::test]
    async fn test_api_result_short_circuits() {
        let api = Canned::new(Some(RawContent::Json(json!({"indices": [{"name": "FROM API"}]}))));
        let page = Canned::new(html(TABLE_PAGE));
        let rendered = Canned::new(None);
        let pipeline = Pipeline::new(api.clone(), page.clone(), rendered.clone());

        let outcome = pipeline.run(true).await;
        assert_eq!(outcome.source, Some(ExtractionSource::Api));
        assert_eq!(outcome.records[0].name, "FROM API");
        assert_eq!(page.attempts(), 0);
        assert_eq!(rendered.attempts(), 0);
    }

    #[tokio::test]
    async fn test_unusable_api_json_falls_back_to_script_tag() {
        let api = Canned::new(Some(RawContent::Json(json!({"status": "maintenance"}))));
        let page = Canned::new(html(SCRIPT_PAGE));
        let pipeline = Pipeline::new(api, page, Canned::new(None));

        let outcome = pipeline.run(false).await;
        assert_eq!(outcome.source, Some(ExtractionSource::ScriptTag));
        assert_eq!(outcome.records[0].name, "FROM SCRIPT");
    }

    #[tokio::test]
    async fn test_markup_is_last_resort() {
        let pipeline = Pipeline::new(Canned::new(None), Canned::new(html(TABLE_PAGE)), Canned::new(None));
        let outcome = pipeline.run(false).await;
        assert_eq!(outcome.source, Some(ExtractionSource::Html));
        assert_eq!(outcome.records[0].name, "FROM TABLE");
    }

    #[tokio::test]
    async fn test_renderer_used_only_when_requested() {
        let page = Canned::new(html(TABLE_PAGE));
        let rendered = Canned::new(html(SCRIPT_PAGE));
        let pipeline = Pipeline::new(Canned::new(None), page.clone(), rendered.clone());

        let outcome = pipeline.run(false).await;
        assert_eq!(outcome.source, Some(ExtractionSource::Html));
        assert_eq!(rendered.attempts(), 0);

        let outcome = pipeline.run(true).await;
        assert_eq!(outcome.source, Some(ExtractionSource::ScriptTag));
        assert_eq!(rendered.attempts(), 1);
        assert_eq!(page.attempts(), 1);
    }

    #[tokio::test]
    async fn test_failed_render_falls_back_to_plain_page() {
        let page = Canned::new(html(TABLE_PAGE));
        let rendered = Canned::new(None);
        let pipeline = Pipeline::new(Canned::new(None), page.clone(), rendered.clone());

        let outcome = pipeline.run(true).await;
        assert_eq!(outcome.records[0].name, "FROM TABLE");
        assert_eq!(rendered.attempts(), 1);
        assert_eq!(page.attempts(), 1);
    }

    #[tokio::test]
    async fn test_everything_failing_is_empty_not_error() {
        let pipeline = Pipeline::new(Canned::new(None), Canned::new(None), Canned::new(None));
        let outcome = pipeline.run(true).await;
        assert!(outcome.records.is_empty());
        assert_eq!(outcome.source, None);
    }

    #[tokio::test]
    async fn test_page_without_data_is_empty() {
        let pipeline = Pipeline::new(
            Canned::new(None),
            Canned::new(html("<html><body><p>Nothing here</p></body></html>")),
            Canned::new(None),
        );
        let outcome = pipeline.run(false).await;
        assert!(outcome.records.is_empty());
    }

    #[tokio::test]
    async fn test_raw_prefers_api_json() {
        let body = json!({"anything": [1, 2, 3]});
        let pipeline = Pipeline::new(
            Canned::new(Some(RawContent::Json(body.clone()))),
            Canned::new(html(TABLE_PAGE)),
            Canned::new(None),
        );
        assert_eq!(pipeline.raw(false).await, Some(RawData::Structured(body)));
    }

    #[tokio::test]
    async fn test_raw_falls_back_to_script_then_page_dump() {
        let pipeline = Pipeline::new(Canned::new(None), Canned::new(html(SCRIPT_PAGE)), Canned::new(None));
        assert!(matches!(pipeline.raw(false).await, Some(RawData::Structured(v)) if v["data"]["indices"].is_array()));

        let pipeline = Pipeline::new(Canned::new(None), Canned::new(html(TABLE_PAGE)), Canned::new(None));
        match pipeline.raw(false).await {
            Some(RawData::Page {
                html_content,
                html_structure,
            }) => {
                assert!(html_content.contains("FROM TABLE"));
                assert!(html_structure.contains("<table>"));
            }
            other => panic!("expected page dump, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_raw_total_failure_is_none() {
        let pipeline = Pipeline::new(Canned::new(None), Canned::new(None), Canned::new(None));
        assert!(pipeline.raw(true).await.is_none());
    }

    #[test]
    fn test_page_dump_is_truncated() {
        let long_cell = "x".repeat(RAW_STRUCTURE_LIMIT * 2);
        let page = format!("<html><body><p>{long_cell}</p></body></html>");
        match raw_from_page(&page) {
            RawData::Page { html_structure, .. } => {
                assert_eq!(html_structure.chars().count(), RAW_STRUCTURE_LIMIT + 3);
                assert!(html_structure.ends_with("..."));
            }
            other => panic!("expected page dump, got {other:?}"),
        }
    }

    #[test]
    fn test_truncate_chars_is_char_safe() {
        assert_eq!(truncate_chars("héllo", 2), "hé...");
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("exact", 5), "exact");
    }
}
