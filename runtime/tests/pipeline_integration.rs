//! Fallback-chain integration tests against a mock source site.
//!
//! The API and page URLs both point at a wiremock server; the browser is
//! always the no-op renderer.

use indices_runtime::config::Config;
use indices_runtime::pipeline::{ExtractionSource, Pipeline, RawData};
use indices_runtime::renderer::NoopRenderer;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SCRIPT_PAGE: &str = r#"<!doctype html><html><head>
<script>window.__INITIAL_STATE__ = {"data": {"indices": [
  {"name": "NIKKEI 225", "absoluteChange": "-120.5", "dayHigh": "38,300"},
  {"name": "HANG SENG", "change": "+80.1"}
]}};</script>
</head><body><div id="root"></div></body></html>"#;

const TABLE_PAGE: &str = r#"<!doctype html><html><body>
<table>
  <tr><th>Index</th><th>Price</th><th>Change</th><th>High</th><th>Low</th></tr>
  <tr><td><div>S&amp;P 500</div></td><td>5,400</td><td>+12.3</td><td>5,420</td><td>5,380</td></tr>
</table>
</body></html>"#;

fn config_for(server: &MockServer) -> Config {
    let env: HashMap<&str, String> = HashMap::from([
        ("INDICES_API_URL", format!("{}/api/global_indices", server.uri())),
        ("INDICES_PAGE_URL", format!("{}/indices/global-indices", server.uri())),
        ("INDICES_HTTP_TIMEOUT_MS", "2000".to_string()),
        ("INDICES_STORE_URI", ":memory:".to_string()),
    ]);
    Config::from_lookup(|key| env.get(key).cloned()).unwrap()
}

fn pipeline_for(server: &MockServer) -> Pipeline {
    Pipeline::from_config(&config_for(server), Arc::new(NoopRenderer)).unwrap()
}

async fn mount_api(server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/api/global_indices"))
        .respond_with(response)
        .mount(server)
        .await;
}

async fn mount_page(server: &MockServer, body: &str) {
    Mock::given(method("GET"))
        .and(path("/indices/global-indices"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn api_json_is_used_first() {
    let server = MockServer::start().await;
    mount_api(
        &server,
        ResponseTemplate::new(200).set_body_json(json!({"indices": [
            {"name": "DOW JONES", "change": "-45.2", "high": "39,120", "prevClose": "39,045"}
        ]})),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/indices/global-indices"))
        .respond_with(ResponseTemplate::new(200).set_body_string(TABLE_PAGE))
        .expect(0)
        .mount(&server)
        .await;

    let outcome = pipeline_for(&server).run(false).await;
    assert_eq!(outcome.source, Some(ExtractionSource::Api));
    assert_eq!(outcome.records.len(), 1);
    let r = &outcome.records[0];
    assert_eq!(r.name, "DOW JONES");
    assert_eq!(r.change, "-45.2");
    assert_eq!(r.high, "39,120");
    assert_eq!(r.prev_close, "39,045");
    assert_eq!(r.low, "");
}

#[tokio::test]
async fn api_requests_carry_browser_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/global_indices"))
        .and(header("referer", format!("{}/", server.uri()).as_str()))
        .and(header("origin", server.uri().as_str()))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"indices": [{"name": "A"}]})))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = pipeline_for(&server).run(false).await;
    assert_eq!(outcome.source, Some(ExtractionSource::Api));
}

#[tokio::test]
async fn failed_api_falls_back_to_script_state() {
    let server = MockServer::start().await;
    mount_api(&server, ResponseTemplate::new(500)).await;
    mount_page(&server, SCRIPT_PAGE).await;

    let outcome = pipeline_for(&server).run(false).await;
    assert_eq!(outcome.source, Some(ExtractionSource::ScriptTag));
    let names: Vec<_> = outcome.records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["NIKKEI 225", "HANG SENG"]);
    assert_eq!(outcome.records[0].change, "-120.5");
    assert_eq!(outcome.records[0].high, "38,300");
}

#[tokio::test]
async fn empty_api_document_falls_back_to_table() {
    let server = MockServer::start().await;
    mount_api(&server, ResponseTemplate::new(200).set_body_json(json!({}))).await;
    mount_page(&server, TABLE_PAGE).await;

    let outcome = pipeline_for(&server).run(false).await;
    assert_eq!(outcome.source, Some(ExtractionSource::Html));
    let r = &outcome.records[0];
    assert_eq!(r.name, "S&P 500");
    assert_eq!(r.change, "+12.3");
    assert_eq!(r.high, "5,420");
    assert_eq!(r.low, "5,380");
}

#[tokio::test]
async fn malformed_api_body_falls_back() {
    let server = MockServer::start().await;
    mount_api(&server, ResponseTemplate::new(200).set_body_string("<html>not json</html>")).await;
    mount_page(&server, TABLE_PAGE).await;

    let outcome = pipeline_for(&server).run(false).await;
    assert_eq!(outcome.source, Some(ExtractionSource::Html));
}

#[tokio::test]
async fn unavailable_renderer_falls_back_to_plain_page() {
    let server = MockServer::start().await;
    mount_api(&server, ResponseTemplate::new(503)).await;
    mount_page(&server, TABLE_PAGE).await;

    let outcome = pipeline_for(&server).run(true).await;
    assert_eq!(outcome.source, Some(ExtractionSource::Html));
    assert_eq!(outcome.records.len(), 1);
}

#[tokio::test]
async fn total_failure_is_an_empty_outcome() {
    let server = MockServer::start().await;
    mount_api(&server, ResponseTemplate::new(500)).await;
    Mock::given(method("GET"))
        .and(path("/indices/global-indices"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let outcome = pipeline_for(&server).run(true).await;
    assert!(outcome.records.is_empty());
    assert_eq!(outcome.source, None);
}

#[tokio::test]
async fn raw_returns_api_json_unchanged() {
    let server = MockServer::start().await;
    let body = json!({"payload": {"anything": [1, 2, 3]}});
    mount_api(&server, ResponseTemplate::new(200).set_body_json(body.clone())).await;

    let raw = pipeline_for(&server).raw(false).await;
    assert_eq!(raw, Some(RawData::Structured(body)));
}

#[tokio::test]
async fn raw_dumps_page_without_state() {
    let server = MockServer::start().await;
    mount_api(&server, ResponseTemplate::new(500)).await;
    mount_page(&server, TABLE_PAGE).await;

    let raw = serde_json::to_value(pipeline_for(&server).raw(false).await.unwrap()).unwrap();
    assert!(raw["html_content"].as_str().unwrap().contains("S&P 500"));
    assert!(raw["html_structure"].as_str().unwrap().contains("<table>"));
}
