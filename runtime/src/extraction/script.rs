//! Hydration state embedded in inline `<script>` tags.

use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;
use std::sync::OnceLock;
use tracing::{error, info};

/// Global the site assigns its initial application state to.
pub const STATE_MARKER: &str = "window.__INITIAL_STATE__";

fn assignment() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"window\.__INITIAL_STATE__\s*=\s*").expect("state assignment regex is valid")
    })
}

/// Find and parse the first inline script carrying the state assignment.
///
/// The literal runs from the assignment to the first `};`. Candidates that
/// fail to parse are logged and skipped.
pub fn extract_from_script_tags(document: &Html) -> Option<Value> {
    info!("looking for state in script tags");
    let script_sel = Selector::parse("script").expect("script selector is valid");

    for script in document.select(&script_sel) {
        let text: String = script.text().collect();
        if text.is_empty() || !text.contains(STATE_MARKER) {
            continue;
        }
        let Some(literal) = state_literal(&text) else {
            error!("script mentions {STATE_MARKER} without an assignment");
            continue;
        };
        match serde_json::from_str::<Value>(&literal) {
            Ok(value) => {
                info!("found state in script tag");
                return Some(value);
            }
            Err(e) => error!(error = %e, "failed to parse script tag JSON"),
        }
    }

    None
}

/// Cut the JSON object literal out of an assignment statement.
fn state_literal(script: &str) -> Option<String> {
    let start = assignment().find(script)?.end();
    let rest = &script[start..];
    let body = rest.split("};").next().unwrap_or(rest);
    Some(format!("{body}}}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(body: &str) -> Html {
        Html::parse_document(&format!("<html><head>{body}</head><body></body></html>"))
    }

    #[test]
    fn test_extracts_state_object() {
        let html = doc(
            r#"<script>var x = 1;</script>
            <script>window.__INITIAL_STATE__ = {"indices": [{"name": "S&P 500"}]};
            window.other = true;</script>"#,
        );
        let value = extract_from_script_tags(&html).unwrap();
        assert_eq!(value["indices"][0]["name"], "S&P 500");
    }

    #[test]
    fn test_nested_object_closes_at_first_terminator() {
        let html = doc(
            r#"<script>window.__INITIAL_STATE__={"data":{"indices":[{"name":"DAX"}]}};</script>"#,
        );
        let value = extract_from_script_tags(&html).unwrap();
        assert_eq!(value["data"]["indices"][0]["name"], "DAX");
    }

    #[test]
    fn test_bad_candidate_is_skipped() {
        let html = doc(
            r#"<script>window.__INITIAL_STATE__ = {broken: };</script>
            <script>window.__INITIAL_STATE__ = {"ok": true};</script>"#,
        );
        let value = extract_from_script_tags(&html).unwrap();
        assert_eq!(value["ok"], true);
    }

    #[test]
    fn test_no_marker_is_none() {
        let html = doc(r#"<script src="/app.js"></script><script>var a = {};</script>"#);
        assert!(extract_from_script_tags(&html).is_none());
    }

    #[test]
    fn test_marker_without_assignment_is_none() {
        let html = doc(r#"<script>console.log(window.__INITIAL_STATE__);</script>"#);
        assert!(extract_from_script_tags(&html).is_none());
    }

    #[test]
    fn test_state_literal_without_terminator() {
        assert_eq!(
            state_literal(r#"window.__INITIAL_STATE__ = {"a": 1"#).as_deref(),
            Some(r#"{"a": 1}"#)
        );
    }
}
