//! `indices check`: smoke test against a running server.

use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::time::{Duration, Instant};
use url::Url;

/// Records the scrape check asks the server to keep.
pub const CHECK_LIMIT: usize = 10;

const HEALTH_TIMEOUT: Duration = Duration::from_secs(10);
/// Scraping through a browser can take a while.
const SCRAPE_TIMEOUT: Duration = Duration::from_secs(120);

/// Outcome of one check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: &'static str,
    pub passed: bool,
    pub detail: String,
}

/// Run every check and print a report. Fails when any check fails.
pub async fn run(base_url: &str, use_renderer: bool) -> Result<()> {
    println!("Testing indices API at {base_url}");
    println!();

    let results = run_checks(base_url, use_renderer).await?;
    for r in &results {
        let status = if r.passed { "PASSED" } else { "FAILED" };
        println!("{}: {status} ({})", r.name, r.detail);
    }

    println!();
    if results.iter().all(|r| r.passed) {
        println!("Overall: all checks passed");
        Ok(())
    } else {
        bail!("some checks failed")
    }
}

/// Healthcheck first, then a bounded scrape.
pub async fn run_checks(base_url: &str, use_renderer: bool) -> Result<Vec<CheckResult>> {
    let base = Url::parse(base_url).with_context(|| format!("invalid base URL: {base_url}"))?;
    let client = reqwest::Client::new();

    let health_url = base.join("/api/healthcheck")?;
    let health = timed_get(&client, health_url, HEALTH_TIMEOUT).await;
    let health = match health {
        Ok((status, body, elapsed)) => CheckResult {
            name: "Healthcheck",
            passed: status == 200 && body.get("status").and_then(Value::as_str) == Some("ok"),
            detail: format!("HTTP {status} in {}ms", elapsed.as_millis()),
        },
        Err(e) => failed("Healthcheck", e),
    };

    let mut scrape_url = base.join("/api/scrape")?;
    scrape_url
        .query_pairs_mut()
        .append_pair("selenium", if use_renderer { "true" } else { "false" })
        .append_pair("store_db", "true")
        .append_pair("limit", &CHECK_LIMIT.to_string());
    let scrape = match timed_get(&client, scrape_url, SCRAPE_TIMEOUT).await {
        Ok((status, body, elapsed)) => {
            let count = body
                .get("indices")
                .and_then(Value::as_array)
                .map_or(0, Vec::len);
            CheckResult {
                name: "Basic Scrape",
                passed: status == 200 && count > 0,
                detail: format!("HTTP {status}, {count} indices in {}ms", elapsed.as_millis()),
            }
        }
        Err(e) => failed("Basic Scrape", e),
    };

    Ok(vec![health, scrape])
}

async fn timed_get(
    client: &reqwest::Client,
    url: Url,
    timeout: Duration,
) -> Result<(u16, Value, Duration)> {
    let started = Instant::now();
    let resp = client
        .get(url.clone())
        .timeout(timeout)
        .send()
        .await
        .with_context(|| format!("request to {url} failed"))?;
    let status = resp.status().as_u16();
    let body = resp
        .json::<Value>()
        .await
        .with_context(|| format!("malformed JSON body from {url}"))?;
    Ok((status, body, started.elapsed()))
}

fn failed(name: &'static str, e: anyhow::Error) -> CheckResult {
    CheckResult {
        name,
        passed: false,
        detail: format!("{e:#}"),
    }
}
