//! `indices scrape` and `indices raw`: one-shot pipeline runs.

use crate::cli::output;
use crate::store::{IndexStore, RetentionPolicy};
use anyhow::{bail, Context, Result};
use serde_json::json;

/// Run the fallback chain once and print the outcome.
pub async fn run(use_renderer: bool, store: bool, limit: usize, no_limit: bool) -> Result<()> {
    let (config, pipeline) = super::pipeline_from_env()?;
    let outcome = pipeline.run(use_renderer).await;

    let mut stored = None;
    if store && !outcome.records.is_empty() {
        let index_store = IndexStore::open(&config.store).context("failed to open document store")?;
        let policy = RetentionPolicy::from_params(!no_limit, limit);
        stored = Some(index_store.save(outcome.records.clone(), policy).await?);
    }

    output::print_json(&json!({
        "source": outcome.source,
        "count": outcome.records.len(),
        "stored": stored,
        "indices": outcome.records,
    }));
    Ok(())
}

/// Print the raw payload the API endpoint would return.
pub async fn run_raw(use_renderer: bool) -> Result<()> {
    let (_, pipeline) = super::pipeline_from_env()?;
    match pipeline.raw(use_renderer).await {
        Some(data) => {
            output::print_json(&data);
            Ok(())
        }
        None => bail!("failed to fetch page content"),
    }
}
