//! `indices data`: print stored records, newest batch first.

use crate::cli::output;
use crate::config::Config;
use crate::store::IndexStore;
use anyhow::{Context, Result};
use serde_json::json;

pub async fn run() -> Result<()> {
    let config = Config::from_env()?;
    let store = IndexStore::open(&config.store).context("failed to open document store")?;
    let data = store.find_latest_first().await?;

    output::print_json(&json!({
        "count": data.len(),
        "data": data,
    }));
    Ok(())
}
