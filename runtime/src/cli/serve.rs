//! `indices serve`: run the REST API.

use crate::rest::{self, AppState};
use crate::store::IndexStore;
use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

/// Open the store, wire the pipeline and serve until interrupted.
///
/// An unreachable store does not stop the server: `/api/scrape` still
/// answers with unsaved results and `/api/data` reports the outage.
pub async fn run(host: &str, port: u16) -> Result<()> {
    info!("starting indices v{}", env!("CARGO_PKG_VERSION"));
    let (config, pipeline) = super::pipeline_from_env()?;

    let store = match IndexStore::open(&config.store) {
        Ok(store) => Some(store),
        Err(e) => {
            warn!(error = %e, "failed to open document store");
            warn!("serving without persistence");
            None
        }
    };

    eprintln!("  Listening on http://{host}:{port}");
    rest::start(host, port, Arc::new(AppState { pipeline, store })).await?;
    eprintln!("  Server stopped.");
    Ok(())
}
