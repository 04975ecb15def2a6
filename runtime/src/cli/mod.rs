//! CLI subcommand implementations for the `indices` binary.

pub mod check_cmd;
pub mod data_cmd;
pub mod doctor;
pub mod output;
pub mod scrape_cmd;
pub mod serve;

use crate::config::Config;
use crate::pipeline::Pipeline;
use crate::renderer::{ChromiumRenderer, NoopRenderer, Renderer};
use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

/// Chromium when one can be found, otherwise a renderer that is never
/// available.
pub fn renderer_for(config: &Config) -> Arc<dyn Renderer> {
    match ChromiumRenderer::detect(config.render.chromium_path.as_ref()) {
        Some(renderer) => {
            info!(path = %renderer.executable().display(), "Chromium renderer available");
            Arc::new(renderer)
        }
        None => {
            warn!("Chromium not found; rendered fetches are disabled");
            Arc::new(NoopRenderer)
        }
    }
}

/// Load configuration and wire the production pipeline.
pub fn pipeline_from_env() -> Result<(Config, Pipeline)> {
    let config = Config::from_env()?;
    let pipeline = Pipeline::from_config(&config, renderer_for(&config))?;
    Ok((config, pipeline))
}
