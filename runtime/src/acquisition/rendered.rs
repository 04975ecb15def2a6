//! Browser-rendered fetch of the rendering URL.
//!
//! The browser context is acquired at the start of each attempt and closed
//! on every exit path before the attempt returns. A failure to close is
//! logged and dropped.

use super::{Fetcher, RawContent};
use crate::config::RenderTimings;
use crate::renderer::{RenderContext, Renderer};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Fetches the page after client-side rendering in a headless browser.
pub struct RenderedFetcher {
    renderer: Arc<dyn Renderer>,
    url: String,
    timings: RenderTimings,
}

impl RenderedFetcher {
    pub fn new(renderer: Arc<dyn Renderer>, url: impl Into<String>, timings: RenderTimings) -> Self {
        Self {
            renderer,
            url: url.into(),
            timings,
        }
    }

    async fn render(&self, ctx: &mut dyn RenderContext) -> Result<String> {
        ctx.navigate(&self.url, self.timings.navigation).await?;
        ctx.wait_for_selector("body", self.timings.body_wait)
            .await
            .context("page body never appeared")?;

        tokio::time::sleep(self.timings.settle).await;

        if let Err(e) = ctx.wait_for_selector("table", self.timings.table_wait).await {
            debug!(error = %e, "no table after rendering; continuing");
        }

        ctx.get_html().await
    }
}

#[async_trait]
impl Fetcher for RenderedFetcher {
    fn name(&self) -> &'static str {
        "rendered"
    }

    async fn attempt(&self) -> Option<RawContent> {
        if !self.renderer.is_available() {
            warn!("rendering engine unavailable; skipping rendered fetch");
            return None;
        }

        info!(url = %self.url, "fetching page with headless browser");
        let mut ctx = match self.renderer.new_context().await {
            Ok(ctx) => ctx,
            Err(e) => {
                error!(error = %format!("{e:#}"), "failed to start browser");
                return None;
            }
        };

        let rendered = self.render(ctx.as_mut()).await;

        if let Err(e) = ctx.close().await {
            debug!(error = %format!("{e:#}"), "browser release failed");
        }

        match rendered {
            Ok(html) => {
                info!(bytes = html.len(), "rendered page fetched");
                Some(RawContent::Html(html))
            }
            Err(e) => {
                error!(error = %format!("{e:#}"), "rendered fetch failed");
                None
            }
        }
    }
}
