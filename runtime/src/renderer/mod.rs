//! Renderer abstraction for browser-based page rendering.
//!
//! Defines the `Renderer` and `RenderContext` traits that abstract over
//! the browser engine (currently Chromium via chromiumoxide). The browser
//! is an optional capability: when no engine is installed the process runs
//! with [`NoopRenderer`] and rendered fetches report "unavailable".

pub mod chromium;

use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

pub use chromium::{find_chromium, ChromiumRenderer};

/// A browser engine that can hand out rendering contexts.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Acquire a fresh browser context. The caller must `close` it.
    async fn new_context(&self) -> Result<Box<dyn RenderContext>>;
    /// Whether an engine is present at all.
    fn is_available(&self) -> bool {
        true
    }
}

/// A single acquired browser context.
#[async_trait]
pub trait RenderContext: Send + Sync {
    /// Navigate to a URL with a timeout.
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<()>;
    /// Wait until an element matching `selector` exists, up to `timeout`.
    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()>;
    /// Get the full page HTML.
    async fn get_html(&self) -> Result<String>;
    /// Release the context and everything it holds.
    async fn close(self: Box<Self>) -> Result<()>;
}

/// A no-op renderer used when Chromium is unavailable.
pub struct NoopRenderer;

#[async_trait]
impl Renderer for NoopRenderer {
    async fn new_context(&self) -> Result<Box<dyn RenderContext>> {
        Err(anyhow::anyhow!("browser not available; HTTP-only mode"))
    }

    fn is_available(&self) -> bool {
        false
    }
}
