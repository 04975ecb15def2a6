//! Chromium-based renderer using chromiumoxide.
//!
//! Each context owns its own browser process: it is launched when the
//! context is acquired and shut down when the context is closed.

use super::{RenderContext, Renderer};
use crate::acquisition::http_client::USER_AGENT;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::debug;

/// Interval between element-presence checks.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Find the Chromium binary path.
///
/// An explicit path wins when it exists; otherwise `~/.indices/chromium/`,
/// then the system `PATH`, then the common macOS install location.
pub fn find_chromium(explicit: Option<&PathBuf>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        if path.exists() {
            return Some(path.clone());
        }
    }

    if let Some(home) = dirs::home_dir() {
        let candidates = if cfg!(target_os = "macos") {
            vec![
                home.join(".indices/chromium/chrome-mac-arm64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".indices/chromium/chrome-mac-x64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".indices/chromium/chrome"),
            ]
        } else {
            vec![
                home.join(".indices/chromium/chrome-linux64/chrome"),
                home.join(".indices/chromium/chrome"),
            ]
        };
        for c in candidates {
            if c.exists() {
                return Some(c);
            }
        }
    }

    for name in ["google-chrome", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    if cfg!(target_os = "macos") {
        let common =
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// Chromium-based renderer.
pub struct ChromiumRenderer {
    executable: PathBuf,
}

impl ChromiumRenderer {
    /// Locate a Chromium binary. `None` when no engine is installed.
    pub fn detect(explicit: Option<&PathBuf>) -> Option<Self> {
        find_chromium(explicit).map(|executable| Self { executable })
    }

    /// Path of the binary this renderer launches.
    pub fn executable(&self) -> &PathBuf {
        &self.executable
    }
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn new_context(&self) -> Result<Box<dyn RenderContext>> {
        let config = BrowserConfig::builder()
            .chrome_executable(&self.executable)
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--window-size=1920,1080")
            .arg(format!("--user-agent={USER_AGENT}"))
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch Chromium")?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        let mut ctx = ChromiumContext {
            browser,
            handler,
            page: None,
        };

        let page = ctx.browser.new_page("about:blank").await;
        match page {
            Ok(page) => ctx.page = Some(page),
            Err(e) => {
                let _ = Box::new(ctx).close().await;
                bail!("failed to create new page: {e}");
            }
        }

        Ok(Box::new(ctx))
    }
}

/// A browser process with a single page.
pub struct ChromiumContext {
    browser: Browser,
    handler: JoinHandle<()>,
    page: Option<Page>,
}

impl ChromiumContext {
    fn page(&self) -> Result<&Page> {
        self.page.as_ref().context("browser context has no page")
    }
}

#[async_trait]
impl RenderContext for ChromiumContext {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<()> {
        let page = self.page()?;
        let deadline = Instant::now() + timeout;
        within(deadline, "navigation", page.goto(url)).await?;
        within(deadline, "navigation", page.wait_for_navigation()).await?;
        Ok(())
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()> {
        let page = self.page()?;
        let deadline = Instant::now() + timeout;
        loop {
            if page.find_element(selector).await.is_ok() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                bail!(
                    "no element matching '{selector}' after {}ms",
                    timeout.as_millis()
                );
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn get_html(&self) -> Result<String> {
        let result = self
            .page()?
            .evaluate("document.documentElement.outerHTML")
            .await
            .context("failed to get HTML")?;

        result
            .into_value()
            .map_err(|e| anyhow::anyhow!("failed to convert HTML result: {e:?}"))
    }

    async fn close(mut self: Box<Self>) -> Result<()> {
        if let Some(page) = self.page.take() {
            let _ = page.close().await;
        }
        let closed = self.browser.close().await;
        let _ = self.browser.wait().await;
        self.handler.abort();
        debug!("Chromium context closed");
        closed.map(|_| ()).context("failed to close browser")
    }
}

/// Await `fut` until `deadline`. Expiry and the future's own error both
/// fail with `what` in the message.
async fn within<T, E, F>(deadline: Instant, what: &str, fut: F) -> Result<T>
where
    E: std::fmt::Display,
    F: std::future::Future<Output = std::result::Result<T, E>>,
{
    let budget = deadline.saturating_duration_since(Instant::now());
    match tokio::time::timeout(budget, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => bail!("{what} failed: {e}"),
        Err(_) => bail!("{what} timed out"),
    }
}
