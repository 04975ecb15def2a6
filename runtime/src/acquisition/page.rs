//! Plain HTTP fetch of the rendering URL.

use super::http_client::SourceClient;
use super::{Fetcher, RawContent};
use async_trait::async_trait;
use tracing::{error, info};

/// Fetches the page source without executing any JavaScript.
pub struct PageFetcher {
    client: SourceClient,
    url: String,
}

impl PageFetcher {
    pub fn new(client: SourceClient, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl Fetcher for PageFetcher {
    fn name(&self) -> &'static str {
        "page"
    }

    async fn attempt(&self) -> Option<RawContent> {
        info!(url = %self.url, "fetching page over HTTP");
        match self.client.get_text(&self.url).await {
            Ok(body) => Some(RawContent::Html(body)),
            Err(e) => {
                error!(url = %self.url, error = %format!("{e:#}"), "page request failed");
                None
            }
        }
    }
}
