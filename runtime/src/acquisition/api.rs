//! Direct call to the site's JSON endpoint.

use super::http_client::SourceClient;
use super::{Fetcher, RawContent};
use async_trait::async_trait;
use tracing::{error, info};

/// Fetches the indices listing straight from the JSON API.
pub struct ApiFetcher {
    client: SourceClient,
    url: String,
}

impl ApiFetcher {
    pub fn new(client: SourceClient, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl Fetcher for ApiFetcher {
    fn name(&self) -> &'static str {
        "api"
    }

    async fn attempt(&self) -> Option<RawContent> {
        info!(url = %self.url, "fetching indices from API");
        match self.client.get_json(&self.url).await {
            Ok(body) => Some(RawContent::Json(body)),
            Err(e) => {
                error!(url = %self.url, error = %format!("{e:#}"), "API request failed");
                None
            }
        }
    }
}
