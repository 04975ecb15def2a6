//! Environment-sourced configuration.
//!
//! Every knob has a default so the binary runs with no environment at all.
//! Lookups go through a closure so tests can supply a map instead of
//! mutating the process environment.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Default JSON endpoint of the source site.
pub const DEFAULT_API_URL: &str = "https://groww.in/v1/api/stocks_data/global_indices";
/// Default rendering URL of the source site.
pub const DEFAULT_PAGE_URL: &str = "https://groww.in/indices/global-indices";
/// Default database name.
pub const DEFAULT_STORE_DB: &str = "test";
/// Default collection name.
pub const DEFAULT_STORE_COLLECTION: &str = "global_indices";
/// Store URI selecting a private in-memory database.
pub const IN_MEMORY_URI: &str = ":memory:";

/// Complete runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub source: SourceConfig,
    pub store: StoreConfig,
    pub render: RenderConfig,
}

/// Where and how the source site is fetched.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub api_url: String,
    pub page_url: String,
    pub timeout: Duration,
}

/// Document store location.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Directory holding the database files, or [`IN_MEMORY_URI`].
    pub uri: String,
    pub database: String,
    pub collection: String,
}

/// Browser discovery and rendered-fetch timings.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub chromium_path: Option<PathBuf>,
    pub timings: RenderTimings,
}

/// Bounded waits used by the rendered fetcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderTimings {
    /// Navigation timeout.
    pub navigation: Duration,
    /// Maximum wait for `body` to be present.
    pub body_wait: Duration,
    /// Fixed delay for client-side rendering.
    pub settle: Duration,
    /// Maximum wait for a `table`; expiry is not an error.
    pub table_wait: Duration,
}

impl Default for RenderTimings {
    fn default() -> Self {
        Self {
            navigation: Duration::from_secs(30),
            body_wait: Duration::from_secs(20),
            settle: Duration::from_secs(5),
            table_wait: Duration::from_secs(10),
        }
    }
}

impl RenderTimings {
    /// No waiting at all, for tests driving fake browsers.
    pub fn immediate() -> Self {
        Self {
            navigation: Duration::from_millis(100),
            body_wait: Duration::ZERO,
            settle: Duration::ZERO,
            table_wait: Duration::ZERO,
        }
    }
}

impl SourceConfig {
    /// `scheme://host[:port]` of the page URL, sent as the `Origin` header.
    pub fn origin(&self) -> String {
        Url::parse(&self.page_url)
            .map(|u| u.origin().ascii_serialization())
            .unwrap_or_default()
    }

    /// Origin with a trailing slash, sent as the `Referer` header.
    pub fn referer(&self) -> String {
        format!("{}/", self.origin())
    }
}

impl StoreConfig {
    /// Path of the SQLite file, or `None` for an in-memory store.
    pub fn database_path(&self) -> Option<PathBuf> {
        if self.uri == IN_MEMORY_URI {
            return None;
        }
        Some(PathBuf::from(&self.uri).join(format!("{}.db", self.database)))
    }
}

impl Config {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        let millis = |key: &str, default: u64| -> Result<Duration> {
            match lookup(key).filter(|v| !v.trim().is_empty()) {
                Some(raw) => raw
                    .trim()
                    .parse::<u64>()
                    .map(Duration::from_millis)
                    .with_context(|| format!("{key} must be a whole number of milliseconds, got '{raw}'")),
                None => Ok(Duration::from_millis(default)),
            }
        };

        let api_url = get("INDICES_API_URL", DEFAULT_API_URL);
        Url::parse(&api_url).with_context(|| format!("INDICES_API_URL is not a URL: {api_url}"))?;
        let page_url = get("INDICES_PAGE_URL", DEFAULT_PAGE_URL);
        Url::parse(&page_url)
            .with_context(|| format!("INDICES_PAGE_URL is not a URL: {page_url}"))?;

        let defaults = RenderTimings::default();
        let timings = RenderTimings {
            navigation: defaults.navigation,
            body_wait: millis("INDICES_RENDER_BODY_WAIT_MS", 20_000)?,
            settle: millis("INDICES_RENDER_SETTLE_MS", 5_000)?,
            table_wait: millis("INDICES_RENDER_TABLE_WAIT_MS", 10_000)?,
        };

        Ok(Self {
            source: SourceConfig {
                api_url,
                page_url,
                timeout: millis("INDICES_HTTP_TIMEOUT_MS", 30_000)?,
            },
            store: StoreConfig {
                uri: get("INDICES_STORE_URI", &default_store_dir()),
                database: get("INDICES_STORE_DB", DEFAULT_STORE_DB),
                collection: get("INDICES_STORE_COLLECTION", DEFAULT_STORE_COLLECTION),
            },
            render: RenderConfig {
                chromium_path: lookup("INDICES_CHROMIUM_PATH")
                    .filter(|v| !v.trim().is_empty())
                    .map(PathBuf::from),
                timings,
            },
        })
    }
}

fn default_store_dir() -> String {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join(".indices")
        .display()
        .to_string()
}
