//! Web search providers.
//!
//! [`SearchProvider`] is the seam the orchestrator searches through. Two
//! backends are provided: [`FirecrawlSearch`] (API key required, returns
//! scraped Markdown directly) and [`DuckDuckGoSearch`] (zero-config, scrapes
//! the lite HTML endpoint and fetches each hit as Markdown).

pub mod duckduckgo;
pub mod fetch;
pub mod firecrawl;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SearchError;

pub use duckduckgo::DuckDuckGoSearch;
pub use firecrawl::FirecrawlSearch;

/// One search result. Any field may be missing depending on the provider
/// and on whether the page could be scraped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub url: Option<String>,
    pub title: Option<String>,
    pub content: Option<String>,
}

/// Format requested for `SearchHit::content`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ContentFormat {
    #[default]
    Markdown,
    Html,
}

impl ContentFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentFormat::Markdown => "markdown",
            ContentFormat::Html => "html",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Upper bound for the whole call, scraping included.
    pub timeout: Duration,
    /// Maximum number of hits to return.
    pub limit: usize,
    pub format: ContentFormat,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            limit: 5,
            format: ContentFormat::Markdown,
        }
    }
}

#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Search for `query` and return at most `options.limit` hits.
    async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<SearchHit>, SearchError>;

    /// Stable label for logging.
    fn name(&self) -> &'static str;
}

/// Build a shared HTTP client with the given request timeout.
pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client, SearchError> {
    reqwest::Client::builder()
        .user_agent("Mozilla/5.0 (X11; Linux x86_64; rv:120.0) Gecko/20100101 Firefox/120.0")
        .timeout(timeout)
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .map_err(|e| SearchError::Transport(format!("failed to build client: {e}")))
}

/// Classify a reqwest failure, keeping timeouts distinct.
pub(crate) fn classify_reqwest_error(e: reqwest::Error, timeout: Duration) -> SearchError {
    if e.is_timeout() {
        SearchError::Timeout {
            timeout_ms: timeout.as_millis(),
        }
    } else {
        SearchError::Transport(e.to_string())
    }
}
