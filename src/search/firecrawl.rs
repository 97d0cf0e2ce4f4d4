//! Firecrawl search API client.
//!
//! `POST {base_url}/v1/search` returns the hits with the scraped page body
//! already converted to the requested format, so one call per query is
//! enough.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{SearchHit, SearchOptions, SearchProvider, classify_reqwest_error, http_client};
use crate::error::SearchError;

pub const DEFAULT_BASE_URL: &str = "https://api.firecrawl.dev";

pub struct FirecrawlSearch {
    api_key: String,
    base_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    query: &'a str,
    limit: usize,
    timeout: u64,
    scrape_options: ScrapeOptions,
}

#[derive(Debug, Serialize)]
struct ScrapeOptions {
    formats: Vec<&'static str>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Vec<SearchDocument>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchDocument {
    url: Option<String>,
    title: Option<String>,
    markdown: Option<String>,
    html: Option<String>,
    description: Option<String>,
}

impl FirecrawlSearch {
    pub fn new(api_key: impl Into<String>, base_url: Option<String>) -> Self {
        let base_url = base_url
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self {
            api_key: api_key.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/search", self.base_url)
    }
}

#[async_trait]
impl SearchProvider for FirecrawlSearch {
    async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<SearchHit>, SearchError> {
        let client = http_client(options.timeout)?;

        let body = SearchRequest {
            query,
            limit: options.limit,
            timeout: options.timeout.as_millis() as u64,
            scrape_options: ScrapeOptions {
                formats: vec![options.format.as_str()],
            },
        };

        let mut request = client.post(self.endpoint()).json(&body);
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| classify_reqwest_error(e, options.timeout))?;

        let status = resp.status();
        match status.as_u16() {
            401 => return Err(SearchError::Unauthorized),
            429 => return Err(SearchError::RateLimited),
            408 => {
                return Err(SearchError::Timeout {
                    timeout_ms: options.timeout.as_millis(),
                });
            }
            _ => {}
        }

        let text = resp
            .text()
            .await
            .map_err(|e| classify_reqwest_error(e, options.timeout))?;

        if !status.is_success() {
            return Err(SearchError::Http {
                status: status.as_u16(),
                message: text.chars().take(200).collect(),
            });
        }

        parse_search_response(&text, options.limit)
    }

    fn name(&self) -> &'static str {
        "firecrawl"
    }
}

/// Map a Firecrawl search response body to hits.
fn parse_search_response(body: &str, limit: usize) -> Result<Vec<SearchHit>, SearchError> {
    let parsed: SearchResponse =
        serde_json::from_str(body).map_err(|e| SearchError::InvalidResponse(e.to_string()))?;

    if !parsed.success {
        let message = parsed.error.unwrap_or_else(|| "unsuccessful search".to_string());
        return Err(SearchError::InvalidResponse(message));
    }

    Ok(parsed
        .data
        .into_iter()
        .take(limit)
        .map(|doc| SearchHit {
            url: doc.url,
            title: doc.title.or(doc.description),
            content: doc.markdown.or(doc.html),
        })
        .collect())
}
