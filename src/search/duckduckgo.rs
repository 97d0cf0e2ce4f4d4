//! DuckDuckGo Lite search with page scraping.
//!
//! The lite endpoint only yields links, titles and snippets, so each hit is
//! fetched concurrently and converted to Markdown. A hit whose page cannot be
//! fetched within its budget keeps its URL and falls back to the snippet as
//! content.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::future::join_all;
use scraper::{Html, Selector};

use super::fetch::fetch_page;
use super::{SearchHit, SearchOptions, SearchProvider, classify_reqwest_error, http_client};
use crate::error::SearchError;

const LITE_ENDPOINT: &str = "https://lite.duckduckgo.com/lite/";

/// Per-page character cap applied while scraping.
const MAX_PAGE_CHARS: usize = 100_000;

#[derive(Debug, Clone, Default)]
pub struct DuckDuckGoSearch;

impl DuckDuckGoSearch {
    pub fn new() -> Self {
        Self
    }
}

/// A result row parsed from the lite HTML, before scraping.
#[derive(Debug, Clone, PartialEq)]
struct LiteResult {
    title: String,
    url: String,
    snippet: String,
}

#[async_trait]
impl SearchProvider for DuckDuckGoSearch {
    async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<SearchHit>, SearchError> {
        let started = Instant::now();
        let client = http_client(options.timeout)?;

        let resp = client
            .get(LITE_ENDPOINT)
            .query(&[("q", query)])
            .send()
            .await
            .map_err(|e| classify_reqwest_error(e, options.timeout))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SearchError::Http {
                status: status.as_u16(),
                message: "DuckDuckGo lite request failed".to_string(),
            });
        }

        let html = resp
            .text()
            .await
            .map_err(|e| classify_reqwest_error(e, options.timeout))?;

        let results = parse_ddg_lite_html(&html, options.limit);
        tracing::debug!(query, hits = results.len(), "DuckDuckGo results parsed");

        let budget = page_fetch_budget(options.timeout, started.elapsed());
        let client = &client;
        let pages = join_all(results.iter().map(|r| async move {
            if budget.is_zero() {
                return None;
            }
            Some(fetch_page(client, &r.url, options.format, Some(MAX_PAGE_CHARS), budget).await)
        }))
        .await;

        Ok(results
            .into_iter()
            .zip(pages)
            .map(|(result, page)| {
                let content = match page {
                    Some(Ok(body)) if !body.trim().is_empty() => Some(body),
                    Some(Err(e)) => {
                        tracing::debug!(url = %result.url, "Page fetch failed: {e}");
                        non_empty(result.snippet)
                    }
                    _ => non_empty(result.snippet),
                };
                SearchHit {
                    url: Some(result.url),
                    title: non_empty(result.title),
                    content,
                }
            })
            .collect())
    }

    fn name(&self) -> &'static str {
        "duckduckgo"
    }
}

/// Time each page fetch may take: at most a third of the search timeout,
/// and never past what is left of it minus a tenth for assembling hits.
fn page_fetch_budget(total: Duration, elapsed: Duration) -> Duration {
    let remaining = total.saturating_sub(elapsed);
    remaining.saturating_sub(total / 10).min(total / 3)
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() { None } else { Some(s) }
}

/// Parse DuckDuckGo Lite HTML to extract search results.
///
/// The lite page uses a table layout where result rows contain:
/// - A link (`<a class="result-link">`) with the result URL and title text
/// - A subsequent row with the snippet text in a `<td class="result-snippet">`
fn parse_ddg_lite_html(html: &str, count: usize) -> Vec<LiteResult> {
    let document = Html::parse_document(html);

    let (Ok(link_selector), Ok(snippet_selector)) = (
        Selector::parse("a.result-link"),
        Selector::parse("td.result-snippet"),
    ) else {
        return Vec::new();
    };

    let links: Vec<_> = document.select(&link_selector).collect();
    let snippets: Vec<_> = document.select(&snippet_selector).collect();

    let mut results = Vec::new();

    for (i, link) in links.iter().enumerate() {
        if results.len() >= count {
            break;
        }

        let title = link.text().collect::<String>().trim().to_string();
        let url = link
            .value()
            .attr("href")
            .map(resolve_redirect)
            .unwrap_or_default();

        if title.is_empty() || url.is_empty() {
            continue;
        }

        let snippet = snippets
            .get(i)
            .map(|el| el.text().collect::<String>().trim().to_string())
            .unwrap_or_default();

        results.push(LiteResult {
            title,
            url,
            snippet,
        });
    }

    results
}

/// Unwrap DuckDuckGo's `//duckduckgo.com/l/?uddg=<target>` redirect links.
fn resolve_redirect(href: &str) -> String {
    let href = href.trim();
    let absolute = if href.starts_with("//") {
        format!("https:{href}")
    } else {
        href.to_string()
    };

    let Ok(parsed) = reqwest::Url::parse(&absolute) else {
        return absolute;
    };

    let is_redirect = parsed
        .host_str()
        .is_some_and(|h| h.ends_with("duckduckgo.com"))
        && parsed.path().starts_with("/l/");
    if !is_redirect {
        return absolute;
    }

    parsed
        .query_pairs()
        .find(|(k, _)| k == "uddg")
        .map(|(_, target)| target.into_owned())
        .unwrap_or(absolute)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_ddg_empty_html() {
        let results = parse_ddg_lite_html("<html><body></body></html>", 10);
        assert!(results.is_empty());
    }

    #[test]
    fn parse_ddg_with_results() {
        let html = r#"
        <html><body>
        <table>
            <tr>
                <td><a class="result-link" href="https://example.com">Example Title</a></td>
            </tr>
            <tr>
                <td class="result-snippet">This is a snippet</td>
            </tr>
            <tr>
                <td><a class="result-link" href="https://other.com">Other Result</a></td>
            </tr>
            <tr>
                <td class="result-snippet">Another snippet</td>
            </tr>
        </table>
        </body></html>
        "#;

        let results = parse_ddg_lite_html(html, 10);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "Example Title");
        assert_eq!(results[0].url, "https://example.com");
        assert_eq!(results[0].snippet, "This is a snippet");
        assert_eq!(results[1].url, "https://other.com");
    }

    #[test]
    fn parse_ddg_respects_count_limit() {
        let html = r#"
        <table>
            <tr><td><a class="result-link" href="https://a.com">A</a></td></tr>
            <tr><td class="result-snippet">Snippet A</td></tr>
            <tr><td><a class="result-link" href="https://b.com">B</a></td></tr>
            <tr><td class="result-snippet">Snippet B</td></tr>
            <tr><td><a class="result-link" href="https://c.com">C</a></td></tr>
            <tr><td class="result-snippet">Snippet C</td></tr>
        </table>
        "#;

        let results = parse_ddg_lite_html(html, 2);
        assert_eq!(results.len(), 2);
        assert_eq!(results[1].title, "B");
    }

    #[test]
    fn redirect_links_are_unwrapped() {
        let href = "//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.rust-lang.org%2F&rut=abc";
        assert_eq!(resolve_redirect(href), "https://www.rust-lang.org/");
    }

    #[test]
    fn page_budget_is_a_third_of_the_timeout() {
        let budget = page_fetch_budget(Duration::from_secs(15), Duration::from_secs(1));
        assert_eq!(budget, Duration::from_secs(5));
    }

    #[test]
    fn page_budget_ends_before_the_search_deadline() {
        let total = Duration::from_secs(15);
        let budget = page_fetch_budget(total, Duration::from_secs(12));
        assert_eq!(budget, Duration::from_millis(1_500));
        assert!(Duration::from_secs(12) + budget < total);
    }

    #[test]
    fn page_budget_is_zero_when_time_is_spent() {
        let budget = page_fetch_budget(Duration::from_secs(15), Duration::from_secs(14));
        assert!(budget.is_zero());
    }

    #[test]
    fn direct_links_pass_through() {
        assert_eq!(resolve_redirect(" https://a.com/x "), "https://a.com/x");
    }
}
