//! HTTP page fetch with HTML-to-Markdown conversion.
//!
//! Used by providers whose search endpoint returns only links, so every hit
//! has to be fetched and converted before it can be synthesized.

use std::time::Duration;

use super::{ContentFormat, classify_reqwest_error};
use crate::error::SearchError;

/// Fetch `url` with `client` and return its body in `format`.
///
/// HTML is converted to Markdown via `htmd` when Markdown is requested;
/// other content types are returned as-is. Bodies longer than `max_chars`
/// are cut at a character boundary. `timeout` bounds the whole request,
/// body included, and overrides the client's own timeout.
pub async fn fetch_page(
    client: &reqwest::Client,
    url: &str,
    format: ContentFormat,
    max_chars: Option<usize>,
    timeout: Duration,
) -> Result<String, SearchError> {
    let response = client
        .get(url)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| classify_reqwest_error(e, timeout))?;

    let status = response.status();
    if !status.is_success() {
        return Err(SearchError::Http {
            status: status.as_u16(),
            message: format!("fetching {url}"),
        });
    }

    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    let body = response
        .text()
        .await
        .map_err(|e| match classify_reqwest_error(e, timeout) {
            SearchError::Transport(message) => {
                SearchError::Transport(format!("failed to read body of {url}: {message}"))
            }
            other => other,
        })?;

    let output = if content_type.contains("text/html") && format == ContentFormat::Markdown {
        htmd::convert(&body).unwrap_or(body)
    } else {
        body
    };

    Ok(truncate_chars(output, max_chars))
}

/// Cut `content` to at most `max_chars` characters.
fn truncate_chars(content: String, max_chars: Option<usize>) -> String {
    match max_chars {
        Some(limit) => match content.char_indices().nth(limit) {
            Some((byte_idx, _)) => content[..byte_idx].to_string(),
            None => content,
        },
        None => content,
    }
}
