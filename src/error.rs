use std::path::PathBuf;

/// Errors related to configuration loading and parsing.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config at {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Errors raised by the language service and its structured-output boundary.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("LLM request failed: {0}")]
    Request(String),

    #[error("LLM returned no text content for `{shape}`")]
    EmptyResponse { shape: String },

    #[error("LLM output for `{shape}` is not valid JSON: {message}")]
    InvalidJson { shape: String, message: String },

    #[error("LLM output does not match `{shape}`: {message}")]
    MalformedOutput { shape: String, message: String },
}

/// Errors raised by a search provider.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Search timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u128 },

    #[error("Search request failed: {0}")]
    Transport(String),

    #[error("Search API key is invalid or expired")]
    Unauthorized,

    #[error("Search rate limit exceeded")]
    RateLimited,

    #[error("Search HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Failed to parse search response: {0}")]
    InvalidResponse(String),
}

impl SearchError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, SearchError::Timeout { .. })
    }
}

/// Errors surfaced by a top-level research call.
///
/// Only failures at the root of the tree show up here; everything below the
/// root planning call is absorbed per branch.
#[derive(Debug, thiserror::Error)]
pub enum ResearchError {
    #[error("Invalid research parameters: {0}")]
    InvalidParameters(String),

    #[error("Query planning failed: {0}")]
    Planning(#[source] LlmError),

    #[error("Report generation failed: {0}")]
    Report(#[source] LlmError),
}

/// Why a single branch contributed nothing to the merged result.
#[derive(Debug, thiserror::Error)]
pub enum BranchError {
    #[error(transparent)]
    Search(#[from] SearchError),

    #[error("synthesis failed: {0}")]
    Synthesis(#[source] LlmError),

    #[error("nested research failed: {0}")]
    Nested(#[source] Box<ResearchError>),
}

impl BranchError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, BranchError::Search(e) if e.is_timeout())
    }

    /// Short label for logs: `timeout` or `error`.
    pub fn kind(&self) -> &'static str {
        if self.is_timeout() { "timeout" } else { "error" }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn branch_error_kind_distinguishes_timeouts() {
        let timeout = BranchError::from(SearchError::Timeout { timeout_ms: 15_000 });
        assert_eq!(timeout.kind(), "timeout");

        let transport = BranchError::from(SearchError::Transport("reset".into()));
        assert_eq!(transport.kind(), "error");

        let synth = BranchError::Synthesis(LlmError::Request("down".into()));
        assert_eq!(synth.kind(), "error");
    }

    #[test]
    fn timeout_message_mentions_duration() {
        let e = SearchError::Timeout { timeout_ms: 15_000 };
        assert_eq!(e.to_string(), "Search timed out after 15000ms");
    }
}
