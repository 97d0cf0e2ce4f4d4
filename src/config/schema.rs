use serde::Deserialize;

use crate::search::ContentFormat;

/// The TOML file structure for delve.toml.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    pub llm: Option<LlmConfig>,
    pub search: Option<SearchConfig>,
    pub research: Option<ResearchConfig>,
}

#[derive(Debug, Deserialize)]
pub struct LlmConfig {
    /// Model name passed to genai (provider inferred from the name).
    pub model: Option<String>,
    pub max_retries: Option<u32>,
    /// Prompt budget in tokens.
    pub context_tokens: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct SearchConfig {
    pub provider: Option<SearchProviderKind>,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub result_limit: Option<usize>,
    /// Content format of scraped pages: "markdown" or "html".
    pub format: Option<ContentFormat>,
}

#[derive(Debug, Deserialize)]
pub struct ResearchConfig {
    /// Branches in flight per recursion level.
    pub concurrency: Option<usize>,
    pub max_learnings: Option<usize>,
}

/// Which search backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SearchProviderKind {
    Firecrawl,
    Duckduckgo,
}

/// Fully-resolved runtime configuration. All fields have values.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub model: String,
    pub llm_max_retries: u32,
    pub context_tokens: usize,
    pub search_provider: SearchProviderKind,
    pub firecrawl_api_key: Option<String>,
    pub firecrawl_base_url: Option<String>,
    pub search_timeout_secs: u64,
    pub search_result_limit: usize,
    pub content_format: ContentFormat,
    pub concurrency_limit: usize,
    pub max_learnings: usize,
}

/// Partial config used during merge. All fields are Option so that
/// missing fields don't override lower-priority values.
#[derive(Debug, Clone, Default)]
pub struct PartialConfig {
    pub model: Option<String>,
    pub llm_max_retries: Option<u32>,
    pub context_tokens: Option<usize>,
    pub search_provider: Option<SearchProviderKind>,
    pub firecrawl_api_key: Option<String>,
    pub firecrawl_base_url: Option<String>,
    pub search_timeout_secs: Option<u64>,
    pub search_result_limit: Option<usize>,
    pub content_format: Option<ContentFormat>,
    pub concurrency_limit: Option<usize>,
    pub max_learnings: Option<usize>,
}

impl ConfigFile {
    /// Flatten the sectioned file into a PartialConfig.
    pub fn to_partial(self) -> PartialConfig {
        let llm = self.llm;
        let search = self.search;
        let research = self.research;

        PartialConfig {
            model: llm.as_ref().and_then(|l| l.model.clone()),
            llm_max_retries: llm.as_ref().and_then(|l| l.max_retries),
            context_tokens: llm.as_ref().and_then(|l| l.context_tokens),
            search_provider: search.as_ref().and_then(|s| s.provider),
            firecrawl_api_key: search.as_ref().and_then(|s| s.api_key.clone()),
            firecrawl_base_url: search.as_ref().and_then(|s| s.base_url.clone()),
            search_timeout_secs: search.as_ref().and_then(|s| s.timeout_secs),
            search_result_limit: search.as_ref().and_then(|s| s.result_limit),
            content_format: search.as_ref().and_then(|s| s.format),
            concurrency_limit: research.as_ref().and_then(|r| r.concurrency),
            max_learnings: research.as_ref().and_then(|r| r.max_learnings),
        }
    }
}
