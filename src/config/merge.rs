use super::schema::{AppConfig, PartialConfig, SearchProviderKind};

impl PartialConfig {
    /// Merge self with a lower-priority fallback.
    /// Self's non-None values take precedence.
    pub fn with_fallback(self, fallback: PartialConfig) -> PartialConfig {
        PartialConfig {
            model: self.model.or(fallback.model),
            llm_max_retries: self.llm_max_retries.or(fallback.llm_max_retries),
            context_tokens: self.context_tokens.or(fallback.context_tokens),
            search_provider: self.search_provider.or(fallback.search_provider),
            firecrawl_api_key: self.firecrawl_api_key.or(fallback.firecrawl_api_key),
            firecrawl_base_url: self.firecrawl_base_url.or(fallback.firecrawl_base_url),
            search_timeout_secs: self.search_timeout_secs.or(fallback.search_timeout_secs),
            search_result_limit: self.search_result_limit.or(fallback.search_result_limit),
            content_format: self.content_format.or(fallback.content_format),
            concurrency_limit: self.concurrency_limit.or(fallback.concurrency_limit),
            max_learnings: self.max_learnings.or(fallback.max_learnings),
        }
    }

    /// Convert to AppConfig, filling any remaining gaps with defaults.
    ///
    /// Without an explicit provider, Firecrawl is used when an API key is
    /// configured and DuckDuckGo otherwise.
    pub fn finalize(self) -> AppConfig {
        let firecrawl_api_key = self.firecrawl_api_key.filter(|k| !k.trim().is_empty());
        let search_provider = self.search_provider.unwrap_or(if firecrawl_api_key.is_some() {
            SearchProviderKind::Firecrawl
        } else {
            SearchProviderKind::Duckduckgo
        });

        AppConfig {
            model: self.model.unwrap_or_else(|| "gpt-4o-mini".to_string()),
            llm_max_retries: self.llm_max_retries.unwrap_or(2),
            context_tokens: self.context_tokens.unwrap_or(128_000),
            search_provider,
            firecrawl_api_key,
            firecrawl_base_url: self.firecrawl_base_url,
            search_timeout_secs: self.search_timeout_secs.unwrap_or(15).max(1),
            search_result_limit: self.search_result_limit.unwrap_or(5),
            content_format: self.content_format.unwrap_or_default(),
            concurrency_limit: self.concurrency_limit.unwrap_or(2).max(1),
            max_learnings: self.max_learnings.unwrap_or(3),
        }
    }
}
