//! Recursive research engine.
//!
//! [`DeepResearch::research`] plans up to `breadth` sub-queries for the
//! query, runs search and synthesis for each through a per-call concurrency
//! gate, and recurses into every successful branch with halved breadth and
//! one less depth until depth reaches zero. Branch results flow upward by
//! value and are merged with set semantics at each level.
//!
//! Failure policy:
//! - planning failure of the top-level call propagates as
//!   [`ResearchError::Planning`];
//! - anything that fails inside a branch (search, timeout, synthesis, or the
//!   planning call of a deeper level) is logged and the branch contributes
//!   nothing.

use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use futures::future::{BoxFuture, join_all};
use tokio::sync::Semaphore;

use super::planner::QueryPlanner;
use super::progress::{ProgressCallback, ProgressReporter, ProgressUpdate};
use super::synthesizer::ResultSynthesizer;
use super::types::{ResearchState, SubQuery, next_breadth};
use crate::error::{BranchError, ResearchError, SearchError};
use crate::llm::LanguageModel;
use crate::search::{SearchHit, SearchOptions, SearchProvider};
use crate::usage::UsageCounter;

/// Tunables of the research engine.
#[derive(Debug, Clone)]
pub struct ResearchOptions {
    /// Branches in flight per call (each recursion level gets its own gate).
    pub concurrency_limit: usize,
    /// Options for every search call; `timeout` is also enforced here.
    pub search: SearchOptions,
    /// Learnings requested per search result.
    pub max_learnings: usize,
    /// Token budget for synthesis prompts.
    pub context_tokens: usize,
}

impl Default for ResearchOptions {
    fn default() -> Self {
        Self {
            concurrency_limit: 2,
            search: SearchOptions::default(),
            max_learnings: 3,
            context_tokens: 128_000,
        }
    }
}

/// Input of a top-level research call.
#[derive(Debug, Clone, Default)]
pub struct ResearchRequest {
    pub query: String,
    pub breadth: usize,
    pub depth: usize,
    /// Learnings from earlier research to build on.
    pub learnings: Vec<String>,
    /// URLs already visited by earlier research.
    pub visited_urls: Vec<String>,
}

impl ResearchRequest {
    pub fn new(query: impl Into<String>, breadth: usize, depth: usize) -> Self {
        Self {
            query: query.into(),
            breadth,
            depth,
            ..Default::default()
        }
    }
}

pub struct DeepResearch {
    planner: QueryPlanner,
    synthesizer: ResultSynthesizer,
    search: Arc<dyn SearchProvider>,
    options: ResearchOptions,
    usage: Option<Arc<UsageCounter>>,
}

impl DeepResearch {
    pub fn new(
        llm: Arc<dyn LanguageModel>,
        search: Arc<dyn SearchProvider>,
        options: ResearchOptions,
    ) -> Self {
        Self {
            planner: QueryPlanner::new(llm.clone()),
            synthesizer: ResultSynthesizer::new(llm, options.context_tokens),
            search,
            options,
            usage: None,
        }
    }

    /// Count every search call into `usage`.
    pub fn with_usage_counter(mut self, usage: Arc<UsageCounter>) -> Self {
        self.usage = Some(usage);
        self
    }

    /// Run a full research tree for `request`.
    ///
    /// `observer` is called with a progress snapshot after every state
    /// change anywhere in the tree.
    pub async fn research(
        &self,
        request: ResearchRequest,
        observer: Option<ProgressCallback>,
    ) -> Result<ResearchState, ResearchError> {
        if request.breadth == 0 {
            return Err(ResearchError::InvalidParameters(
                "breadth must be at least 1".to_string(),
            ));
        }
        if request.depth == 0 {
            return Err(ResearchError::InvalidParameters(
                "depth must be at least 1".to_string(),
            ));
        }
        if request.query.trim().is_empty() {
            return Err(ResearchError::InvalidParameters(
                "query must not be empty".to_string(),
            ));
        }

        tracing::info!(
            breadth = request.breadth,
            depth = request.depth,
            provider = self.search.name(),
            "Starting research"
        );

        let reporter = ProgressReporter::new(request.depth, request.breadth, observer);
        let inherited = ResearchState::new(request.learnings, request.visited_urls);

        let result = self
            .research_level(
                request.query,
                request.breadth,
                request.depth,
                inherited,
                &reporter,
            )
            .await?;

        tracing::info!(
            learnings = result.learnings.len(),
            visited_urls = result.visited_urls.len(),
            "Research finished"
        );

        Ok(result)
    }

    /// One level of the tree: plan, fan out through a fresh gate, fan in.
    fn research_level<'a>(
        &'a self,
        query: String,
        breadth: usize,
        depth: usize,
        inherited: ResearchState,
        reporter: &'a ProgressReporter,
    ) -> BoxFuture<'a, Result<ResearchState, ResearchError>> {
        async move {
            let sub_queries = self
                .planner
                .plan(&query, &inherited.learnings, breadth)
                .await
                .map_err(ResearchError::Planning)?;

            reporter.update(ProgressUpdate {
                add_total_queries: sub_queries.len(),
                current_query: sub_queries.first().map(|q| q.query.clone()),
                ..Default::default()
            });

            if sub_queries.is_empty() {
                return Ok(inherited);
            }

            let gate = Semaphore::new(self.options.concurrency_limit.max(1));
            let branches: Vec<_> = sub_queries
                .iter()
                .map(|sub_query| {
                    self.run_branch(&gate, sub_query, breadth, depth, &inherited, reporter)
                })
                .collect();
            let results = join_all(branches).await;

            Ok(ResearchState::merge_all(results))
        }
        .boxed()
    }

    /// Run one branch behind `gate`, converting any failure into an empty
    /// contribution.
    async fn run_branch(
        &self,
        gate: &Semaphore,
        sub_query: &SubQuery,
        breadth: usize,
        depth: usize,
        inherited: &ResearchState,
        reporter: &ProgressReporter,
    ) -> ResearchState {
        // The gate lives for the duration of this level and is never closed.
        let Ok(_permit) = gate.acquire().await else {
            return ResearchState::default();
        };

        match self
            .explore_branch(sub_query, breadth, depth, inherited, reporter)
            .await
        {
            Ok(state) => state,
            Err(e) => {
                if e.is_timeout() {
                    tracing::warn!(query = %sub_query.query, kind = e.kind(), "Timeout error running query: {e}");
                } else {
                    tracing::warn!(query = %sub_query.query, kind = e.kind(), "Error running query: {e}");
                }

                // Nested failures happen after this branch already counted itself.
                if !matches!(e, BranchError::Nested(_)) {
                    reporter.update(ProgressUpdate {
                        add_completed_queries: 1,
                        current_query: Some(sub_query.query.clone()),
                        ..Default::default()
                    });
                }

                ResearchState::default()
            }
        }
    }

    async fn explore_branch(
        &self,
        sub_query: &SubQuery,
        breadth: usize,
        depth: usize,
        inherited: &ResearchState,
        reporter: &ProgressReporter,
    ) -> Result<ResearchState, BranchError> {
        let hits = self.search_with_timeout(&sub_query.query).await?;

        let new_urls: Vec<String> = hits.iter().filter_map(|hit| hit.url.clone()).collect();
        let new_breadth = next_breadth(breadth);
        let new_depth = depth - 1;

        let batch = self
            .synthesizer
            .synthesize(
                &sub_query.query,
                &hits,
                self.options.max_learnings,
                new_breadth,
            )
            .await
            .map_err(BranchError::Synthesis)?;

        let mut state = inherited.clone();
        state.extend(batch.learnings, new_urls);

        if new_depth > 0 {
            tracing::info!(
                breadth = new_breadth,
                depth = new_depth,
                "Researching deeper"
            );

            reporter.update(ProgressUpdate {
                current_depth: Some(new_depth),
                current_breadth: Some(new_breadth),
                add_completed_queries: 1,
                current_query: Some(sub_query.query.clone()),
                ..Default::default()
            });

            let next_query = follow_up_query(&sub_query.research_goal, &batch.follow_up_questions);

            self.research_level(next_query, new_breadth, new_depth, state, reporter)
                .await
                .map_err(|e| BranchError::Nested(Box::new(e)))
        } else {
            reporter.update(ProgressUpdate {
                current_depth: Some(0),
                add_completed_queries: 1,
                current_query: Some(sub_query.query.clone()),
                ..Default::default()
            });

            Ok(state)
        }
    }

    /// Search with the configured timeout enforced at the call site.
    async fn search_with_timeout(&self, query: &str) -> Result<Vec<SearchHit>, SearchError> {
        if let Some(usage) = &self.usage {
            usage.add_tool_usage(self.search.name(), 1);
        }

        let timeout: Duration = self.options.search.timeout;
        match tokio::time::timeout(timeout, self.search.search(query, &self.options.search)).await
        {
            Ok(result) => result,
            Err(_) => Err(SearchError::Timeout {
                timeout_ms: timeout.as_millis(),
            }),
        }
    }
}

/// Query for the next level: the branch's research goal plus the follow-up
/// questions, one per line.
fn follow_up_query(research_goal: &str, follow_up_questions: &[String]) -> String {
    let directions: String = follow_up_questions
        .iter()
        .map(|q| format!("\n{q}"))
        .collect();
    format!("Previous research goal: {research_goal}\nFollow-up research directions: {directions}")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn follow_up_query_embeds_goal_and_questions() {
        let q = follow_up_query(
            "Understand async runtimes",
            &["What is tokio?".to_string(), "What is smol?".to_string()],
        );
        assert_eq!(
            q,
            "Previous research goal: Understand async runtimes\n\
             Follow-up research directions: \nWhat is tokio?\nWhat is smol?"
        );
    }

    #[test]
    fn follow_up_query_without_questions_is_trimmed() {
        let q = follow_up_query("goal", &[]);
        assert_eq!(q, "Previous research goal: goal\nFollow-up research directions:");
    }

    #[test]
    fn default_options_match_documented_defaults() {
        let opts = ResearchOptions::default();
        assert_eq!(opts.concurrency_limit, 2);
        assert_eq!(opts.search.timeout, Duration::from_secs(15));
        assert_eq!(opts.search.limit, 5);
        assert_eq!(opts.max_learnings, 3);
    }
}
