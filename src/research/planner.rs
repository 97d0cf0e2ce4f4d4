//! Query planning: turn a topic into a bounded list of distinct search queries.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;

use super::prompt::system_prompt;
use super::types::SubQuery;
use crate::error::LlmError;
use crate::llm::{LanguageModel, OutputShape, invoke_structured};

#[derive(Debug, Deserialize)]
struct PlannedQueries {
    #[serde(default)]
    queries: Vec<SubQuery>,
}

#[derive(Clone)]
pub struct QueryPlanner {
    llm: Arc<dyn LanguageModel>,
}

impl QueryPlanner {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }

    /// Ask the model for at most `max_queries` sub-queries for `topic`.
    ///
    /// Prior learnings, when present, are offered so the model can produce
    /// more specific queries. Entries with a blank query are dropped and the
    /// list is cut to `max_queries`. Errors propagate to the caller.
    pub async fn plan(
        &self,
        topic: &str,
        prior_learnings: &[String],
        max_queries: usize,
    ) -> Result<Vec<SubQuery>, LlmError> {
        let shape = plan_shape(max_queries);
        let user_prompt = plan_prompt(topic, prior_learnings, max_queries);

        let planned: PlannedQueries =
            invoke_structured(self.llm.as_ref(), &system_prompt(), &user_prompt, &shape).await?;

        let queries: Vec<SubQuery> = planned
            .queries
            .into_iter()
            .filter(|q| !q.query.trim().is_empty())
            .take(max_queries)
            .collect();

        tracing::info!(
            count = queries.len(),
            queries = ?queries.iter().map(|q| q.query.as_str()).collect::<Vec<_>>(),
            "Planned search queries"
        );

        Ok(queries)
    }
}

fn plan_prompt(topic: &str, prior_learnings: &[String], max_queries: usize) -> String {
    let mut prompt = format!(
        "Given the following prompt from the user, generate a list of SERP queries to research the topic. \
         Return a maximum of {max_queries} queries, but feel free to return less if the original prompt is clear. \
         Make sure each query is unique and not similar to each other: <prompt>{topic}</prompt>\n\n"
    );
    if !prior_learnings.is_empty() {
        prompt.push_str(
            "Here are some learnings from previous research, use them to generate more specific queries: ",
        );
        prompt.push_str(&prior_learnings.join("\n"));
    }
    prompt
}

fn plan_shape(max_queries: usize) -> OutputShape {
    OutputShape::new(
        "serp_queries",
        json!({
            "type": "object",
            "properties": {
                "queries": {
                    "type": "array",
                    "description": format!("List of SERP queries, max of {max_queries}"),
                    "items": {
                        "type": "object",
                        "properties": {
                            "query": {
                                "type": "string",
                                "description": "The SERP query"
                            },
                            "researchGoal": {
                                "type": "string",
                                "description": "First talk about the goal of the research that this query is meant to accomplish, then go deeper into how to advance the research once the results are found, mention additional research directions. Be as specific as possible, especially for additional research directions."
                            }
                        },
                        "required": ["query", "researchGoal"],
                        "additionalProperties": false
                    }
                }
            },
            "required": ["queries"],
            "additionalProperties": false
        }),
    )
}
