//! Result synthesis: extract learnings and follow-up questions from one
//! query's search hits.

use std::sync::Arc;

use serde_json::json;

use super::prompt::{system_prompt, tagged_list, trim_prompt};
use super::types::LearningsBatch;
use crate::error::LlmError;
use crate::llm::{LanguageModel, OutputShape, invoke_structured};
use crate::search::SearchHit;

/// Token budget per content item.
pub const CONTENT_TOKEN_BUDGET: usize = 25_000;

#[derive(Clone)]
pub struct ResultSynthesizer {
    llm: Arc<dyn LanguageModel>,
    context_tokens: usize,
}

impl ResultSynthesizer {
    /// `context_tokens` bounds the whole user prompt.
    pub fn new(llm: Arc<dyn LanguageModel>, context_tokens: usize) -> Self {
        Self {
            llm,
            context_tokens,
        }
    }

    /// Extract at most `max_learnings` learnings and `max_follow_ups`
    /// follow-up questions from `hits`.
    pub async fn synthesize(
        &self,
        query: &str,
        hits: &[SearchHit],
        max_learnings: usize,
        max_follow_ups: usize,
    ) -> Result<LearningsBatch, LlmError> {
        let contents = extract_contents(hits);
        tracing::info!(query, contents = contents.len(), "Search contents collected");

        let user_prompt = trim_prompt(
            &synthesis_prompt(query, &contents, max_learnings),
            self.context_tokens,
        );
        let shape = synthesis_shape(max_learnings, max_follow_ups);

        let mut batch: LearningsBatch =
            invoke_structured(self.llm.as_ref(), &system_prompt(), &user_prompt, &shape).await?;

        batch.learnings.truncate(max_learnings);
        batch.follow_up_questions.truncate(max_follow_ups);

        tracing::info!(
            query,
            learnings = batch.learnings.len(),
            follow_ups = batch.follow_up_questions.len(),
            "Learnings extracted"
        );

        Ok(batch)
    }
}

/// Non-empty content items, each trimmed to [`CONTENT_TOKEN_BUDGET`].
fn extract_contents(hits: &[SearchHit]) -> Vec<String> {
    hits.iter()
        .filter_map(|hit| hit.content.as_deref())
        .filter(|content| !content.trim().is_empty())
        .map(|content| trim_prompt(content, CONTENT_TOKEN_BUDGET))
        .collect()
}

fn synthesis_prompt(query: &str, contents: &[String], max_learnings: usize) -> String {
    format!(
        "Given the following contents from a SERP search for the query <query>{query}</query>, \
         generate a list of learnings from the contents. Return a maximum of {max_learnings} learnings, \
         but feel free to return less if the contents are clear. Make sure each learning is unique and \
         not similar to each other. The learnings should be concise and to the point, as detailed and \
         information dense as possible. Make sure to include any entities like people, places, companies, \
         products, things, etc in the learnings, as well as any exact metrics, numbers, or dates. \
         The learnings will be used to research the topic further.\n\n<contents>{}</contents>",
        tagged_list("content", contents)
    )
}

fn synthesis_shape(max_learnings: usize, max_follow_ups: usize) -> OutputShape {
    OutputShape::new(
        "serp_learnings",
        json!({
            "type": "object",
            "properties": {
                "learnings": {
                    "type": "array",
                    "description": format!("List of learnings, max of {max_learnings}"),
                    "items": { "type": "string" }
                },
                "followUpQuestions": {
                    "type": "array",
                    "description": format!(
                        "List of follow-up questions to research the topic further, max of {max_follow_ups}"
                    ),
                    "items": { "type": "string" }
                }
            },
            "required": ["learnings", "followUpQuestions"],
            "additionalProperties": false
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct Recording {
        reply: serde_json::Value,
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LanguageModel for Recording {
        async fn invoke(
            &self,
            _system_prompt: &str,
            user_prompt: &str,
            _shape: &OutputShape,
        ) -> Result<serde_json::Value, LlmError> {
            self.prompts.lock().unwrap().push(user_prompt.to_string());
            Ok(self.reply.clone())
        }

        fn model_name(&self) -> &str {
            "recording"
        }
    }

    fn hit(url: &str, content: Option<&str>) -> SearchHit {
        SearchHit {
            url: Some(url.to_string()),
            title: None,
            content: content.map(str::to_string),
        }
    }

    #[test]
    fn blank_contents_are_skipped() {
        let hits = vec![
            hit("https://a", Some("alpha")),
            hit("https://b", None),
            hit("https://c", Some("   \n")),
        ];
        assert_eq!(extract_contents(&hits), vec!["alpha".to_string()]);
    }

    #[tokio::test]
    async fn truncates_to_requested_maxima() {
        let llm = Arc::new(Recording {
            reply: json!({
                "learnings": ["l1", "l2", "l3", "l4"],
                "followUpQuestions": ["q1", "q2", "q3"]
            }),
            prompts: Mutex::new(Vec::new()),
        });
        let synth = ResultSynthesizer::new(llm.clone(), 128_000);
        let batch = synth
            .synthesize("q", &[hit("https://a", Some("alpha"))], 3, 1)
            .await
            .unwrap();
        assert_eq!(batch.learnings, vec!["l1", "l2", "l3"]);
        assert_eq!(batch.follow_up_questions, vec!["q1"]);

        let prompts = llm.prompts.lock().unwrap();
        assert!(prompts[0].contains("<query>q</query>"));
        assert!(prompts[0].contains("<content>\nalpha\n</content>"));
    }

    #[tokio::test]
    async fn empty_output_is_a_valid_batch() {
        let llm = Arc::new(Recording {
            reply: json!({"learnings": [], "followUpQuestions": []}),
            prompts: Mutex::new(Vec::new()),
        });
        let synth = ResultSynthesizer::new(llm, 128_000);
        let batch = synth.synthesize("q", &[], 3, 2).await.unwrap();
        assert_eq!(batch, LearningsBatch::default());
    }
}
