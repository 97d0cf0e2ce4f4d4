//! Final write-up of a finished research tree: a long-form Markdown report
//! or a concise exact answer.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;

use super::prompt::{system_prompt, tagged_list, trim_prompt};
use crate::error::ResearchError;
use crate::llm::{LanguageModel, OutputShape, invoke_structured};

#[derive(Debug, Deserialize)]
struct FinalReport {
    #[serde(rename = "reportMarkdown")]
    report_markdown: String,
}

#[derive(Debug, Deserialize)]
struct FinalAnswer {
    #[serde(rename = "exactAnswer")]
    exact_answer: String,
}

#[derive(Clone)]
pub struct ReportWriter {
    llm: Arc<dyn LanguageModel>,
    context_tokens: usize,
}

impl ReportWriter {
    pub fn new(llm: Arc<dyn LanguageModel>, context_tokens: usize) -> Self {
        Self {
            llm,
            context_tokens,
        }
    }

    /// Write a detailed Markdown report and append a `## Sources` section
    /// listing `visited_urls`.
    pub async fn write_final_report(
        &self,
        prompt: &str,
        learnings: &[String],
        visited_urls: &[String],
    ) -> Result<String, ResearchError> {
        let user_prompt = trim_prompt(
            &format!(
                "Given the following prompt from the user, write a final report on the topic using the learnings from research. \
                 Make it as as detailed as possible, aim for 3 or more pages, include ALL the learnings from research:\n\n\
                 <prompt>{prompt}</prompt>\n\n\
                 Here are all the learnings from previous research:\n\n<learnings>\n{}\n</learnings>",
                tagged_list("learning", learnings)
            ),
            self.context_tokens,
        );

        let shape = OutputShape::new(
            "final_report",
            json!({
                "type": "object",
                "properties": {
                    "reportMarkdown": {
                        "type": "string",
                        "description": "Final report on the topic in Markdown"
                    }
                },
                "required": ["reportMarkdown"],
                "additionalProperties": false
            }),
        );

        let report: FinalReport = self.invoke(&user_prompt, &shape).await?;
        tracing::info!(chars = report.report_markdown.len(), "Final report written");

        Ok(format!(
            "{}{}",
            report.report_markdown,
            sources_section(visited_urls)
        ))
    }

    /// Write a short answer that follows any format requested in `prompt`.
    pub async fn write_final_answer(
        &self,
        prompt: &str,
        learnings: &[String],
    ) -> Result<String, ResearchError> {
        let user_prompt = trim_prompt(
            &format!(
                "Given the following prompt from the user, write a final answer on the topic using the learnings from research. \
                 Follow the format specified in the prompt. Do not yap or babble or include any other text than the answer besides \
                 the format specified in the prompt. Keep the answer as concise as possible - usually it should be just a few words \
                 or maximum a sentence. Try to follow the format specified in the prompt (for example, if the prompt is using Latex, \
                 the answer should be in Latex. If the prompt gives multiple answer choices, the answer should be one of the choices).\n\n\
                 <prompt>{prompt}</prompt>\n\n\
                 Here are all the learnings from research on the topic that you can use to help answer the prompt:\n\n\
                 <learnings>\n{}\n</learnings>",
                tagged_list("learning", learnings)
            ),
            self.context_tokens,
        );

        let shape = OutputShape::new(
            "final_answer",
            json!({
                "type": "object",
                "properties": {
                    "exactAnswer": {
                        "type": "string",
                        "description": "The final answer, make it short and concise, just the answer, no other text"
                    }
                },
                "required": ["exactAnswer"],
                "additionalProperties": false
            }),
        );

        let answer: FinalAnswer = self.invoke(&user_prompt, &shape).await?;
        Ok(answer.exact_answer)
    }

    async fn invoke<T: serde::de::DeserializeOwned>(
        &self,
        user_prompt: &str,
        shape: &OutputShape,
    ) -> Result<T, ResearchError> {
        invoke_structured(self.llm.as_ref(), &system_prompt(), user_prompt, shape)
            .await
            .map_err(ResearchError::Report)
    }
}

fn sources_section(visited_urls: &[String]) -> String {
    let list: Vec<String> = visited_urls.iter().map(|url| format!("- {url}")).collect();
    format!("\n\n## Sources\n\n{}", list.join("\n"))
}
