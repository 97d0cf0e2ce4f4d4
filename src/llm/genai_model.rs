//! [`LanguageModel`] backed by the `genai` multi-provider client.
//!
//! The expected shape is sent as a JSON response format so providers with
//! native structured output honour it; the reply text is still parsed
//! defensively since not every provider does. Transport and parse failures
//! are retried up to `max_retries` times before the error is returned.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use genai::Client;
use genai::chat::{ChatMessage, ChatOptions, ChatRequest, JsonSpec};
use regex::Regex;

use super::{LanguageModel, OutputShape};
use crate::error::LlmError;
use crate::usage::{TokenUsage, UsageCounter};

/// Matches a reply wrapped in a Markdown code fence.
static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^\s*```(?:json)?\s*(.*?)\s*```\s*$").expect("code fence pattern compiles")
});

pub struct GenaiModel {
    client: Client,
    model: String,
    max_retries: u32,
    usage: Option<Arc<UsageCounter>>,
}

impl GenaiModel {
    /// Build a model handle. The provider is resolved by `genai` from the
    /// model name (e.g. `gpt-4o-mini`, `claude-...`, `gemini-...`) and reads
    /// its API key from the provider's usual environment variable.
    pub fn new(model: impl Into<String>, max_retries: u32) -> Self {
        Self {
            client: Client::default(),
            model: model.into(),
            max_retries,
            usage: None,
        }
    }

    /// Record token usage of every successful call into `usage`.
    pub fn with_usage_counter(mut self, usage: Arc<UsageCounter>) -> Self {
        self.usage = Some(usage);
        self
    }

    async fn invoke_once(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        shape: &OutputShape,
    ) -> Result<serde_json::Value, LlmError> {
        let chat_req =
            ChatRequest::from_system(system_prompt).append_message(ChatMessage::user(user_prompt));
        let chat_options = ChatOptions::default()
            .with_response_format(JsonSpec::new(shape.name, shape.schema.clone()));

        let res = self
            .client
            .exec_chat(&self.model, chat_req, Some(&chat_options))
            .await
            .map_err(|e| LlmError::Request(e.to_string()))?;

        if let Some(usage) = &self.usage {
            usage.add_usage_tokens(
                &self.model,
                TokenUsage {
                    input_tokens: res.usage.prompt_tokens.unwrap_or(0).max(0) as u64,
                    output_tokens: res.usage.completion_tokens.unwrap_or(0).max(0) as u64,
                    total_tokens: res.usage.total_tokens.unwrap_or(0).max(0) as u64,
                },
            );
        }

        let text = res.first_text().ok_or_else(|| LlmError::EmptyResponse {
            shape: shape.name.to_string(),
        })?;

        parse_json_reply(text, shape.name)
    }
}

#[async_trait]
impl LanguageModel for GenaiModel {
    async fn invoke(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        shape: &OutputShape,
    ) -> Result<serde_json::Value, LlmError> {
        let mut attempt = 0;
        loop {
            match self.invoke_once(system_prompt, user_prompt, shape).await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.max_retries => {
                    attempt += 1;
                    tracing::warn!(
                        shape = shape.name,
                        attempt,
                        max_retries = self.max_retries,
                        "LLM call failed, retrying: {e}"
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Parse a model reply into a JSON object, tolerating a surrounding code fence.
fn parse_json_reply(text: &str, shape: &str) -> Result<serde_json::Value, LlmError> {
    let body = CODE_FENCE
        .captures(text)
        .and_then(|c| c.get(1))
        .map_or(text.trim(), |m| m.as_str());

    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| LlmError::InvalidJson {
            shape: shape.to_string(),
            message: e.to_string(),
        })?;

    if !value.is_object() {
        return Err(LlmError::InvalidJson {
            shape: shape.to_string(),
            message: "expected a JSON object".to_string(),
        });
    }

    Ok(value)
}
