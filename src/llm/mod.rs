//! Language service boundary.
//!
//! The research core only ever asks the model for a JSON object of a known
//! shape. [`LanguageModel`] is the seam: it takes a system prompt, a user
//! prompt and an [`OutputShape`], and returns the raw JSON value. Typed
//! records are produced by [`invoke_structured`], which validates the value
//! against the caller's Rust type and fails loudly on mismatch.

pub mod genai_model;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::error::LlmError;

pub use genai_model::GenaiModel;

/// Named JSON schema describing the object a call site expects back.
#[derive(Debug, Clone)]
pub struct OutputShape {
    /// Stable identifier, used in logs, errors and as the response-format name.
    pub name: &'static str,
    /// JSON Schema for the expected object.
    pub schema: serde_json::Value,
}

impl OutputShape {
    pub fn new(name: &'static str, schema: serde_json::Value) -> Self {
        Self { name, schema }
    }
}

/// A model that can answer a prompt with a structured JSON object.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Run one structured-output call and return the parsed JSON object.
    async fn invoke(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        shape: &OutputShape,
    ) -> Result<serde_json::Value, LlmError>;

    /// Model identifier for logging.
    fn model_name(&self) -> &str;
}

/// Invoke the model and deserialize its output into `T`.
pub async fn invoke_structured<T: DeserializeOwned>(
    llm: &dyn LanguageModel,
    system_prompt: &str,
    user_prompt: &str,
    shape: &OutputShape,
) -> Result<T, LlmError> {
    let value = llm.invoke(system_prompt, user_prompt, shape).await?;
    serde_json::from_value(value).map_err(|e| LlmError::MalformedOutput {
        shape: shape.name.to_string(),
        message: e.to_string(),
    })
}
