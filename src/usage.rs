//! Token and tool usage accounting for a research run.
//!
//! One [`UsageCounter`] is shared (behind an `Arc`) by the language model
//! wrapper and the orchestrator; the CLI prints [`UsageCounter::formatted`]
//! after the run.

use std::collections::BTreeMap;
use std::sync::Mutex;

use serde::Serialize;

/// Token counts reported by one model call, or accumulated over many.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
}

/// Point-in-time copy of all usage counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UsageSnapshot {
    pub models: BTreeMap<String, TokenUsage>,
    pub tools: BTreeMap<String, u64>,
}

#[derive(Debug, Default)]
pub struct UsageCounter {
    inner: Mutex<UsageSnapshot>,
}

impl UsageCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one call's token usage to the running total for `model`.
    pub fn add_usage_tokens(&self, model: &str, usage: TokenUsage) {
        tracing::debug!(
            model,
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            total_tokens = usage.total_tokens,
            "Adding usage tokens"
        );
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let entry = guard.models.entry(model.to_string()).or_default();
        entry.input_tokens += usage.input_tokens;
        entry.output_tokens += usage.output_tokens;
        entry.total_tokens += usage.total_tokens;
    }

    /// Count `count` uses of `tool` (e.g. one per search call).
    pub fn add_tool_usage(&self, tool: &str, count: u64) {
        tracing::debug!(tool, count, "Adding tool usage");
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        *guard.tools.entry(tool.to_string()).or_default() += count;
    }

    pub fn snapshot(&self) -> UsageSnapshot {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Human-readable summary, one line per model and per tool.
    pub fn formatted(&self) -> String {
        let snapshot = self.snapshot();
        let models: Vec<String> = snapshot
            .models
            .iter()
            .map(|(model, u)| {
                format!(
                    "{model}: input={}, output={}, total={}",
                    u.input_tokens, u.output_tokens, u.total_tokens
                )
            })
            .collect();
        let tools: Vec<String> = snapshot
            .tools
            .iter()
            .map(|(tool, count)| format!("{tool}: {count}"))
            .collect();

        format!(
            "Model Usage:\n{}\n\nTool Usage:\n{}",
            models.join("\n"),
            tools.join("\n")
        )
    }
}
