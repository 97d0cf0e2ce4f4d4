//! In-process fakes for the language and search services.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use delve::error::{LlmError, SearchError};
use delve::llm::{LanguageModel, OutputShape};
use delve::research::{DeepResearch, ResearchOptions, ResearchProgress};
use delve::search::{SearchHit, SearchOptions, SearchProvider};

/// A recorded planning call.
#[derive(Debug, Clone)]
pub struct PlanCall {
    pub prompt: String,
    pub max_queries: usize,
}

/// A recorded synthesis call.
#[derive(Debug, Clone)]
pub struct SynthCall {
    pub query: String,
    pub max_follow_ups: usize,
}

type FailureFn = Box<dyn Fn(&str) -> bool + Send + Sync>;
type LearningsFn = Box<dyn Fn(&str) -> Vec<String> + Send + Sync>;

/// Model that plans numbered sub-queries and returns one learning per query.
pub struct FakeModel {
    counter: AtomicUsize,
    /// Cap on sub-queries per plan; `None` returns exactly `max_queries`.
    pub queries_per_plan: Option<usize>,
    fail_planning: FailureFn,
    fail_synthesis: FailureFn,
    learnings: LearningsFn,
    pub plan_calls: Mutex<Vec<PlanCall>>,
    pub synth_calls: Mutex<Vec<SynthCall>>,
}

impl Default for FakeModel {
    fn default() -> Self {
        Self {
            counter: AtomicUsize::new(0),
            queries_per_plan: None,
            fail_planning: Box::new(|_| false),
            fail_synthesis: Box::new(|_| false),
            learnings: Box::new(|query| vec![format!("L from {query}")]),
            plan_calls: Mutex::new(Vec::new()),
            synth_calls: Mutex::new(Vec::new()),
        }
    }
}

impl FakeModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_queries_per_plan(mut self, n: usize) -> Self {
        self.queries_per_plan = Some(n);
        self
    }

    /// Fail any planning call whose prompt satisfies `predicate`.
    pub fn failing_plans_when(
        mut self,
        predicate: impl Fn(&str) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.fail_planning = Box::new(predicate);
        self
    }

    /// Fail any synthesis call for a query satisfying `predicate`.
    pub fn failing_synthesis_when(
        mut self,
        predicate: impl Fn(&str) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.fail_synthesis = Box::new(predicate);
        self
    }

    pub fn with_learnings(
        mut self,
        learnings: impl Fn(&str) -> Vec<String> + Send + Sync + 'static,
    ) -> Self {
        self.learnings = Box::new(learnings);
        self
    }

    pub fn plan_calls(&self) -> Vec<PlanCall> {
        self.plan_calls.lock().unwrap().clone()
    }

    pub fn synth_calls(&self) -> Vec<SynthCall> {
        self.synth_calls.lock().unwrap().clone()
    }
}

/// Read the `max of N` bound out of a schema property description.
fn max_from_description(shape: &OutputShape, property: &str) -> usize {
    shape.schema["properties"][property]["description"]
        .as_str()
        .and_then(|d| d.rsplit(' ').next())
        .and_then(|n| n.parse().ok())
        .expect("schema description ends with a max")
}

fn between<'a>(text: &'a str, open: &str, close: &str) -> &'a str {
    let start = text.find(open).map(|i| i + open.len()).unwrap_or(0);
    let end = text[start..].find(close).map(|i| start + i).unwrap_or(text.len());
    &text[start..end]
}

#[async_trait]
impl LanguageModel for FakeModel {
    async fn invoke(
        &self,
        _system_prompt: &str,
        user_prompt: &str,
        shape: &OutputShape,
    ) -> Result<serde_json::Value, LlmError> {
        match shape.name {
            "serp_queries" => {
                let max_queries = max_from_description(shape, "queries");
                self.plan_calls.lock().unwrap().push(PlanCall {
                    prompt: user_prompt.to_string(),
                    max_queries,
                });
                if (self.fail_planning)(user_prompt) {
                    return Err(LlmError::Request("planner unavailable".to_string()));
                }
                let n = self.queries_per_plan.map_or(max_queries, |cap| cap.min(max_queries));
                let queries: Vec<serde_json::Value> = (0..n)
                    .map(|_| {
                        let id = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
                        json!({
                            "query": format!("sub-query {id}"),
                            "researchGoal": format!("goal {id}")
                        })
                    })
                    .collect();
                Ok(json!({ "queries": queries }))
            }
            "serp_learnings" => {
                let query = between(user_prompt, "<query>", "</query>").to_string();
                let max_follow_ups = max_from_description(shape, "followUpQuestions");
                self.synth_calls.lock().unwrap().push(SynthCall {
                    query: query.clone(),
                    max_follow_ups,
                });
                if (self.fail_synthesis)(&query) {
                    return Err(LlmError::MalformedOutput {
                        shape: shape.name.to_string(),
                        message: "missing field `learnings`".to_string(),
                    });
                }
                let follow_ups: Vec<String> = (1..=max_follow_ups)
                    .map(|i| format!("follow-up {i} for {query}"))
                    .collect();
                Ok(json!({
                    "learnings": (self.learnings)(&query),
                    "followUpQuestions": follow_ups
                }))
            }
            other => Err(LlmError::Request(format!("unexpected shape {other}"))),
        }
    }

    fn model_name(&self) -> &str {
        "fake"
    }
}

/// How the fake search answers one query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    Succeed,
    Fail,
    /// Sleep far past any test timeout.
    Hang,
}

type BehaviorFn = Box<dyn Fn(&str) -> Behavior + Send + Sync>;

/// Search that returns one hit per query, tracking concurrency.
pub struct FakeSearch {
    behavior: BehaviorFn,
    urls: Box<dyn Fn(&str) -> Vec<String> + Send + Sync>,
    delay: Duration,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub calls: Mutex<Vec<String>>,
}

impl Default for FakeSearch {
    fn default() -> Self {
        Self {
            behavior: Box::new(|_| Behavior::Succeed),
            urls: Box::new(|query| vec![format!("https://example.com/{}", query.replace(' ', "-"))]),
            delay: Duration::ZERO,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl FakeSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_behavior(mut self, f: impl Fn(&str) -> Behavior + Send + Sync + 'static) -> Self {
        self.behavior = Box::new(f);
        self
    }

    pub fn with_urls(mut self, f: impl Fn(&str) -> Vec<String> + Send + Sync + 'static) -> Self {
        self.urls = Box::new(f);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchProvider for FakeSearch {
    async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<SearchHit>, SearchError> {
        self.calls.lock().unwrap().push(query.to_string());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let behavior = (self.behavior)(query);
        let delay = if behavior == Behavior::Hang {
            Duration::from_secs(30)
        } else {
            self.delay
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match behavior {
            Behavior::Fail => Err(SearchError::Transport("connection reset".to_string())),
            _ => Ok((self.urls)(query)
                .into_iter()
                .take(options.limit)
                .map(|url| SearchHit {
                    url: Some(url),
                    title: None,
                    content: Some(format!("content for {query}")),
                })
                .collect()),
        }
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// Options with a short search timeout so hung searches settle quickly.
pub fn test_options() -> ResearchOptions {
    ResearchOptions {
        search: SearchOptions {
            timeout: Duration::from_millis(200),
            ..Default::default()
        },
        ..Default::default()
    }
}

pub fn engine(model: &Arc<FakeModel>, search: &Arc<FakeSearch>) -> DeepResearch {
    DeepResearch::new(model.clone(), search.clone(), test_options())
}

/// Observer that records every progress snapshot.
pub fn recorder() -> (
    Arc<Mutex<Vec<ResearchProgress>>>,
    delve::research::ProgressCallback,
) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let callback: delve::research::ProgressCallback =
        Arc::new(move |p: &ResearchProgress| sink.lock().unwrap().push(p.clone()));
    (seen, callback)
}
