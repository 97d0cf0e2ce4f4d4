//! Recursive web research.
//!
//! The [`orchestrator::DeepResearch`] engine drives the query tree; it uses
//! the [`planner::QueryPlanner`] to split a topic into search queries, the
//! [`synthesizer::ResultSynthesizer`] to distil each query's hits into
//! learnings, and the [`progress::ProgressReporter`] to publish progress.
//! [`report::ReportWriter`] turns the final learnings into a write-up.

pub mod orchestrator;
pub mod planner;
pub mod progress;
pub mod prompt;
pub mod report;
pub mod synthesizer;
pub mod types;

pub use orchestrator::{DeepResearch, ResearchOptions, ResearchRequest};
pub use progress::{ProgressCallback, ResearchProgress};
pub use report::ReportWriter;
pub use types::{LearningsBatch, ResearchState, SubQuery};
