//! Tree-wide progress record with update-and-notify.
//!
//! One [`ProgressReporter`] is created per top-level research call and
//! shared by reference with every recursive call and every concurrent
//! branch. Each [`ProgressReporter::update`] applies a partial update under
//! the lock, then hands a full snapshot to the optional observer. Concurrent
//! branches race on the transient fields (`current_*`); the last write wins.

use std::sync::{Arc, Mutex};

use serde::Serialize;

/// Snapshot of research progress across the whole query tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchProgress {
    pub current_depth: usize,
    pub total_depth: usize,
    pub current_breadth: usize,
    pub total_breadth: usize,
    pub current_query: Option<String>,
    /// Planned queries across every level reached so far.
    pub total_queries: usize,
    /// Branches settled so far, successful or not.
    pub completed_queries: usize,
}

/// Observer invoked after every progress update.
pub type ProgressCallback = Arc<dyn Fn(&ResearchProgress) + Send + Sync>;

/// Partial update; `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct ProgressUpdate {
    pub current_depth: Option<usize>,
    pub current_breadth: Option<usize>,
    pub current_query: Option<String>,
    /// Added to `total_queries`.
    pub add_total_queries: usize,
    /// Added to `completed_queries`.
    pub add_completed_queries: usize,
}

pub struct ProgressReporter {
    state: Mutex<ResearchProgress>,
    observer: Option<ProgressCallback>,
}

impl ProgressReporter {
    /// Start a record for a tree of the given depth and breadth.
    pub fn new(depth: usize, breadth: usize, observer: Option<ProgressCallback>) -> Self {
        Self {
            state: Mutex::new(ResearchProgress {
                current_depth: depth,
                total_depth: depth,
                current_breadth: breadth,
                total_breadth: breadth,
                ..Default::default()
            }),
            observer,
        }
    }

    /// Apply `update` and notify the observer with the resulting snapshot.
    pub fn update(&self, update: ProgressUpdate) -> ResearchProgress {
        let snapshot = {
            let mut progress = self.state.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(depth) = update.current_depth {
                progress.current_depth = depth;
            }
            if let Some(breadth) = update.current_breadth {
                progress.current_breadth = breadth;
            }
            if update.current_query.is_some() {
                progress.current_query = update.current_query;
            }
            progress.total_queries += update.add_total_queries;
            progress.completed_queries += update.add_completed_queries;
            progress.clone()
        };

        tracing::debug!(
            current_depth = snapshot.current_depth,
            current_breadth = snapshot.current_breadth,
            completed = snapshot.completed_queries,
            total = snapshot.total_queries,
            "Research progress"
        );

        if let Some(observer) = &self.observer {
            observer(&snapshot);
        }

        snapshot
    }

    pub fn snapshot(&self) -> ResearchProgress {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}
