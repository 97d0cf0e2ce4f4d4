//! Shared vocabulary of the research engine.
//!
//! [`SubQuery`] and [`LearningsBatch`] are the validated shapes of the two
//! structured model calls; [`ResearchState`] is the value threaded through
//! the recursion and merged at every fan-in point.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// A planned search query plus the research goal it serves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubQuery {
    pub query: String,
    #[serde(rename = "researchGoal", default)]
    pub research_goal: String,
}

/// Learnings and follow-up questions extracted from one search result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearningsBatch {
    #[serde(default)]
    pub learnings: Vec<String>,
    #[serde(rename = "followUpQuestions", default)]
    pub follow_up_questions: Vec<String>,
}

/// Accumulated findings of a (sub)tree.
///
/// Both lists behave as sets under exact string equality; first-seen order
/// is kept only for presentation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResearchState {
    pub learnings: Vec<String>,
    #[serde(rename = "visitedUrls")]
    pub visited_urls: Vec<String>,
}

impl ResearchState {
    /// Build a state from possibly-duplicated inputs.
    pub fn new(
        learnings: impl IntoIterator<Item = String>,
        visited_urls: impl IntoIterator<Item = String>,
    ) -> Self {
        let mut state = Self::default();
        state.extend(learnings, visited_urls);
        state
    }

    /// Add learnings and URLs, skipping any already present.
    pub fn extend(
        &mut self,
        learnings: impl IntoIterator<Item = String>,
        visited_urls: impl IntoIterator<Item = String>,
    ) {
        union_into(&mut self.learnings, learnings);
        union_into(&mut self.visited_urls, visited_urls);
    }

    /// Set union of several states.
    pub fn merge_all(states: impl IntoIterator<Item = ResearchState>) -> Self {
        let mut merged = Self::default();
        for state in states {
            merged.extend(state.learnings, state.visited_urls);
        }
        merged
    }
}

fn union_into(target: &mut Vec<String>, items: impl IntoIterator<Item = String>) {
    let mut seen: HashSet<String> = target.iter().cloned().collect();
    for item in items {
        if seen.insert(item.clone()) {
            target.push(item);
        }
    }
}

/// Halve the breadth for the next level, rounding up.
pub fn next_breadth(breadth: usize) -> usize {
    breadth.div_ceil(2)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &[&str]) -> Vec<String> {
        v.iter().map(|x| x.to_string()).collect()
    }

    #[test]
    fn new_deduplicates_inputs() {
        let state = ResearchState::new(s(&["a", "b", "a"]), s(&["u", "u"]));
        assert_eq!(state.learnings, s(&["a", "b"]));
        assert_eq!(state.visited_urls, s(&["u"]));
    }

    #[test]
    fn merge_all_is_a_set_union() {
        let left = ResearchState::new(s(&["L1", "L2"]), s(&["https://a"]));
        let right = ResearchState::new(s(&["L2", "L3"]), s(&["https://a", "https://b"]));
        let merged = ResearchState::merge_all([left, right, ResearchState::default()]);
        assert_eq!(merged.learnings, s(&["L1", "L2", "L3"]));
        assert_eq!(merged.visited_urls, s(&["https://a", "https://b"]));
    }

    #[test]
    fn near_duplicates_are_kept() {
        let state = ResearchState::new(s(&["Fact.", "Fact"]), Vec::new());
        assert_eq!(state.learnings.len(), 2);
    }

    #[test]
    fn breadth_halves_rounding_up() {
        assert_eq!(next_breadth(4), 2);
        assert_eq!(next_breadth(3), 2);
        assert_eq!(next_breadth(2), 1);
        assert_eq!(next_breadth(1), 1);
        assert_eq!(next_breadth(10), 5);
    }

    #[test]
    fn sub_query_uses_camel_case_goal() {
        let q: SubQuery =
            serde_json::from_str(r#"{"query": "rust async", "researchGoal": "learn"}"#).unwrap();
        assert_eq!(q.research_goal, "learn");
    }

    #[test]
    fn learnings_batch_tolerates_missing_lists() {
        let batch: LearningsBatch = serde_json::from_str("{}").unwrap();
        assert!(batch.learnings.is_empty());
        assert!(batch.follow_up_questions.is_empty());
    }

    #[test]
    fn state_serializes_with_camel_case_urls() {
        let state = ResearchState::new(s(&["a"]), s(&["u"]));
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["visitedUrls"][0], "u");
    }
}
