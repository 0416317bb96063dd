//! Next-task selection.
//!
//! Each ready node gets an additive score:
//!
//! ```text
//! priority + energy_match * w.energy_match + time_fit + context + breakthrough + generated
//! ```
//!
//! - `energy_match = 5 - |energy - difficulty|` (negative when far apart)
//! - `time_fit = +w.time_fit_bonus` if the node fits the available time,
//!   else `-w.time_miss_penalty`
//! - `context = +w.context_bonus` when any context word longer than three
//!   characters occurs in the node's title or description
//! - `breakthrough = +w.breakthrough_bonus` for breakthrough-amplification nodes
//! - `generated = +w.generated_bonus` for generated nodes
//!
//! The highest total wins; ties keep graph order.

use serde::{Deserialize, Serialize};

use crate::graph::{FrontierNode, OpportunityTag};
use crate::parse;

/// Selector weights. Defaults are the hand-tuned values the scoring was
/// calibrated with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringWeights {
    #[serde(default = "default_energy_match")]
    pub energy_match: i64,
    #[serde(default = "default_time_fit_bonus")]
    pub time_fit_bonus: i64,
    #[serde(default = "default_time_miss_penalty")]
    pub time_miss_penalty: i64,
    #[serde(default = "default_context_bonus")]
    pub context_bonus: i64,
    #[serde(default = "default_breakthrough_bonus")]
    pub breakthrough_bonus: i64,
    #[serde(default = "default_generated_bonus")]
    pub generated_bonus: i64,
    /// Minutes assumed when the available-time text is unparsable.
    #[serde(default = "default_available_minutes")]
    pub default_available_minutes: u32,
}

fn default_energy_match() -> i64 {
    20
}
fn default_time_fit_bonus() -> i64 {
    30
}
fn default_time_miss_penalty() -> i64 {
    50
}
fn default_context_bonus() -> i64 {
    50
}
fn default_breakthrough_bonus() -> i64 {
    100
}
fn default_generated_bonus() -> i64 {
    25
}
fn default_available_minutes() -> u32 {
    30
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            energy_match: default_energy_match(),
            time_fit_bonus: default_time_fit_bonus(),
            time_miss_penalty: default_time_miss_penalty(),
            context_bonus: default_context_bonus(),
            breakthrough_bonus: default_breakthrough_bonus(),
            generated_bonus: default_generated_bonus(),
            default_available_minutes: default_available_minutes(),
        }
    }
}

/// What the user can give right now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionRequest {
    /// 1 (drained) to 5 (sharp).
    pub energy: u8,
    pub available_minutes: u32,
    pub context: Option<String>,
}

impl SelectionRequest {
    /// Build from raw user input, parsing the time text.
    pub fn from_input(energy: u8, time_available: &str, context: Option<&str>, weights: &ScoringWeights) -> Self {
        Self {
            energy: energy.clamp(1, 5),
            available_minutes: parse::minutes_or(time_available, weights.default_available_minutes),
            context: context.map(str::to_string).filter(|c| !c.trim().is_empty()),
        }
    }
}

/// Per-term score breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub priority: i64,
    pub energy: i64,
    pub time: i64,
    pub context: i64,
    pub breakthrough: i64,
    pub generated: i64,
    pub total: i64,
}

/// A node with its score.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredNode<'a> {
    pub node: &'a FrontierNode,
    pub score: ScoreBreakdown,
}

/// `5 - |energy - difficulty|`.
pub fn energy_match(energy: u8, difficulty: u8) -> i64 {
    5 - (energy as i64 - difficulty as i64).abs()
}

/// Lowercased context words longer than three characters.
pub fn context_tokens(context: &str) -> Vec<String> {
    context
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() > 3)
        .map(str::to_lowercase)
        .collect()
}

fn matches_context(node: &FrontierNode, tokens: &[String]) -> bool {
    if tokens.is_empty() {
        return false;
    }
    let haystack = format!("{} {}", node.title, node.description).to_lowercase();
    tokens.iter().any(|t| haystack.contains(t.as_str()))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TaskSelector {
    weights: ScoringWeights,
}

impl TaskSelector {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    pub fn score(&self, node: &FrontierNode, request: &SelectionRequest) -> ScoreBreakdown {
        let tokens = request.context.as_deref().map(context_tokens).unwrap_or_default();
        self.score_with_tokens(node, request, &tokens)
    }

    fn score_with_tokens(&self, node: &FrontierNode, request: &SelectionRequest, tokens: &[String]) -> ScoreBreakdown {
        let w = &self.weights;
        let priority = node.priority;
        let energy = energy_match(request.energy, node.difficulty) * w.energy_match;
        let time = if node.duration_minutes() <= request.available_minutes {
            w.time_fit_bonus
        } else {
            -w.time_miss_penalty
        };
        let context = if matches_context(node, tokens) {
            w.context_bonus
        } else {
            0
        };
        let breakthrough = if node.opportunity == Some(OpportunityTag::BreakthroughAmplification) {
            w.breakthrough_bonus
        } else {
            0
        };
        let generated = if node.generated { w.generated_bonus } else { 0 };

        ScoreBreakdown {
            priority,
            energy,
            time,
            context,
            breakthrough,
            generated,
            total: priority + energy + time + context + breakthrough + generated,
        }
    }

    /// Score every node, best first. Equal totals keep input order.
    pub fn rank<'a>(&self, nodes: &[&'a FrontierNode], request: &SelectionRequest) -> Vec<ScoredNode<'a>> {
        let tokens = request.context.as_deref().map(context_tokens).unwrap_or_default();
        let mut scored: Vec<ScoredNode<'a>> = nodes
            .iter()
            .map(|&node| ScoredNode {
                node,
                score: self.score_with_tokens(node, request, &tokens),
            })
            .collect();
        scored.sort_by(|a, b| b.score.total.cmp(&a.score.total));
        scored
    }

    /// Highest-scoring node, `None` when nothing is ready.
    pub fn select<'a>(&self, nodes: &[&'a FrontierNode], request: &SelectionRequest) -> Option<ScoredNode<'a>> {
        let best = self.rank(nodes, request).into_iter().next()?;
        tracing::debug!(node = %best.node.id, score = ?best.score, "selected next task");
        Some(best)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn node(id: &str, difficulty: u8, duration: &str) -> FrontierNode {
        FrontierNode::new(id, format!("Task {id}"), "b")
            .with_difficulty(difficulty)
            .with_duration(duration)
    }

    fn request(energy: u8, minutes: u32, context: Option<&str>) -> SelectionRequest {
        SelectionRequest {
            energy,
            available_minutes: minutes,
            context: context.map(str::to_string),
        }
    }

    #[test]
    fn energy_match_values() {
        assert_eq!(energy_match(3, 3), 5);
        assert_eq!(energy_match(5, 1), 1);
        assert_eq!(energy_match(1, 5), 1);
    }

    #[test]
    fn score_terms_add_up() {
        let n = node("a", 3, "30 minutes");
        let s = TaskSelector::default().score(&n, &request(3, 60, None));
        assert_eq!(s.priority, 200);
        assert_eq!(s.energy, 100);
        assert_eq!(s.time, 30);
        assert_eq!(s.total, 330);
    }

    #[test]
    fn overlong_task_is_penalized() {
        let n = node("a", 3, "2 hours");
        let s = TaskSelector::default().score(&n, &request(3, 30, None));
        assert_eq!(s.time, -50);
    }

    #[test]
    fn context_bonus_requires_long_token() {
        let n = node("a", 3, "30 minutes").with_description("Practice Rust ownership");
        let selector = TaskSelector::default();
        assert_eq!(selector.score(&n, &request(3, 30, Some("rust ownership"))).context, 50);
        assert_eq!(selector.score(&n, &request(3, 30, Some("the a of"))).context, 0);
        assert_eq!(selector.score(&n, &request(3, 30, Some("OWNERSHIP!"))).context, 50);
    }

    #[test]
    fn breakthrough_and_generated_bonuses() {
        let n = node("a", 3, "30 minutes")
            .with_opportunity(OpportunityTag::BreakthroughAmplification)
            .generated();
        let s = TaskSelector::default().score(&n, &request(3, 30, None));
        assert_eq!(s.breakthrough, 100);
        assert_eq!(s.generated, 25);

        let networking = node("b", 3, "30 minutes").with_opportunity(OpportunityTag::Networking);
        assert_eq!(TaskSelector::default().score(&networking, &request(3, 30, None)).breakthrough, 0);
    }

    #[test]
    fn select_returns_none_for_empty() {
        assert!(TaskSelector::default().select(&[], &request(3, 30, None)).is_none());
    }

    #[test]
    fn ties_keep_input_order() {
        let a = node("a", 3, "30 minutes");
        let b = node("b", 3, "30 minutes");
        let picked = TaskSelector::default().select(&[&a, &b], &request(3, 30, None)).unwrap();
        assert_eq!(picked.node.id, "a");
        let picked = TaskSelector::default().select(&[&b, &a], &request(3, 30, None)).unwrap();
        assert_eq!(picked.node.id, "b");
    }

    #[test]
    fn custom_weights_apply() {
        let weights = ScoringWeights {
            context_bonus: 500,
            ..ScoringWeights::default()
        };
        let plain = node("a", 3, "30 minutes").with_priority(300);
        let relevant = node("b", 1, "30 minutes").with_description("guitar scales");
        let picked = TaskSelector::new(weights)
            .select(&[&plain, &relevant], &request(3, 30, Some("guitar")))
            .unwrap();
        assert_eq!(picked.node.id, "b");
    }

    #[test]
    fn request_from_input_parses_time() {
        let w = ScoringWeights::default();
        assert_eq!(SelectionRequest::from_input(4, "2 hours", None, &w).available_minutes, 120);
        assert_eq!(SelectionRequest::from_input(4, "soonish", None, &w).available_minutes, 30);
        assert_eq!(SelectionRequest::from_input(9, "1 hr", Some("  "), &w).energy, 5);
        assert!(SelectionRequest::from_input(3, "1 hr", Some("  "), &w).context.is_none());
    }

    proptest! {
        #[test]
        fn selection_is_deterministic(
            specs in prop::collection::vec((1u8..=5, 5u32..180, 100i64..400), 1..8),
            energy in 1u8..=5,
            minutes in 5u32..180,
        ) {
            let nodes: Vec<FrontierNode> = specs
                .iter()
                .enumerate()
                .map(|(i, (d, m, p))| node(&format!("n{i}"), *d, &format!("{m} minutes")).with_priority(*p))
                .collect();
            let refs: Vec<&FrontierNode> = nodes.iter().collect();
            let req = request(energy, minutes, Some("task practice"));
            let first = TaskSelector::default().select(&refs, &req).map(|s| s.node.id.clone());
            let second = TaskSelector::default().select(&refs, &req).map(|s| s.node.id.clone());
            prop_assert_eq!(first, second);
        }

        #[test]
        fn closer_difficulty_scores_higher(energy in 1u8..=5, far in 1u8..=5, near in 1u8..=5) {
            let far_gap = (energy as i64 - far as i64).abs();
            let near_gap = (energy as i64 - near as i64).abs();
            prop_assume!(near_gap < far_gap);
            let req = request(energy, 60, None);
            let selector = TaskSelector::default();
            let far_score = selector.score(&node("f", far, "30 minutes"), &req).total;
            let near_score = selector.score(&node("n", near, "30 minutes"), &req).total;
            prop_assert!(near_score > far_score);
        }
    }
}
