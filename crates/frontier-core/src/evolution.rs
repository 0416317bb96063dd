//! Strategy evolution.
//!
//! Looks at the graph and history for signs of a stalled plan, reads the
//! user's feedback, picks one evolution strategy, and appends new tasks.

use chrono::{DateTime, Utc};
use indoc::formatdoc;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::graph::{materialize, FrontierNode, PrerequisiteMatching, PriorityBaselines, ReadinessResolver, TaskGraph};
use crate::history::LearningHistory;
use crate::intelligence::{EvolutionRequest, GenerationSource, GeneratorChain};
use crate::opportunity::Sentiment;

/// Days that count as "recent".
pub const RECENT_DAYS: i64 = 7;
/// Completions used for engagement when none are recent.
pub const RECENT_FALLBACK_COUNT: usize = 5;
/// Average energy below which engagement is low.
pub const LOW_ENGAGEMENT_THRESHOLD: f64 = 2.5;
/// Available-task count below which the frontier is expanded.
pub const MIN_AVAILABLE: usize = 3;

const NEGATIVE_WORDS: [&str; 3] = ["boring", "stuck", "difficult"];
const POSITIVE_WORDS: [&str; 3] = ["great", "interesting", "progress"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StuckIndicator {
    NoAvailableTasks,
    NoRecentProgress,
    LowEngagement,
}

impl fmt::Display for StuckIndicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StuckIndicator::NoAvailableTasks => "no_available_tasks",
            StuckIndicator::NoRecentProgress => "no_recent_progress",
            StuckIndicator::LowEngagement => "low_engagement",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvolutionStrategy {
    GenerateNewTasks,
    IncreaseVarietyAndInterest,
    AddressUserConcerns,
    ExpandTaskFrontier,
    OptimizeExistingSequence,
}

impl EvolutionStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvolutionStrategy::GenerateNewTasks => "generate_new_tasks",
            EvolutionStrategy::IncreaseVarietyAndInterest => "increase_variety_and_interest",
            EvolutionStrategy::AddressUserConcerns => "address_user_concerns",
            EvolutionStrategy::ExpandTaskFrontier => "expand_task_frontier",
            EvolutionStrategy::OptimizeExistingSequence => "optimize_existing_sequence",
        }
    }

    fn rationale(&self) -> &'static str {
        match self {
            EvolutionStrategy::GenerateNewTasks => "Nothing is ready to work on; adding fresh tasks.",
            EvolutionStrategy::IncreaseVarietyAndInterest => "Energy after recent work is low; mixing in lighter, varied tasks.",
            EvolutionStrategy::AddressUserConcerns => "Feedback signals frustration; adding tasks that approach the material differently.",
            EvolutionStrategy::ExpandTaskFrontier => "Few tasks are ready; widening the frontier.",
            EvolutionStrategy::OptimizeExistingSequence => "Progress looks healthy; topping up the current sequence.",
        }
    }
}

impl fmt::Display for EvolutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keyword sentiment; negative words are checked first.
pub fn classify_feedback(feedback: Option<&str>) -> Sentiment {
    let Some(text) = feedback else {
        return Sentiment::Neutral;
    };
    let text = text.to_lowercase();
    if NEGATIVE_WORDS.iter().any(|w| text.contains(w)) {
        Sentiment::Negative
    } else if POSITIVE_WORDS.iter().any(|w| text.contains(w)) {
        Sentiment::Positive
    } else {
        Sentiment::Neutral
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProgressAnalysis {
    pub completed: usize,
    pub total: usize,
    pub available: usize,
    pub recent_completions: usize,
    pub average_energy: Option<f64>,
    pub indicators: Vec<StuckIndicator>,
    pub sentiment: Sentiment,
}

impl ProgressAnalysis {
    pub fn has(&self, indicator: StuckIndicator) -> bool {
        self.indicators.contains(&indicator)
    }
}

/// Average energy-after of recent completions.
///
/// Recent means the trailing week; without any, the last few completions.
pub fn recent_energy(history: &LearningHistory, now: DateTime<Utc>) -> Option<f64> {
    let since = now - chrono::Duration::days(RECENT_DAYS);
    let mut energies: Vec<u8> = history.completed_since(since).filter_map(|t| t.energy_after).collect();
    if energies.is_empty() {
        energies = history
            .last(RECENT_FALLBACK_COUNT)
            .iter()
            .filter_map(|t| t.energy_after)
            .collect();
    }
    if energies.is_empty() {
        return None;
    }
    Some(energies.iter().map(|&e| e as f64).sum::<f64>() / energies.len() as f64)
}

pub fn analyze(
    graph: &TaskGraph,
    history: &LearningHistory,
    feedback: Option<&str>,
    matching: PrerequisiteMatching,
    now: DateTime<Utc>,
) -> ProgressAnalysis {
    let available = ReadinessResolver::new(matching).ready_nodes(&graph.nodes).len();
    let recent_completions = history.recent_count(now, RECENT_DAYS);
    let average_energy = recent_energy(history, now);

    let mut indicators = Vec::new();
    if available == 0 {
        indicators.push(StuckIndicator::NoAvailableTasks);
    }
    if recent_completions == 0 {
        indicators.push(StuckIndicator::NoRecentProgress);
    }
    if average_energy.is_some_and(|e| e < LOW_ENGAGEMENT_THRESHOLD) {
        indicators.push(StuckIndicator::LowEngagement);
    }

    ProgressAnalysis {
        completed: graph.completed_count(),
        total: graph.nodes.len(),
        available,
        recent_completions,
        average_energy,
        indicators,
        sentiment: classify_feedback(feedback),
    }
}

/// First matching rule wins.
pub fn choose_strategy(analysis: &ProgressAnalysis) -> EvolutionStrategy {
    if analysis.has(StuckIndicator::NoAvailableTasks) {
        EvolutionStrategy::GenerateNewTasks
    } else if analysis.has(StuckIndicator::LowEngagement) {
        EvolutionStrategy::IncreaseVarietyAndInterest
    } else if analysis.sentiment == Sentiment::Negative {
        EvolutionStrategy::AddressUserConcerns
    } else if analysis.available < MIN_AVAILABLE {
        EvolutionStrategy::ExpandTaskFrontier
    } else {
        EvolutionStrategy::OptimizeExistingSequence
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EvolutionResult {
    pub analysis: ProgressAnalysis,
    pub strategy: EvolutionStrategy,
    pub new_tasks: Vec<FrontierNode>,
    pub source: GenerationSource,
    pub report: String,
}

pub struct EvolutionEngine<'a> {
    generator: &'a GeneratorChain,
    matching: PrerequisiteMatching,
    priorities: PriorityBaselines,
}

impl<'a> EvolutionEngine<'a> {
    pub fn new(generator: &'a GeneratorChain, matching: PrerequisiteMatching, priorities: PriorityBaselines) -> Self {
        Self {
            generator,
            matching,
            priorities,
        }
    }

    /// Analyse, pick a strategy, append new tasks and stamp the graph.
    pub fn evolve(
        &self,
        goal: &str,
        graph: &mut TaskGraph,
        history: &LearningHistory,
        feedback: Option<&str>,
        now: DateTime<Utc>,
    ) -> EvolutionResult {
        let analysis = analyze(graph, history, feedback, self.matching, now);
        let strategy = choose_strategy(&analysis);

        let indicators: Vec<String> = analysis.indicators.iter().map(|i| i.to_string()).collect();
        let completed_titles: Vec<String> = graph.nodes.iter().filter(|n| n.completed).map(|n| n.title.clone()).collect();
        let available_titles: Vec<String> = ReadinessResolver::new(self.matching)
            .ready_nodes(&graph.nodes)
            .iter()
            .map(|n| n.title.clone())
            .collect();

        let generated = self.generator.evolution_tasks(&EvolutionRequest {
            goal,
            path: &graph.path,
            strategy: strategy.as_str(),
            indicators: &indicators,
            feedback,
            completed_titles: &completed_titles,
            available_titles: &available_titles,
        });

        let branch = graph.default_branch();
        let new_tasks: Vec<FrontierNode> = materialize(graph, &generated.value, &branch, self.priorities.baseline)
            .into_iter()
            .map(FrontierNode::generated)
            .collect();
        graph.append_nodes(new_tasks.clone());
        graph.last_evolution = Some(now);

        tracing::info!(
            path = %graph.path,
            strategy = %strategy,
            new_tasks = new_tasks.len(),
            source = %generated.source,
            "strategy evolved"
        );

        let report = render_report(&analysis, strategy, &new_tasks, generated.source);
        EvolutionResult {
            analysis,
            strategy,
            new_tasks,
            source: generated.source,
            report,
        }
    }
}

pub fn render_report(
    analysis: &ProgressAnalysis,
    strategy: EvolutionStrategy,
    new_tasks: &[FrontierNode],
    source: GenerationSource,
) -> String {
    let indicators = if analysis.indicators.is_empty() {
        "none".to_string()
    } else {
        analysis
            .indicators
            .iter()
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    };
    let energy = analysis
        .average_energy
        .map_or_else(|| "n/a".to_string(), |e| format!("{e:.1}"));
    let tasks = new_tasks
        .iter()
        .map(|t| format!("  - {} (difficulty {}, {})", t.title, t.difficulty, t.duration))
        .collect::<Vec<_>>()
        .join("\n");

    formatdoc! {"
        Strategy evolution: {strategy}
        {rationale}

        Progress: {completed}/{total} completed, {available} available, {recent} in the last {days} days
        Average energy: {energy}
        Stuck indicators: {indicators}
        Feedback sentiment: {sentiment}

        New tasks ({count}, {source}):
        {tasks}",
        strategy = strategy,
        rationale = strategy.rationale(),
        completed = analysis.completed,
        total = analysis.total,
        available = analysis.available,
        recent = analysis.recent_completions,
        days = RECENT_DAYS,
        sentiment = analysis.sentiment,
        energy = energy,
        indicators = indicators,
        count = new_tasks.len(),
        source = source,
        tasks = tasks,
    }
}
