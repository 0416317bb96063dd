//! Completion processing.
//!
//! Finishing a block touches three documents in order: the day schedule
//! (block marked done), the learning history (topic, insight, gap and skill
//! records), and the task graph (node completed, follow-ups and opportunity
//! nodes appended). Each step is applied separately so the caller can save
//! after each and report partial progress if a later step fails.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result, ValidationError};
use crate::graph::{clamp_difficulty, generated_id, FrontierNode, OpportunityTag, PriorityBaselines, TaskGraph};
use crate::history::{split_questions, HistoryDelta, LearningHistory};
use crate::opportunity::{self, OpportunityAnalysis, OpportunityContext, HIGH_ENGAGEMENT};
use crate::schedule::{DaySchedule, TimeBlock};

/// Follow-up nodes generated per completion, at most.
pub const MAX_FOLLOW_UPS: usize = 2;

/// What the user reports when finishing a block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlockOutcome {
    #[serde(default)]
    pub outcome: Option<String>,
    #[serde(default)]
    pub learned: Option<String>,
    #[serde(default)]
    pub next_questions: Option<String>,
    /// 1 to 5.
    #[serde(default)]
    pub energy_after: Option<u8>,
    /// 1 to 5.
    #[serde(default)]
    pub difficulty_rating: Option<u8>,
    #[serde(default)]
    pub breakthrough: bool,
    /// Minutes actually spent; the block length when absent.
    #[serde(default)]
    pub actual_minutes: Option<u32>,
    #[serde(default)]
    pub opportunity: Option<OpportunityContext>,
}

fn check_range(field: &str, value: Option<u8>, min: u8, max: u8) -> Result<(), ValidationError> {
    match value {
        Some(v) if !(min..=max).contains(&v) => Err(ValidationError::OutOfRange {
            field: field.to_string(),
            value: v as i64,
            min: min as i64,
            max: max as i64,
        }),
        _ => Ok(()),
    }
}

impl BlockOutcome {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_range("energy_after", self.energy_after, 1, 5)?;
        check_range("difficulty_rating", self.difficulty_rating, 1, 5)?;
        check_range(
            "engagement_level",
            self.opportunity.as_ref().map(|o| o.engagement_level),
            1,
            10,
        )?;
        Ok(())
    }
}

/// Nodes the graph step touched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GraphUpdate {
    pub completed_node: Option<String>,
    pub follow_ups: Vec<String>,
    pub opportunity_nodes: Vec<String>,
}

impl GraphUpdate {
    pub fn added(&self) -> usize {
        self.follow_ups.len() + self.opportunity_nodes.len()
    }
}

/// What to do after completing a block.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NextAction {
    Block {
        id: String,
        title: String,
        start_time: String,
    },
    DayComplete,
}

impl NextAction {
    pub fn after(schedule: &DaySchedule, block_id: &str) -> Self {
        match schedule.next_incomplete_after(block_id) {
            Some(b) => NextAction::Block {
                id: b.id.clone(),
                title: b.title.clone(),
                start_time: b.start_time.clone(),
            },
            None => NextAction::DayComplete,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            NextAction::Block { title, start_time, .. } => format!("Next up: {title} at {start_time}"),
            NextAction::DayComplete => "Day complete. Review what you learned or plan tomorrow.".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CompletionProcessor {
    priorities: PriorityBaselines,
}

impl CompletionProcessor {
    pub fn new(priorities: PriorityBaselines) -> Self {
        Self { priorities }
    }

    /// Mark `block_id` completed and attach the outcome.
    ///
    /// The opportunity context is attached only when it carries a signal.
    pub fn complete_block(
        &self,
        schedule: &mut DaySchedule,
        block_id: &str,
        outcome: &BlockOutcome,
        at: DateTime<Utc>,
    ) -> Result<TimeBlock> {
        outcome.validate()?;
        let block = schedule
            .block_mut(block_id)
            .ok_or_else(|| CoreError::not_found("block", block_id))?;
        if block.completed {
            return Err(ValidationError::InvalidValue {
                field: "block_id".into(),
                message: format!("block {block_id} is already completed"),
            }
            .into());
        }

        block.completed = true;
        block.completed_at = Some(at);
        block.outcome = outcome.outcome.clone();
        block.learned = outcome.learned.clone();
        block.next_questions = outcome.next_questions.clone();
        block.energy_after = outcome.energy_after;
        block.difficulty_rating = outcome.difficulty_rating;
        block.breakthrough = outcome.breakthrough;
        block.opportunity = outcome.opportunity.clone().and_then(OpportunityContext::into_meaningful);

        tracing::info!(block = block_id, breakthrough = block.breakthrough, "block completed");
        Ok(block.clone())
    }

    pub fn record_history(&self, history: &mut LearningHistory, schedule: &DaySchedule, block: &TimeBlock, at: DateTime<Utc>) -> HistoryDelta {
        history.record_completion(block, schedule.date, at)
    }

    /// Apply a completed block to the graph.
    ///
    /// Does nothing for blocks without learning content.
    pub fn update_graph(&self, graph: &mut TaskGraph, block: &TimeBlock, actual_minutes: Option<u32>, at: DateTime<Utc>) -> GraphUpdate {
        let mut update = GraphUpdate::default();
        if !block.has_learning_content() {
            return update;
        }

        let parent = match block.task_id.as_deref() {
            Some(id) => match graph.node_mut(id) {
                Some(node) => {
                    node.complete(at, block.difficulty_rating, Some(actual_minutes.unwrap_or(block.duration_minutes)));
                    update.completed_node = Some(node.id.clone());
                    Some(node.clone())
                }
                None => {
                    tracing::warn!(node = id, block = %block.id, "completed block references an unknown node");
                    None
                }
            },
            None => None,
        };

        let branch = parent
            .as_ref()
            .map(|p| p.branch.clone())
            .or_else(|| block.branch.clone())
            .unwrap_or_else(|| graph.default_branch());
        let base_difficulty = parent
            .as_ref()
            .map(|p| p.difficulty)
            .or(block.difficulty)
            .unwrap_or(2);
        let origin = Origin {
            parent_id: parent.as_ref().map(|p| p.id.clone()),
            topic: parent.as_ref().map_or_else(|| block.title.clone(), |p| p.title.clone()),
            branch,
            difficulty: base_difficulty,
        };

        let follow_ups = self.follow_up_nodes(&origin, block);
        update.follow_ups = graph.append_nodes(follow_ups);

        if let Some(context) = &block.opportunity {
            let nodes = self.opportunity_nodes(&origin, context);
            update.opportunity_nodes = graph.append_nodes(nodes);
        }

        tracing::info!(
            block = %block.id,
            completed_node = ?update.completed_node,
            follow_ups = update.follow_ups.len(),
            opportunity_nodes = update.opportunity_nodes.len(),
            "graph updated from completion"
        );
        update
    }

    fn follow_up_nodes(&self, origin: &Origin, block: &TimeBlock) -> Vec<FrontierNode> {
        let priority = if block.breakthrough {
            self.priorities.breakthrough_follow_up
        } else {
            self.priorities.follow_up
        };
        block
            .next_questions
            .as_deref()
            .map(split_questions)
            .unwrap_or_default()
            .into_iter()
            .take(MAX_FOLLOW_UPS)
            .map(|question| {
                origin
                    .node("explore", format!("Explore: {question}"), origin.difficulty, "30 minutes")
                    .with_description(format!("Open question raised while working on {}: {question}", origin.topic))
                    .with_priority(priority)
            })
            .collect()
    }

    fn opportunity_nodes(&self, origin: &Origin, context: &OpportunityContext) -> Vec<FrontierNode> {
        let mut nodes = Vec::new();

        if context.engagement_level >= HIGH_ENGAGEMENT {
            nodes.push(
                origin
                    .node(
                        "amplify",
                        format!("Go deeper: {}", origin.topic),
                        clamp_difficulty(origin.difficulty.saturating_add(1)),
                        "45 minutes",
                    )
                    .with_description(format!(
                        "Engagement hit {}/10. Push further on what made {} click.",
                        context.engagement_level, origin.topic
                    ))
                    .with_priority(self.priorities.amplification)
                    .with_opportunity(OpportunityTag::BreakthroughAmplification),
            );
        }

        let sources: Vec<&str> = context.positive_feedback().map(|f| f.source.as_str()).collect();
        if !sources.is_empty() {
            nodes.push(
                origin
                    .node("connect", format!("Follow up with {}", sources.join(", ")), 2, "30 minutes")
                    .with_description(format!("Positive feedback on {}. Reach out and build the connection.", origin.topic))
                    .with_priority(self.priorities.networking)
                    .with_opportunity(OpportunityTag::Networking),
            );
        }

        if context.viral_potential {
            nodes.push(
                origin
                    .node("share", format!("Share your work on {}", origin.topic), 2, "30 minutes")
                    .with_description("This resonated with people. Package it and share it more widely.")
                    .with_priority(self.priorities.viral)
                    .with_opportunity(OpportunityTag::ViralLeverage),
            );
        }

        nodes
    }

    pub fn analyze_opportunities(&self, block: &TimeBlock) -> OpportunityAnalysis {
        opportunity::analyze(block.opportunity.as_ref())
    }
}

/// Where generated nodes hang off.
struct Origin {
    parent_id: Option<String>,
    topic: String,
    branch: String,
    difficulty: u8,
}

impl Origin {
    fn node(&self, prefix: &str, title: String, difficulty: u8, duration: &str) -> FrontierNode {
        FrontierNode::new(generated_id(prefix), title, self.branch.clone())
            .with_difficulty(difficulty)
            .with_duration(duration)
            .with_prerequisites(self.parent_id.iter().cloned().collect())
            .generated()
    }
}
