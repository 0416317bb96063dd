//! Per-path learning history.
//!
//! Append-only: completed topics, breakthrough insights, knowledge gaps
//! from open questions, and per-branch skill counters.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::opportunity::DEFAULT_ENGAGEMENT;
use crate::schedule::TimeBlock;
use crate::storage::{Document, DocumentId};

pub const HISTORY_KEY: &str = "history";

/// Completions per skill level step.
const TASKS_PER_LEVEL: u32 = 3;
pub const MAX_SKILL_LEVEL: u8 = 10;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompletedTopic {
    pub block_id: String,
    #[serde(default)]
    pub task_id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub branch: Option<String>,
    pub date: NaiveDate,
    pub completed_at: DateTime<Utc>,
    /// Difficulty the block was planned at.
    #[serde(default)]
    pub difficulty: Option<u8>,
    /// Difficulty the user reported.
    #[serde(default)]
    pub difficulty_rating: Option<u8>,
    #[serde(default)]
    pub energy_after: Option<u8>,
    #[serde(default)]
    pub breakthrough: bool,
    pub duration_minutes: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Insight {
    pub text: String,
    #[serde(default)]
    pub branch: Option<String>,
    pub block_id: String,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KnowledgeGap {
    pub question: String,
    #[serde(default)]
    pub branch: Option<String>,
    pub block_id: String,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SkillProgress {
    pub completed_tasks: u32,
    pub total_engagement: u32,
}

impl SkillProgress {
    /// `1 + completed / 3`, capped at 10.
    pub fn level(&self) -> u8 {
        let level = 1 + self.completed_tasks / TASKS_PER_LEVEL;
        level.min(MAX_SKILL_LEVEL as u32) as u8
    }
}

/// Split free-text questions into trimmed, non-empty sentences.
pub fn split_questions(text: &str) -> Vec<String> {
    text.split('.')
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(str::to_string)
        .collect()
}

/// What one completion added.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HistoryDelta {
    pub insights: usize,
    pub knowledge_gaps: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningHistory {
    pub project_id: String,
    pub path: String,
    #[serde(default)]
    pub completed_topics: Vec<CompletedTopic>,
    #[serde(default)]
    pub insights: Vec<Insight>,
    #[serde(default)]
    pub knowledge_gaps: Vec<KnowledgeGap>,
    #[serde(default)]
    pub skill_progression: BTreeMap<String, SkillProgress>,
}

impl LearningHistory {
    pub fn new(project_id: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            path: path.into(),
            completed_topics: Vec::new(),
            insights: Vec::new(),
            knowledge_gaps: Vec::new(),
            skill_progression: BTreeMap::new(),
        }
    }

    /// Append the records for a completed block.
    pub fn record_completion(&mut self, block: &TimeBlock, date: NaiveDate, at: DateTime<Utc>) -> HistoryDelta {
        let mut delta = HistoryDelta::default();

        self.completed_topics.push(CompletedTopic {
            block_id: block.id.clone(),
            task_id: block.task_id.clone(),
            title: block.title.clone(),
            branch: block.branch.clone(),
            date,
            completed_at: at,
            difficulty: block.difficulty,
            difficulty_rating: block.difficulty_rating,
            energy_after: block.energy_after,
            breakthrough: block.breakthrough,
            duration_minutes: block.duration_minutes,
        });

        if block.breakthrough {
            let text = [block.learned.as_deref(), block.outcome.as_deref()]
                .into_iter()
                .flatten()
                .map(str::trim)
                .find(|t| !t.is_empty());
            if let Some(text) = text {
                self.insights.push(Insight {
                    text: text.to_string(),
                    branch: block.branch.clone(),
                    block_id: block.id.clone(),
                    recorded_at: at,
                });
                delta.insights += 1;
            }
        }

        for question in block.next_questions.as_deref().map(split_questions).unwrap_or_default() {
            self.knowledge_gaps.push(KnowledgeGap {
                question,
                branch: block.branch.clone(),
                block_id: block.id.clone(),
                recorded_at: at,
            });
            delta.knowledge_gaps += 1;
        }

        if let Some(branch) = &block.branch {
            let progress = self.skill_progression.entry(branch.clone()).or_default();
            progress.completed_tasks += 1;
            progress.total_engagement += engagement(block);
        }

        delta
    }

    /// Completions on or after `since`.
    pub fn completed_since(&self, since: DateTime<Utc>) -> impl Iterator<Item = &CompletedTopic> {
        self.completed_topics.iter().filter(move |t| t.completed_at >= since)
    }

    /// Completions in the trailing `days` days.
    pub fn recent_count(&self, now: DateTime<Utc>, days: i64) -> usize {
        self.completed_since(now - Duration::days(days)).count()
    }

    /// The last `n` completions, oldest first.
    pub fn last(&self, n: usize) -> &[CompletedTopic] {
        let start = self.completed_topics.len().saturating_sub(n);
        &self.completed_topics[start..]
    }

    pub fn breakthrough_count(&self) -> usize {
        self.completed_topics.iter().filter(|t| t.breakthrough).count()
    }

    pub fn is_empty(&self) -> bool {
        self.completed_topics.is_empty()
    }
}

/// Engagement credited to a branch for one block.
fn engagement(block: &TimeBlock) -> u32 {
    if let Some(context) = &block.opportunity {
        return context.engagement_level as u32;
    }
    block
        .energy_after
        .map_or(DEFAULT_ENGAGEMENT as u32, |e| (e as u32 * 2).min(10))
}

impl Document for LearningHistory {
    fn owner_mismatch(&self, id: &DocumentId<'_>) -> Option<String> {
        let path_ok = id.path.map_or(true, |p| p == self.path);
        (self.project_id != id.project || !path_ok)
            .then(|| format!("{}/{}", self.project_id, self.path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opportunity::OpportunityContext;
    use crate::schedule::BlockType;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 14).unwrap()
    }

    fn learning(id: &str) -> TimeBlock {
        let mut block = TimeBlock::new(id, BlockType::Learning, "Scales", 420, 30);
        block.branch = Some("basics".into());
        block.difficulty = Some(2);
        block
    }

    #[test]
    fn breakthrough_with_learned_adds_insight() {
        let mut history = LearningHistory::new("p", "general");
        let mut block = learning("b01");
        block.breakthrough = true;
        block.learned = Some("Thumb-under is the trick".into());

        let delta = history.record_completion(&block, date(), Utc::now());
        assert_eq!(delta.insights, 1);
        assert_eq!(history.insights[0].text, "Thumb-under is the trick");
    }

    #[test]
    fn no_insight_without_breakthrough() {
        let mut history = LearningHistory::new("p", "general");
        let mut block = learning("b01");
        block.learned = Some("something".into());
        history.record_completion(&block, date(), Utc::now());
        assert!(history.insights.is_empty());
        assert_eq!(history.completed_topics.len(), 1);
    }

    #[test]
    fn questions_become_gaps() {
        let mut history = LearningHistory::new("p", "general");
        let mut block = learning("b01");
        block.next_questions = Some("Why minor keys. How do modes work. ".into());
        let delta = history.record_completion(&block, date(), Utc::now());
        assert_eq!(delta.knowledge_gaps, 2);
        assert_eq!(history.knowledge_gaps[1].question, "How do modes work");
    }

    #[test]
    fn skill_level_steps_every_three() {
        let mut history = LearningHistory::new("p", "general");
        for i in 0..7 {
            let mut block = learning(&format!("b{i}"));
            block.energy_after = Some(4);
            history.record_completion(&block, date(), Utc::now());
        }
        let progress = &history.skill_progression["basics"];
        assert_eq!(progress.completed_tasks, 7);
        assert_eq!(progress.total_engagement, 56);
        assert_eq!(progress.level(), 3);

        let maxed = SkillProgress {
            completed_tasks: 100,
            total_engagement: 0,
        };
        assert_eq!(maxed.level(), MAX_SKILL_LEVEL);
    }

    #[test]
    fn opportunity_engagement_wins() {
        let mut block = learning("b01");
        block.energy_after = Some(1);
        block.opportunity = Some(OpportunityContext {
            engagement_level: 9,
            ..Default::default()
        });
        assert_eq!(engagement(&block), 9);
    }

    #[test]
    fn recent_and_last() {
        let mut history = LearningHistory::new("p", "general");
        let now = Utc::now();
        history.record_completion(&learning("old"), date(), now - Duration::days(10));
        history.record_completion(&learning("new"), date(), now);
        assert_eq!(history.recent_count(now, 7), 1);
        assert_eq!(history.last(5).len(), 2);
        assert_eq!(history.last(1)[0].block_id, "new");
    }

    #[test]
    fn split_questions_drops_blanks() {
        assert_eq!(split_questions(" a. . b "), vec!["a", "b"]);
        assert!(split_questions("").is_empty());
    }
}
