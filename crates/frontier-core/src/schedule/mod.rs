//! Day schedule types: time blocks and the per-day document.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::opportunity::OpportunityContext;
use crate::parse;
use crate::storage::{Document, DocumentId};

/// Storage key for the schedule of `date`.
pub fn schedule_key(date: NaiveDate) -> String {
    format!("schedule:{date}")
}

/// Type of schedule block.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BlockType {
    /// Work on a frontier node
    Learning,
    /// Fixed-length meal
    Meal,
    /// Rest after a learning block
    Break,
    /// Routine filler between other blocks
    Habit,
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BlockType::Learning => "learning",
            BlockType::Meal => "meal",
            BlockType::Break => "break",
            BlockType::Habit => "habit",
        };
        f.write_str(s)
    }
}

/// A scheduled slot in one day.
///
/// `start_minute` counts from midnight of the schedule's date and may pass
/// 1440 when the day ends after midnight.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimeBlock {
    pub id: String,
    pub block_type: BlockType,
    pub title: String,
    pub start_minute: u32,
    /// Display form of `start_minute`, e.g. "7:00 AM".
    pub start_time: String,
    pub duration_minutes: u32,
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub difficulty: Option<u8>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub outcome: Option<String>,
    #[serde(default)]
    pub learned: Option<String>,
    #[serde(default)]
    pub next_questions: Option<String>,
    #[serde(default)]
    pub energy_after: Option<u8>,
    #[serde(default)]
    pub difficulty_rating: Option<u8>,
    #[serde(default)]
    pub breakthrough: bool,
    #[serde(default)]
    pub opportunity: Option<OpportunityContext>,
}

impl TimeBlock {
    pub fn new(id: impl Into<String>, block_type: BlockType, title: impl Into<String>, start_minute: u32, duration_minutes: u32) -> Self {
        Self {
            id: id.into(),
            block_type,
            title: title.into(),
            start_minute,
            start_time: parse::format_clock(start_minute),
            duration_minutes,
            task_id: None,
            branch: None,
            difficulty: None,
            completed: false,
            completed_at: None,
            outcome: None,
            learned: None,
            next_questions: None,
            energy_after: None,
            difficulty_rating: None,
            breakthrough: false,
            opportunity: None,
        }
    }

    pub fn end_minute(&self) -> u32 {
        self.start_minute + self.duration_minutes
    }

    /// True when the block has learning content worth feeding back into the graph.
    pub fn has_learning_content(&self) -> bool {
        self.task_id.is_some()
            || self.breakthrough
            || self.learned.as_deref().is_some_and(|l| !l.trim().is_empty())
    }
}

/// All blocks for one day of one path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaySchedule {
    pub project_id: String,
    pub path: String,
    pub date: NaiveDate,
    pub energy_level: u8,
    pub focus_type: String,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub priority_hours: Vec<u32>,
    pub blocks: Vec<TimeBlock>,
    pub generated_at: DateTime<Utc>,
}

impl DaySchedule {
    pub fn key(&self) -> String {
        schedule_key(self.date)
    }

    pub fn block(&self, id: &str) -> Option<&TimeBlock> {
        self.blocks.iter().find(|b| b.id == id)
    }

    pub fn block_mut(&mut self, id: &str) -> Option<&mut TimeBlock> {
        self.blocks.iter_mut().find(|b| b.id == id)
    }

    /// First incomplete block after `after` in schedule order.
    pub fn next_incomplete_after(&self, after: &str) -> Option<&TimeBlock> {
        self.blocks
            .iter()
            .skip_while(|b| b.id != after)
            .skip(1)
            .find(|b| !b.completed)
            .or_else(|| self.blocks.iter().find(|b| !b.completed))
    }

    pub fn completed_count(&self) -> usize {
        self.blocks.iter().filter(|b| b.completed).count()
    }

    pub fn learning_blocks(&self) -> impl Iterator<Item = &TimeBlock> {
        self.blocks.iter().filter(|b| b.block_type == BlockType::Learning)
    }

    pub fn learning_minutes(&self) -> u32 {
        self.learning_blocks().map(|b| b.duration_minutes).sum()
    }
}

impl Document for DaySchedule {
    fn owner_mismatch(&self, id: &DocumentId<'_>) -> Option<String> {
        let path_ok = id.path.map_or(true, |p| p == self.path);
        let key_ok = id.key == self.key();
        (self.project_id != id.project || !path_ok || !key_ok)
            .then(|| format!("{}/{} {}", self.project_id, self.path, self.key()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> DaySchedule {
        let date = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
        DaySchedule {
            project_id: "p".into(),
            path: "general".into(),
            date,
            energy_level: 3,
            focus_type: "balanced".into(),
            context: None,
            priority_hours: Vec::new(),
            blocks: vec![
                TimeBlock::new("b01", BlockType::Learning, "Read", 420, 30),
                TimeBlock::new("b02", BlockType::Break, "Break", 450, 15),
                TimeBlock::new("b03", BlockType::Habit, "Walk", 465, 15),
            ],
            generated_at: Utc::now(),
        }
    }

    #[test]
    fn key_uses_iso_date() {
        assert_eq!(day().key(), "schedule:2026-03-14");
    }

    #[test]
    fn start_time_is_rendered() {
        let block = TimeBlock::new("b", BlockType::Meal, "Lunch", 12 * 60 + 30, 45);
        assert_eq!(block.start_time, "12:30 PM");
        assert_eq!(block.end_minute(), 13 * 60 + 15);
    }

    #[test]
    fn next_incomplete_skips_done_blocks() {
        let mut day = day();
        day.blocks[1].completed = true;
        assert_eq!(day.next_incomplete_after("b01").unwrap().id, "b03");

        day.blocks[2].completed = true;
        assert_eq!(day.next_incomplete_after("b03").unwrap().id, "b01");

        day.blocks[0].completed = true;
        assert!(day.next_incomplete_after("b01").is_none());
    }

    #[test]
    fn learning_content_detection() {
        let mut block = TimeBlock::new("b", BlockType::Habit, "Walk", 0, 15);
        assert!(!block.has_learning_content());
        block.learned = Some("  ".into());
        assert!(!block.has_learning_content());
        block.breakthrough = true;
        assert!(block.has_learning_content());
    }

    #[test]
    fn owner_check_includes_date() {
        let day = day();
        assert!(day.owner_mismatch(&DocumentId::path("p", "general", "schedule:2026-03-14")).is_none());
        assert!(day.owner_mismatch(&DocumentId::path("p", "general", "schedule:2026-03-15")).is_some());
    }
}
