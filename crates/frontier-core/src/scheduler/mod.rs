//! Day packer.
//!
//! Lays a day out from wake to sleep with no gaps:
//! - A cursor advances from wake time; at each step it places, in order of
//!   preference, a meal (cursor inside an unused meal window), a learning
//!   block (hour allowed and tasks left), or a habit filler.
//! - Learning blocks are followed by a break when time remains.
//! - No block runs into an upcoming meal window or past sleep time.
//! - The block count is capped so a misconfigured range cannot run away.

use serde::{Deserialize, Serialize};

use crate::graph::FrontierNode;
use crate::parse::MINUTES_PER_DAY;
use crate::schedule::{BlockType, TimeBlock};
use crate::storage::ScheduleConfig;

/// Shortest learning block worth placing.
pub const MIN_TASK_MINUTES: u32 = 15;
/// Longest learning block.
pub const MAX_TASK_MINUTES: u32 = 120;

/// Morning hours where high energy earns harder work.
const HIGH_ENERGY_HOURS: std::ops::RangeInclusive<u32> = 9..=11;

/// Packer configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackerConfig {
    /// Minutes either side of a meal time
    pub meal_window: u32,
    /// Meal block length
    pub meal_duration: u32,
    /// Break after each learning block
    pub break_minutes: u32,
    /// Hard cap on blocks per day
    pub max_blocks: usize,
}

impl Default for PackerConfig {
    fn default() -> Self {
        Self {
            meal_window: 15,
            meal_duration: 45,
            break_minutes: 15,
            max_blocks: 50,
        }
    }
}

impl From<&ScheduleConfig> for PackerConfig {
    fn from(config: &ScheduleConfig) -> Self {
        Self {
            meal_window: config.meal_window_minutes,
            meal_duration: config.meal_duration_minutes.max(1),
            break_minutes: config.break_minutes,
            max_blocks: config.max_blocks,
        }
    }
}

/// One day's packing input. Times are minutes since midnight.
#[derive(Debug, Clone)]
pub struct DayPlan<'a> {
    pub wake: u32,
    pub sleep: u32,
    pub meals: Vec<u32>,
    /// Hours (0-23) learning may start in; empty allows any hour.
    pub priority_hours: Vec<u32>,
    /// Ready tasks, highest priority first.
    pub tasks: Vec<&'a FrontierNode>,
    /// 1 to 5.
    pub energy: u8,
    pub focus_type: &'a str,
}

/// Length of a learning block for a task of `base_minutes`.
///
/// An explicit focus preference wins: "25" means a pomodoro, "1 hour" and
/// "2 hour" fix the length. Otherwise the estimate is scaled by energy and
/// clamped to the allowed range.
pub fn task_duration(focus_type: &str, base_minutes: u32, energy: u8) -> u32 {
    let focus = focus_type.to_ascii_lowercase();
    if focus.contains("25") {
        return 25;
    }
    if focus.contains("1 hour") {
        return 60;
    }
    if focus.contains("2 hour") {
        return 120;
    }

    let multiplier = if energy >= 4 {
        1.5
    } else if energy <= 2 {
        0.7
    } else {
        1.0
    };
    let scaled = (base_minutes as f64 * multiplier).round() as u32;
    scaled.clamp(MIN_TASK_MINUTES, MAX_TASK_MINUTES)
}

/// Index of the task to place at `hour`.
///
/// Filters by the difficulty band for the energy level and falls back to
/// the whole pool; always the first (highest priority) candidate.
pub fn pick_task(pool: &[&FrontierNode], energy: u8, hour: u32) -> Option<usize> {
    let morning = HIGH_ENERGY_HOURS.contains(&hour);
    let fits = |node: &FrontierNode| {
        if energy >= 4 && morning {
            node.difficulty >= 2
        } else if energy <= 2 {
            node.difficulty <= 2
        } else {
            node.difficulty <= 3
        }
    };
    pool.iter()
        .position(|&n| fits(n))
        .or_else(|| (!pool.is_empty()).then_some(0))
}

/// Habit filler for the hour: title and length.
pub fn filler_for(hour: u32) -> (&'static str, u32) {
    if hour < 9 {
        ("Morning routine", 30)
    } else if hour >= 19 {
        ("Evening wind-down", 45)
    } else {
        ("Mindful transition", 15)
    }
}

#[derive(Debug, Clone, Default)]
pub struct DayPacker {
    config: PackerConfig,
}

impl DayPacker {
    pub fn new(config: PackerConfig) -> Self {
        Self { config }
    }

    pub fn pack(&self, plan: &DayPlan<'_>) -> Vec<TimeBlock> {
        let wake = plan.wake;
        let end = if plan.sleep <= wake {
            plan.sleep + MINUTES_PER_DAY
        } else {
            plan.sleep
        };

        let window = self.config.meal_window;

        // Meals whose window closed before waking belong to the late part of the day.
        let mut meals: Vec<(u32, bool)> = plan
            .meals
            .iter()
            .map(|&m| if m + window < wake { m + MINUTES_PER_DAY } else { m })
            .map(|m| (m, false))
            .collect();
        meals.sort_by_key(|(m, _)| *m);

        let mut pool = plan.tasks.clone();
        let mut blocks: Vec<TimeBlock> = Vec::new();
        let mut cursor = wake;

        while cursor < end && blocks.len() < self.config.max_blocks {
            let hour = (cursor / 60) % 24;

            if let Some(meal) = meals
                .iter_mut()
                .find(|(m, used)| !*used && cursor + window >= *m && cursor <= *m + window)
            {
                meal.1 = true;
                let duration = self.config.meal_duration.min(end - cursor);
                blocks.push(self.block(&blocks, BlockType::Meal, "Meal", cursor, duration));
                cursor += duration;
                continue;
            }

            // Blocks stop where the next unused meal window opens.
            let limit = meals
                .iter()
                .filter(|(m, used)| !*used && m.saturating_sub(window) > cursor)
                .map(|(m, _)| m.saturating_sub(window))
                .min()
                .map_or(end, |start| start.min(end));
            let room = limit - cursor;

            let hour_allowed = plan.priority_hours.is_empty() || plan.priority_hours.contains(&hour);
            if hour_allowed && room >= MIN_TASK_MINUTES {
                if let Some(index) = pick_task(&pool, plan.energy, hour) {
                    let task = pool.remove(index);
                    let duration = task_duration(plan.focus_type, task.duration_minutes(), plan.energy).min(room);

                    let mut block = self.block(&blocks, BlockType::Learning, task.title.clone(), cursor, duration);
                    block.task_id = Some(task.id.clone());
                    block.branch = Some(task.branch.clone());
                    block.difficulty = Some(task.difficulty);
                    blocks.push(block);
                    cursor += duration;

                    let rest = self.config.break_minutes.min(limit - cursor);
                    if rest > 0 && blocks.len() < self.config.max_blocks {
                        blocks.push(self.block(&blocks, BlockType::Break, "Break", cursor, rest));
                        cursor += rest;
                    }
                    continue;
                }
            }

            let (title, length) = filler_for(hour);
            let duration = length.min(room);
            blocks.push(self.block(&blocks, BlockType::Habit, title, cursor, duration));
            cursor += duration;
        }

        if cursor < end {
            tracing::warn!(
                blocks = blocks.len(),
                max_blocks = self.config.max_blocks,
                "block cap reached before sleep time"
            );
        }
        blocks
    }

    fn block(&self, existing: &[TimeBlock], kind: BlockType, title: impl Into<String>, start: u32, duration: u32) -> TimeBlock {
        TimeBlock::new(format!("b{:02}", existing.len() + 1), kind, title, start, duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_clock;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn task(id: &str, difficulty: u8, duration: &str, priority: i64) -> FrontierNode {
        FrontierNode::new(id, format!("Task {id}"), "basics")
            .with_difficulty(difficulty)
            .with_duration(duration)
            .with_priority(priority)
    }

    fn clock(text: &str) -> u32 {
        parse_clock(text).unwrap()
    }

    fn plan<'a>(tasks: Vec<&'a FrontierNode>, meals: &[&str], energy: u8) -> DayPlan<'a> {
        DayPlan {
            wake: clock("7:00 AM"),
            sleep: clock("10:00 PM"),
            meals: meals.iter().map(|m| clock(m)).collect(),
            priority_hours: Vec::new(),
            tasks,
            energy,
            focus_type: "balanced",
        }
    }

    fn assert_well_formed(blocks: &[TimeBlock], max: usize) {
        assert!(blocks.len() <= max);
        for pair in blocks.windows(2) {
            assert!(pair[0].start_minute <= pair[1].start_minute);
            assert!(pair[0].end_minute() <= pair[1].start_minute, "{:?} overlaps {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn single_task_day_with_lunch() {
        let t = task("t1", 2, "30 minutes", 200);
        let blocks = DayPacker::default().pack(&plan(vec![&t], &["12:00 PM"], 3));

        let meal = blocks.iter().find(|b| b.block_type == BlockType::Meal).unwrap();
        assert!((clock("11:45 AM")..=clock("12:15 PM")).contains(&meal.start_minute));
        assert_eq!(meal.duration_minutes, 45);

        let learning: Vec<&TimeBlock> = blocks.iter().filter(|b| b.block_type == BlockType::Learning).collect();
        assert_eq!(learning.len(), 1);
        assert_eq!(learning[0].task_id.as_deref(), Some("t1"));
        assert_eq!(learning[0].duration_minutes, 30);

        let pos = blocks.iter().position(|b| b.block_type == BlockType::Learning).unwrap();
        assert_eq!(blocks[pos + 1].block_type, BlockType::Break);
        assert_well_formed(&blocks, 50);
    }

    #[test]
    fn duration_rules() {
        assert_eq!(task_duration("pomodoro 25", 90, 5), 25);
        assert_eq!(task_duration("deep 1 hour", 20, 1), 60);
        assert_eq!(task_duration("2 hours please", 20, 3), 120);
        assert_eq!(task_duration("balanced", 30, 5), 45);
        assert_eq!(task_duration("balanced", 30, 1), 21);
        assert_eq!(task_duration("balanced", 10, 3), 15);
        assert_eq!(task_duration("balanced", 200, 3), 120);
    }

    #[test]
    fn difficulty_band_selection() {
        let easy = task("easy", 1, "30 minutes", 300);
        let hard = task("hard", 4, "30 minutes", 250);
        let mid = task("mid", 2, "30 minutes", 200);
        let pool = vec![&easy, &hard, &mid];

        assert_eq!(pick_task(&pool, 5, 10), Some(1));
        assert_eq!(pick_task(&pool, 1, 10), Some(0));
        assert_eq!(pick_task(&pool, 3, 14), Some(0));

        let only_hard = vec![&hard];
        assert_eq!(pick_task(&only_hard, 1, 14), Some(0));
        assert_eq!(pick_task(&[], 3, 14), None);
    }

    #[test]
    fn tasks_are_never_reused() {
        let a = task("a", 2, "30 minutes", 300);
        let b = task("b", 2, "30 minutes", 200);
        let blocks = DayPacker::default().pack(&plan(vec![&a, &b], &[], 3));
        let ids: Vec<&str> = blocks.iter().filter_map(|b| b.task_id.as_deref()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn priority_hours_restrict_learning() {
        let a = task("a", 2, "30 minutes", 300);
        let mut p = plan(vec![&a], &[], 3);
        p.priority_hours = vec![14];
        let blocks = DayPacker::default().pack(&p);
        let learning = blocks.iter().find(|b| b.block_type == BlockType::Learning).unwrap();
        assert_eq!(learning.start_minute / 60, 14);
    }

    #[test]
    fn fillers_follow_time_of_day() {
        assert_eq!(filler_for(7), ("Morning routine", 30));
        assert_eq!(filler_for(13), ("Mindful transition", 15));
        assert_eq!(filler_for(19), ("Evening wind-down", 45));
    }

    #[test]
    fn day_past_midnight_is_supported() {
        let mut p = plan(Vec::new(), &[], 3);
        p.wake = clock("8:00 PM");
        p.sleep = clock("1:00 AM");
        let blocks = DayPacker::default().pack(&p);
        let last = blocks.last().unwrap();
        assert_eq!(last.end_minute(), clock("1:00 AM") + MINUTES_PER_DAY);
        assert_well_formed(&blocks, 50);
    }

    #[test]
    fn block_ids_are_sequential() {
        let blocks = DayPacker::default().pack(&plan(Vec::new(), &["8:00 AM"], 3));
        assert_eq!(blocks[0].id, "b01");
        assert_eq!(blocks[1].id, "b02");
    }

    proptest! {
        #[test]
        fn never_overlaps_or_exceeds_cap(
            wake in 0u32..1440,
            sleep in 0u32..1440,
            meals in prop::collection::vec(0u32..1440, 0..4),
            specs in prop::collection::vec((1u8..=5, 5u32..150), 0..10),
            energy in 1u8..=5,
            hours in prop::collection::vec(0u32..24, 0..4),
        ) {
            let tasks: Vec<FrontierNode> = specs
                .iter()
                .enumerate()
                .map(|(i, (d, m))| task(&format!("t{i}"), *d, &format!("{m} minutes"), 200))
                .collect();
            let plan = DayPlan {
                wake,
                sleep,
                meals,
                priority_hours: hours,
                tasks: tasks.iter().collect(),
                energy,
                focus_type: "balanced",
            };
            let blocks = DayPacker::default().pack(&plan);

            prop_assert!(blocks.len() <= 50);
            for pair in blocks.windows(2) {
                prop_assert!(pair[0].end_minute() <= pair[1].start_minute);
            }
            let end = if sleep <= wake { sleep + MINUTES_PER_DAY } else { sleep };
            if let Some(last) = blocks.last() {
                prop_assert!(last.end_minute() <= end);
            }
            let ids: Vec<&str> = blocks.iter().filter_map(|b| b.task_id.as_deref()).collect();
            let unique: HashSet<&str> = ids.iter().copied().collect();
            prop_assert_eq!(unique.len(), ids.len());
        }
    }
}
