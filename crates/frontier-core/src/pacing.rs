//! Pacing and reasoning insights derived from history.
//!
//! Read-only: nothing here mutates the graph or history.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::evolution::RECENT_DAYS;
use crate::graph::TaskGraph;
use crate::history::{CompletedTopic, LearningHistory};
use crate::project::{ProjectConfig, Urgency};

/// Completions examined for difficulty trends.
pub const DIFFICULTY_WINDOW: usize = 5;
/// Energy readings examined for the energy trend.
pub const ENERGY_WINDOW: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyTrend {
    TooEasy,
    TooChallenging,
    Plateau,
    Progressing,
    InsufficientData,
}

#[derive(Debug, Clone, Serialize)]
pub struct DifficultyInsight {
    pub trend: DifficultyTrend,
    pub average_assigned: Option<f64>,
    pub average_perceived: Option<f64>,
    pub sample: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnergyTrend {
    Rising,
    Declining,
    Stable,
    InsufficientData,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnergyInsight {
    pub trend: EnergyTrend,
    pub slope: Option<f64>,
    pub sample: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RateLevel {
    High,
    Moderate,
    Low,
}

#[derive(Debug, Clone, Serialize)]
pub struct BreakthroughInsight {
    pub rate: f64,
    pub level: RateLevel,
    pub breakthroughs: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VelocityLevel {
    High,
    Steady,
    Slow,
    Stalled,
}

#[derive(Debug, Clone, Serialize)]
pub struct VelocityInsight {
    /// Completions per day over the trailing week.
    pub per_day: f64,
    pub level: VelocityLevel,
    pub recent: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PacingStatus {
    Ahead,
    OnTrack,
    SlightlyBehind,
    Behind,
}

#[derive(Debug, Clone, Serialize)]
pub struct Pacing {
    pub urgency: Urgency,
    pub days_since_start: i64,
    pub expected_percent: f64,
    pub actual_percent: f64,
    pub status: PacingStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkillSummary {
    pub branch: String,
    pub level: u8,
    pub completed_tasks: u32,
    pub total_engagement: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReasoningDetail {
    pub skills: Vec<SkillSummary>,
    pub knowledge_gaps: Vec<String>,
    pub recent_insights: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReasoningReport {
    pub difficulty: DifficultyInsight,
    pub energy: EnergyInsight,
    pub breakthroughs: BreakthroughInsight,
    pub velocity: VelocityInsight,
    pub pacing: Pacing,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<ReasoningDetail>,
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Ordinary least squares slope of `values` against their index.
pub fn trend_slope(values: &[f64]) -> Option<f64> {
    let n = values.len();
    if n < 2 {
        return None;
    }
    let x_mean = (n - 1) as f64 / 2.0;
    let y_mean = mean(values)?;
    let (num, den) = values.iter().enumerate().fold((0.0, 0.0), |(num, den), (i, y)| {
        let dx = i as f64 - x_mean;
        (num + dx * (y - y_mean), den + dx * dx)
    });
    Some(num / den)
}

/// Looks at the last few learning completions, i.e. those planned at a
/// difficulty. Perceived difficulty is compared only against the assigned
/// difficulty of the same rated records.
pub fn difficulty_insight(history: &LearningHistory) -> DifficultyInsight {
    let mut recent: Vec<&CompletedTopic> = history
        .completed_topics
        .iter()
        .rev()
        .filter(|t| t.difficulty.is_some())
        .take(DIFFICULTY_WINDOW)
        .collect();
    recent.reverse();

    let assigned: Vec<f64> = recent.iter().filter_map(|t| t.difficulty).map(f64::from).collect();
    let (rated_assigned, perceived): (Vec<f64>, Vec<f64>) = recent
        .iter()
        .filter_map(|t| Some((f64::from(t.difficulty?), f64::from(t.difficulty_rating?))))
        .unzip();
    let average_assigned = mean(&assigned);
    let average_perceived = mean(&perceived);

    let trend = match (average_perceived, mean(&rated_assigned)) {
        (Some(p), Some(a)) if p - a > 1.0 => DifficultyTrend::TooEasy,
        (Some(p), Some(a)) if a - p > 1.0 => DifficultyTrend::TooChallenging,
        _ if !assigned.is_empty() => {
            let max = assigned.iter().cloned().fold(f64::MIN, f64::max);
            let min = assigned.iter().cloned().fold(f64::MAX, f64::min);
            if max - min <= 1.0 {
                DifficultyTrend::Plateau
            } else {
                DifficultyTrend::Progressing
            }
        }
        _ => DifficultyTrend::InsufficientData,
    };

    DifficultyInsight {
        trend,
        average_assigned,
        average_perceived,
        sample: recent.len(),
    }
}

pub fn energy_insight(history: &LearningHistory) -> EnergyInsight {
    let energies: Vec<f64> = history
        .completed_topics
        .iter()
        .filter_map(|t| t.energy_after)
        .map(f64::from)
        .collect();
    let window = &energies[energies.len().saturating_sub(ENERGY_WINDOW)..];
    let slope = trend_slope(window);
    let trend = match slope {
        Some(s) if s > 0.1 => EnergyTrend::Rising,
        Some(s) if s < -0.1 => EnergyTrend::Declining,
        Some(_) => EnergyTrend::Stable,
        None => EnergyTrend::InsufficientData,
    };
    EnergyInsight {
        trend,
        slope,
        sample: window.len(),
    }
}

pub fn breakthrough_insight(history: &LearningHistory) -> BreakthroughInsight {
    let total = history.completed_topics.len();
    let breakthroughs = history.breakthrough_count();
    let rate = if total == 0 {
        0.0
    } else {
        breakthroughs as f64 / total as f64
    };
    let level = if rate >= 0.3 {
        RateLevel::High
    } else if rate >= 0.1 {
        RateLevel::Moderate
    } else {
        RateLevel::Low
    };
    BreakthroughInsight {
        rate,
        level,
        breakthroughs,
        total,
    }
}

pub fn velocity_insight(history: &LearningHistory, now: DateTime<Utc>) -> VelocityInsight {
    let recent = history.recent_count(now, RECENT_DAYS);
    let per_day = recent as f64 / RECENT_DAYS as f64;
    let level = if per_day >= 1.0 {
        VelocityLevel::High
    } else if per_day >= 0.5 {
        VelocityLevel::Steady
    } else if per_day > 0.0 {
        VelocityLevel::Slow
    } else {
        VelocityLevel::Stalled
    };
    VelocityInsight { per_day, level, recent }
}

/// Actual completion against `days × urgency factor`, capped at 100.
pub fn pacing(project: &ProjectConfig, graph: &TaskGraph, now: DateTime<Utc>) -> Pacing {
    let days_since_start = (now - project.created_at).num_days().max(0);
    let expected_percent = (days_since_start as f64 * project.urgency.factor()).min(100.0);
    let actual_percent = graph.completion_percent();
    let delta = actual_percent - expected_percent;
    let status = if delta > 10.0 {
        PacingStatus::Ahead
    } else if delta < -20.0 {
        PacingStatus::Behind
    } else if delta < -10.0 {
        PacingStatus::SlightlyBehind
    } else {
        PacingStatus::OnTrack
    };
    Pacing {
        urgency: project.urgency,
        days_since_start,
        expected_percent,
        actual_percent,
        status,
    }
}

fn detail(history: &LearningHistory) -> ReasoningDetail {
    let skills = history
        .skill_progression
        .iter()
        .map(|(branch, p)| SkillSummary {
            branch: branch.clone(),
            level: p.level(),
            completed_tasks: p.completed_tasks,
            total_engagement: p.total_engagement,
        })
        .collect();
    let knowledge_gaps = history
        .knowledge_gaps
        .iter()
        .rev()
        .take(10)
        .map(|g| g.question.clone())
        .collect();
    let recent_insights = history.insights.iter().rev().take(5).map(|i| i.text.clone()).collect();
    ReasoningDetail {
        skills,
        knowledge_gaps,
        recent_insights,
    }
}

pub fn analyze(
    project: &ProjectConfig,
    graph: &TaskGraph,
    history: &LearningHistory,
    now: DateTime<Utc>,
    detailed: bool,
) -> ReasoningReport {
    ReasoningReport {
        difficulty: difficulty_insight(history),
        energy: energy_insight(history),
        breakthroughs: breakthrough_insight(history),
        velocity: velocity_insight(history, now),
        pacing: pacing(project, graph, now),
        detail: detailed.then(|| detail(history)),
    }
}

impl ReasoningReport {
    pub fn summary(&self) -> String {
        let mut lines = vec![
            format!(
                "Pacing: {:?} ({:.0}% done vs {:.0}% expected after {} days, {} urgency)",
                self.pacing.status,
                self.pacing.actual_percent,
                self.pacing.expected_percent,
                self.pacing.days_since_start,
                self.pacing.urgency
            ),
            format!("Difficulty: {:?} over {} recent completions", self.difficulty.trend, self.difficulty.sample),
            format!(
                "Energy: {:?}{}",
                self.energy.trend,
                self.energy.slope.map_or_else(String::new, |s| format!(" (slope {s:+.2})"))
            ),
            format!(
                "Breakthroughs: {:?} ({}/{})",
                self.breakthroughs.level, self.breakthroughs.breakthroughs, self.breakthroughs.total
            ),
            format!("Velocity: {:?} ({:.2} per day)", self.velocity.level, self.velocity.per_day),
        ];
        if let Some(detail) = &self.detail {
            for skill in &detail.skills {
                lines.push(format!("Skill {}: level {} ({} tasks)", skill.branch, skill.level, skill.completed_tasks));
            }
            for gap in &detail.knowledge_gaps {
                lines.push(format!("Open question: {gap}"));
            }
            for insight in &detail.recent_insights {
                lines.push(format!("Insight: {insight}"));
            }
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::FrontierNode;
    use crate::schedule::{BlockType, TimeBlock};
    use chrono::{Duration, NaiveDate};

    fn record(history: &mut LearningHistory, difficulty: u8, rating: Option<u8>, energy: Option<u8>, breakthrough: bool, at: DateTime<Utc>) {
        let n = history.completed_topics.len();
        let mut block = TimeBlock::new(format!("b{n}"), BlockType::Learning, "Work", 420, 30);
        block.branch = Some("basics".into());
        block.difficulty = Some(difficulty);
        block.difficulty_rating = rating;
        block.energy_after = energy;
        block.breakthrough = breakthrough;
        block.learned = breakthrough.then(|| "insight".to_string());
        history.record_completion(&block, NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(), at);
    }

    #[test]
    fn slope_of_line() {
        assert!((trend_slope(&[1.0, 2.0, 3.0]).unwrap() - 1.0).abs() < 1e-9);
        assert!((trend_slope(&[3.0, 3.0, 3.0]).unwrap()).abs() < 1e-9);
        assert!(trend_slope(&[2.0]).is_none());
    }

    #[test]
    fn difficulty_trends() {
        let now = Utc::now();
        let mut h = LearningHistory::new("p", "general");
        assert_eq!(difficulty_insight(&h).trend, DifficultyTrend::InsufficientData);

        for _ in 0..3 {
            record(&mut h, 2, Some(4), None, false, now);
        }
        assert_eq!(difficulty_insight(&h).trend, DifficultyTrend::TooEasy);

        let mut h = LearningHistory::new("p", "general");
        for _ in 0..3 {
            record(&mut h, 4, Some(2), None, false, now);
        }
        assert_eq!(difficulty_insight(&h).trend, DifficultyTrend::TooChallenging);

        let mut h = LearningHistory::new("p", "general");
        record(&mut h, 2, Some(2), None, false, now);
        record(&mut h, 3, Some(3), None, false, now);
        assert_eq!(difficulty_insight(&h).trend, DifficultyTrend::Plateau);

        record(&mut h, 4, Some(4), None, false, now);
        assert_eq!(difficulty_insight(&h).trend, DifficultyTrend::Progressing);
    }

    #[test]
    fn difficulty_ignores_non_learning_completions() {
        let now = Utc::now();
        let mut h = LearningHistory::new("p", "general");
        for _ in 0..3 {
            record(&mut h, 2, Some(4), None, false, now);
        }
        for i in 0..5 {
            let mut pause = TimeBlock::new(format!("break{i}"), BlockType::Break, "Break", 480, 15);
            pause.difficulty_rating = Some(1);
            h.record_completion(&pause, NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(), now);
        }

        let insight = difficulty_insight(&h);
        assert_eq!(insight.trend, DifficultyTrend::TooEasy);
        assert_eq!(insight.sample, 3);
        assert_eq!(insight.average_perceived, Some(4.0));
    }

    #[test]
    fn unrated_records_do_not_skew_comparison() {
        let now = Utc::now();
        let mut h = LearningHistory::new("p", "general");
        record(&mut h, 5, None, None, false, now);
        record(&mut h, 5, None, None, false, now);
        record(&mut h, 2, Some(2), None, false, now);
        // Rated record matches its own assignment, so the spread decides.
        assert_eq!(difficulty_insight(&h).trend, DifficultyTrend::Progressing);
    }

    #[test]
    fn energy_uses_last_seven() {
        let now = Utc::now();
        let mut h = LearningHistory::new("p", "general");
        for e in [5, 5, 5, 1, 2, 3, 4, 5, 5] {
            record(&mut h, 2, None, Some(e), false, now);
        }
        let insight = energy_insight(&h);
        assert_eq!(insight.sample, 7);
        assert_eq!(insight.trend, EnergyTrend::Rising);
    }

    #[test]
    fn breakthrough_levels() {
        let now = Utc::now();
        let mut h = LearningHistory::new("p", "general");
        assert_eq!(breakthrough_insight(&h).level, RateLevel::Low);
        record(&mut h, 2, None, None, true, now);
        record(&mut h, 2, None, None, false, now);
        assert_eq!(breakthrough_insight(&h).level, RateLevel::High);
        for _ in 0..6 {
            record(&mut h, 2, None, None, false, now);
        }
        assert_eq!(breakthrough_insight(&h).level, RateLevel::Moderate);
    }

    #[test]
    fn velocity_levels() {
        let now = Utc::now();
        let mut h = LearningHistory::new("p", "general");
        assert_eq!(velocity_insight(&h, now).level, VelocityLevel::Stalled);
        record(&mut h, 2, None, None, false, now - Duration::days(20));
        assert_eq!(velocity_insight(&h, now).level, VelocityLevel::Stalled);
        record(&mut h, 2, None, None, false, now);
        assert_eq!(velocity_insight(&h, now).level, VelocityLevel::Slow);
        for _ in 0..3 {
            record(&mut h, 2, None, None, false, now);
        }
        assert_eq!(velocity_insight(&h, now).level, VelocityLevel::Steady);
        for _ in 0..3 {
            record(&mut h, 2, None, None, false, now);
        }
        assert_eq!(velocity_insight(&h, now).level, VelocityLevel::High);
    }

    fn graph(done: usize, total: usize) -> TaskGraph {
        let mut g = TaskGraph::new("p", "general");
        for i in 0..total {
            let mut n = FrontierNode::new(format!("n{i}"), "N", "b");
            if i < done {
                n.complete(Utc::now(), None, None);
            }
            g.nodes.push(n);
        }
        g
    }

    #[test]
    fn pacing_status_by_urgency() {
        let now = Utc::now();
        let mut project = ProjectConfig::new("p", "goal").with_urgency(Urgency::Critical);
        project.created_at = now - Duration::days(20);

        let p = pacing(&project, &graph(1, 10), now);
        assert_eq!(p.expected_percent, 40.0);
        assert_eq!(p.status, PacingStatus::Behind);

        let p = pacing(&project, &graph(5, 10), now);
        assert_eq!(p.status, PacingStatus::OnTrack);

        let p = pacing(&project, &graph(6, 10), now);
        assert_eq!(p.status, PacingStatus::Ahead);

        let p = pacing(&project, &graph(3, 10), now);
        assert_eq!(p.status, PacingStatus::OnTrack);

        let p = pacing(&project, &graph(2, 10), now);
        assert_eq!(p.status, PacingStatus::SlightlyBehind);

        project.created_at = now - Duration::days(400);
        assert_eq!(pacing(&project, &graph(0, 1), now).expected_percent, 100.0);
    }

    #[test]
    fn detail_only_when_requested() {
        let now = Utc::now();
        let mut h = LearningHistory::new("p", "general");
        record(&mut h, 2, Some(2), Some(3), true, now);
        let project = ProjectConfig::new("p", "goal");
        let brief = analyze(&project, &graph(0, 1), &h, now, false);
        assert!(brief.detail.is_none());

        let full = analyze(&project, &graph(0, 1), &h, now, true);
        let detail = full.detail.as_ref().unwrap();
        assert_eq!(detail.skills[0].branch, "basics");
        assert_eq!(detail.recent_insights, vec!["insight"]);
        assert!(full.summary().contains("Skill basics: level 1"));
    }
}
