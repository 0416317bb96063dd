//! Path status report.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::graph::{BlockedNode, PriorityTier, ReadinessResolver, TaskGraph};
use crate::schedule::DaySchedule;

#[derive(Debug, Clone, Serialize)]
pub struct BranchProgress {
    pub id: String,
    pub title: String,
    pub priority: PriorityTier,
    pub completed: usize,
    pub total: usize,
    pub complete: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopTask {
    pub id: String,
    pub title: String,
    pub branch: String,
    pub priority: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DayProgress {
    pub date: NaiveDate,
    pub completed_blocks: usize,
    pub total_blocks: usize,
    pub learning_minutes: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub project_id: String,
    pub path: String,
    pub branches: Vec<BranchProgress>,
    pub completed: usize,
    pub total: usize,
    pub completion_percent: f64,
    pub ready: usize,
    pub blocked: usize,
    /// Blocked nodes with prerequisites that name no node.
    pub orphaned: Vec<BlockedNode>,
    pub last_evolution: Option<DateTime<Utc>>,
    pub top_ready: Option<TopTask>,
    pub today: Option<DayProgress>,
}

impl StatusReport {
    pub fn build(graph: &TaskGraph, resolver: ReadinessResolver, today: Option<&DaySchedule>) -> Self {
        let readiness = resolver.resolve(&graph.nodes);

        let branches = graph
            .branches
            .iter()
            .map(|b| {
                let nodes: Vec<_> = graph.nodes.iter().filter(|n| n.branch == b.id).collect();
                BranchProgress {
                    id: b.id.clone(),
                    title: b.title.clone(),
                    priority: b.priority,
                    completed: nodes.iter().filter(|n| n.completed).count(),
                    total: nodes.len(),
                    complete: graph.branch_complete(&b.id),
                }
            })
            .collect();

        // Highest priority, first in graph order on ties.
        let top_ready = readiness
            .ready
            .iter()
            .copied()
            .reduce(|best, n| if n.priority > best.priority { n } else { best })
            .map(|n| TopTask {
                id: n.id.clone(),
                title: n.title.clone(),
                branch: n.branch.clone(),
                priority: n.priority,
            });

        let today = today.map(|s| DayProgress {
            date: s.date,
            completed_blocks: s.completed_count(),
            total_blocks: s.blocks.len(),
            learning_minutes: s.learning_minutes(),
        });

        Self {
            project_id: graph.project_id.clone(),
            path: graph.path.clone(),
            branches,
            completed: graph.completed_count(),
            total: graph.nodes.len(),
            completion_percent: graph.completion_percent(),
            ready: readiness.ready.len(),
            blocked: readiness.blocked.len(),
            orphaned: readiness.blocked.into_iter().filter(|b| !b.orphaned.is_empty()).collect(),
            last_evolution: graph.last_evolution,
            top_ready,
            today,
        }
    }

    pub fn summary(&self) -> String {
        let mut lines = vec![format!(
            "Path '{}': {}/{} tasks complete ({:.0}%), {} ready, {} blocked",
            self.path, self.completed, self.total, self.completion_percent, self.ready, self.blocked
        )];
        for b in &self.branches {
            let mark = if b.complete { "x" } else { " " };
            lines.push(format!("  [{mark}] {} {}/{}", b.title, b.completed, b.total));
        }
        for o in &self.orphaned {
            lines.push(format!("  ! {} waits on missing {}", o.id, o.orphaned.join(", ")));
        }
        match &self.top_ready {
            Some(t) => lines.push(format!("Top ready task: {} (priority {})", t.title, t.priority)),
            None => lines.push("No ready tasks. Consider evolving the strategy.".to_string()),
        }
        if let Some(at) = self.last_evolution {
            lines.push(format!("Last evolved: {}", at.format("%Y-%m-%d %H:%M")));
        }
        if let Some(day) = &self.today {
            lines.push(format!(
                "Today ({}): {}/{} blocks done, {} learning minutes planned",
                day.date, day.completed_blocks, day.total_blocks, day.learning_minutes
            ));
        }
        lines.join("\n")
    }
}
