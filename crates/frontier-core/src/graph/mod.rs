//! Task graph: strategic branches and the frontier nodes inside them.
//!
//! One [`TaskGraph`] exists per learning path. Nodes are appended by tree
//! building, completion follow-ups, opportunity detection and strategy
//! evolution; they are completed in place and never removed.

pub mod builder;
pub mod readiness;

pub use builder::{materialize, BuiltTree, TreeBuilder, TreeSpec};
pub use readiness::{BlockedNode, PrerequisiteMatching, Readiness, ReadinessResolver};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::parse;
use crate::storage::{Document, DocumentId};

pub const GRAPH_KEY: &str = "graph";

/// Minutes assumed for a node whose duration text is unparsable.
pub const DEFAULT_NODE_MINUTES: u32 = 30;

/// Why an opportunity node was generated.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OpportunityTag {
    BreakthroughAmplification,
    Networking,
    ViralLeverage,
}

impl fmt::Display for OpportunityTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OpportunityTag::BreakthroughAmplification => "breakthrough_amplification",
            OpportunityTag::Networking => "networking",
            OpportunityTag::ViralLeverage => "viral_leverage",
        };
        f.write_str(s)
    }
}

/// Priority assigned to nodes by the code paths that create them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityBaselines {
    #[serde(default = "default_baseline")]
    pub baseline: i64,
    #[serde(default = "default_baseline")]
    pub follow_up: i64,
    #[serde(default = "default_breakthrough_follow_up")]
    pub breakthrough_follow_up: i64,
    #[serde(default = "default_amplification")]
    pub amplification: i64,
    #[serde(default = "default_networking")]
    pub networking: i64,
    #[serde(default = "default_viral")]
    pub viral: i64,
}

fn default_baseline() -> i64 {
    200
}
fn default_breakthrough_follow_up() -> i64 {
    250
}
fn default_amplification() -> i64 {
    350
}
fn default_networking() -> i64 {
    300
}
fn default_viral() -> i64 {
    320
}

impl Default for PriorityBaselines {
    fn default() -> Self {
        Self {
            baseline: default_baseline(),
            follow_up: default_baseline(),
            breakthrough_follow_up: default_breakthrough_follow_up(),
            amplification: default_amplification(),
            networking: default_networking(),
            viral: default_viral(),
        }
    }
}

/// A candidate unit of work.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FrontierNode {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub branch: String,
    /// 1 (trivial) to 5 (hard).
    pub difficulty: u8,
    /// Free-text estimate such as "30 minutes".
    pub duration: String,
    /// Ids of nodes that must be completed first.
    #[serde(default)]
    pub prerequisites: Vec<String>,
    pub priority: i64,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub actual_difficulty: Option<u8>,
    #[serde(default)]
    pub actual_minutes: Option<u32>,
    #[serde(default)]
    pub opportunity: Option<OpportunityTag>,
    #[serde(default)]
    pub generated: bool,
}

impl FrontierNode {
    pub fn new(id: impl Into<String>, title: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            branch: branch.into(),
            difficulty: 1,
            duration: format!("{DEFAULT_NODE_MINUTES} minutes"),
            prerequisites: Vec::new(),
            priority: default_baseline(),
            completed: false,
            completed_at: None,
            actual_difficulty: None,
            actual_minutes: None,
            opportunity: None,
            generated: false,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_difficulty(mut self, difficulty: u8) -> Self {
        self.difficulty = clamp_difficulty(difficulty);
        self
    }

    pub fn with_duration(mut self, duration: impl Into<String>) -> Self {
        self.duration = duration.into();
        self
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_prerequisites(mut self, prerequisites: Vec<String>) -> Self {
        self.prerequisites = prerequisites;
        self
    }

    pub fn with_opportunity(mut self, tag: OpportunityTag) -> Self {
        self.opportunity = Some(tag);
        self
    }

    pub fn generated(mut self) -> Self {
        self.generated = true;
        self
    }

    /// Duration estimate normalized to minutes.
    pub fn duration_minutes(&self) -> u32 {
        parse::minutes_or(&self.duration, DEFAULT_NODE_MINUTES)
    }

    /// Mark completed, copying back what the user actually experienced.
    pub fn complete(&mut self, at: DateTime<Utc>, actual_difficulty: Option<u8>, actual_minutes: Option<u32>) {
        self.completed = true;
        self.completed_at = Some(at);
        self.actual_difficulty = actual_difficulty.map(clamp_difficulty);
        self.actual_minutes = actual_minutes;
    }
}

pub fn clamp_difficulty(difficulty: u8) -> u8 {
    difficulty.clamp(1, 5)
}

/// Priority tier of a branch.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Default)]
#[serde(rename_all = "lowercase")]
pub enum PriorityTier {
    High,
    #[default]
    Medium,
    Low,
}

impl PriorityTier {
    /// Tier for the branch at `index` of `count`, highest first.
    pub fn by_position(index: usize, count: usize) -> Self {
        if count <= 1 || index * 3 < count {
            PriorityTier::High
        } else if index * 3 < count * 2 {
            PriorityTier::Medium
        } else {
            PriorityTier::Low
        }
    }
}

/// Thematic grouping of nodes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StrategicBranch {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: PriorityTier,
    /// Manual override; completion is otherwise derived from nodes.
    #[serde(default)]
    pub completed: bool,
}

/// Branches and nodes for one learning path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskGraph {
    pub project_id: String,
    pub path: String,
    #[serde(default)]
    pub style: String,
    #[serde(default)]
    pub branches: Vec<StrategicBranch>,
    #[serde(default)]
    pub nodes: Vec<FrontierNode>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub last_evolution: Option<DateTime<Utc>>,
}

impl TaskGraph {
    pub fn new(project_id: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            path: path.into(),
            style: String::new(),
            branches: Vec::new(),
            nodes: Vec::new(),
            created_at: Utc::now(),
            last_evolution: None,
        }
    }

    pub fn node(&self, id: &str) -> Option<&FrontierNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut FrontierNode> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    pub fn branch(&self, id: &str) -> Option<&StrategicBranch> {
        self.branches.iter().find(|b| b.id == id)
    }

    pub fn completed_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.completed).count()
    }

    /// Percentage of nodes completed, 0 for an empty graph.
    pub fn completion_percent(&self) -> f64 {
        if self.nodes.is_empty() {
            return 0.0;
        }
        self.completed_count() as f64 * 100.0 / self.nodes.len() as f64
    }

    /// A branch is complete when flagged, or when it has nodes and all are done.
    pub fn branch_complete(&self, branch_id: &str) -> bool {
        if self.branch(branch_id).is_some_and(|b| b.completed) {
            return true;
        }
        let mut nodes = self.nodes.iter().filter(|n| n.branch == branch_id).peekable();
        nodes.peek().is_some() && nodes.all(|n| n.completed)
    }

    /// Branch for new nodes that have no natural parent.
    pub fn default_branch(&self) -> String {
        self.branches
            .iter()
            .find(|b| !self.branch_complete(&b.id))
            .or_else(|| self.branches.first())
            .map(|b| b.id.clone())
            .unwrap_or_else(|| self.path.clone())
    }

    /// Append nodes, renaming any whose id is already taken.
    ///
    /// Returns the ids actually used, in order.
    pub fn append_nodes(&mut self, nodes: Vec<FrontierNode>) -> Vec<String> {
        let mut taken: HashSet<String> = self.nodes.iter().map(|n| n.id.clone()).collect();
        let mut ids = Vec::with_capacity(nodes.len());
        for mut node in nodes {
            if taken.contains(&node.id) {
                let base = node.id.clone();
                let mut n = 2;
                while taken.contains(&format!("{base}-{n}")) {
                    n += 1;
                }
                node.id = format!("{base}-{n}");
            }
            taken.insert(node.id.clone());
            ids.push(node.id.clone());
            self.nodes.push(node);
        }
        ids
    }
}

impl Document for TaskGraph {
    fn owner_mismatch(&self, id: &DocumentId<'_>) -> Option<String> {
        let path_ok = id.path.map_or(true, |p| p == self.path);
        (self.project_id != id.project || !path_ok)
            .then(|| format!("{}/{}", self.project_id, self.path))
    }
}

/// Lowercase, dash-separated identifier fragment.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut dash = false;
    for c in text.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
            dash = false;
        } else if !dash && !slug.is_empty() {
            slug.push('-');
            dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    if slug.is_empty() {
        "node".to_string()
    } else {
        slug.chars().take(40).collect()
    }
}

/// Short unique id with a readable prefix.
pub fn generated_id(prefix: &str) -> String {
    let uuid = uuid::Uuid::new_v4().simple().to_string();
    format!("{prefix}-{}", &uuid[..8])
}
