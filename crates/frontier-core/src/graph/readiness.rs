//! Prerequisite resolution.
//!
//! A node is ready when it is not completed and every prerequisite resolves
//! to a completed node. Prerequisites that name no node at all are
//! *orphaned*: they can never be satisfied, so the node stays blocked, and
//! the orphan is reported in [`Readiness::blocked`] and logged.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::FrontierNode;

/// How a prerequisite string is matched against completed nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrerequisiteMatching {
    /// Prerequisites are node ids.
    #[default]
    IdOnly,
    /// A completed node's title also satisfies a prerequisite.
    IdOrTitle,
}

impl PrerequisiteMatching {
    pub fn from_title_fallback(enabled: bool) -> Self {
        if enabled {
            PrerequisiteMatching::IdOrTitle
        } else {
            PrerequisiteMatching::IdOnly
        }
    }
}

/// A node that is not completed and not ready.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockedNode {
    pub id: String,
    pub title: String,
    /// Prerequisites that exist but are not completed.
    pub waiting_on: Vec<String>,
    /// Prerequisites that reference no known node.
    pub orphaned: Vec<String>,
}

/// Result of resolving a node list.
#[derive(Debug, Clone)]
pub struct Readiness<'a> {
    /// Ready nodes, in graph order.
    pub ready: Vec<&'a FrontierNode>,
    pub blocked: Vec<BlockedNode>,
}

impl Readiness<'_> {
    pub fn orphaned_count(&self) -> usize {
        self.blocked.iter().filter(|b| !b.orphaned.is_empty()).count()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReadinessResolver {
    matching: PrerequisiteMatching,
}

impl ReadinessResolver {
    pub fn new(matching: PrerequisiteMatching) -> Self {
        Self { matching }
    }

    /// Split incomplete nodes into ready and blocked.
    pub fn resolve<'a>(&self, nodes: &'a [FrontierNode]) -> Readiness<'a> {
        let completed_ids: HashSet<&str> = nodes
            .iter()
            .filter(|n| n.completed)
            .map(|n| n.id.as_str())
            .collect();
        let completed_titles: HashSet<&str> = match self.matching {
            PrerequisiteMatching::IdOrTitle => nodes
                .iter()
                .filter(|n| n.completed)
                .map(|n| n.title.as_str())
                .collect(),
            PrerequisiteMatching::IdOnly => HashSet::new(),
        };
        let known: HashSet<&str> = nodes
            .iter()
            .flat_map(|n| {
                let title = match self.matching {
                    PrerequisiteMatching::IdOrTitle => Some(n.title.as_str()),
                    PrerequisiteMatching::IdOnly => None,
                };
                std::iter::once(n.id.as_str()).chain(title)
            })
            .collect();

        let mut ready = Vec::new();
        let mut blocked = Vec::new();

        for node in nodes.iter().filter(|n| !n.completed) {
            let mut waiting_on = Vec::new();
            let mut orphaned = Vec::new();

            for prereq in &node.prerequisites {
                let p = prereq.as_str();
                if completed_ids.contains(p) || completed_titles.contains(p) {
                    continue;
                }
                if known.contains(p) {
                    waiting_on.push(prereq.clone());
                } else {
                    orphaned.push(prereq.clone());
                }
            }

            if waiting_on.is_empty() && orphaned.is_empty() {
                ready.push(node);
                continue;
            }

            if !orphaned.is_empty() {
                tracing::warn!(
                    node = %node.id,
                    orphaned = ?orphaned,
                    "node blocked by prerequisites that reference no node"
                );
            }
            blocked.push(BlockedNode {
                id: node.id.clone(),
                title: node.title.clone(),
                waiting_on,
                orphaned,
            });
        }

        Readiness { ready, blocked }
    }

    pub fn ready_nodes<'a>(&self, nodes: &'a [FrontierNode]) -> Vec<&'a FrontierNode> {
        self.resolve(nodes).ready
    }
}
