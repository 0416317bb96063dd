//! Tree building: branch design, then nodes per branch.

use std::collections::{HashMap, HashSet};

use super::{slugify, FrontierNode, PriorityBaselines, PriorityTier, StrategicBranch, TaskGraph};
use crate::intelligence::{BranchRequest, GenerationSource, GeneratorChain, NodeDraft, NodeRequest};

/// Priority step between consecutive branches.
pub const BRANCH_PRIORITY_STEP: i64 = 10;

/// What to build a tree for.
#[derive(Debug, Clone)]
pub struct TreeSpec<'a> {
    pub goal: &'a str,
    pub path: &'a str,
    pub style: &'a str,
    pub focus_areas: &'a [String],
}

#[derive(Debug, Clone)]
pub struct BuiltTree {
    pub graph: TaskGraph,
    /// True if any part came from the built-in generators.
    pub used_fallback: bool,
}

pub struct TreeBuilder<'a> {
    generator: &'a GeneratorChain,
    priorities: PriorityBaselines,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(generator: &'a GeneratorChain, priorities: PriorityBaselines) -> Self {
        Self { generator, priorities }
    }

    pub fn build(&self, project_id: &str, spec: &TreeSpec<'_>) -> BuiltTree {
        let mut graph = TaskGraph::new(project_id, spec.path);
        graph.style = spec.style.to_string();

        let designed = self.generator.design_branches(&BranchRequest {
            goal: spec.goal,
            path: spec.path,
            style: spec.style,
            focus_areas: spec.focus_areas,
        });
        let mut used_fallback = designed.source == GenerationSource::Fallback;

        let count = designed.value.len();
        let mut branch_ids = HashSet::new();
        for (index, draft) in designed.value.into_iter().enumerate() {
            let id = unique_id(slugify(&draft.title), &mut branch_ids);
            graph.branches.push(StrategicBranch {
                id,
                title: draft.title,
                description: draft.description,
                priority: draft.priority.unwrap_or_else(|| PriorityTier::by_position(index, count)),
                completed: false,
            });
        }

        let mut previous_head: Option<String> = None;
        for index in 0..graph.branches.len() {
            let branch = graph.branches[index].clone();
            let generated = self.generator.branch_nodes(&NodeRequest {
                goal: spec.goal,
                path: spec.path,
                style: spec.style,
                branch: &branch,
                branch_index: index,
            });
            used_fallback |= generated.source == GenerationSource::Fallback;

            let priority = self.priorities.baseline - BRANCH_PRIORITY_STEP * index as i64;
            let mut nodes = materialize(&graph, &generated.value, &branch.id, priority);

            if let (Some(head), Some(first)) = (&previous_head, nodes.first_mut()) {
                if first.prerequisites.is_empty() {
                    first.prerequisites.push(head.clone());
                }
            }
            previous_head = nodes.first().map(|n| n.id.clone()).or(previous_head);
            graph.append_nodes(nodes);
        }

        tracing::info!(
            project = project_id,
            path = spec.path,
            branches = graph.branches.len(),
            nodes = graph.nodes.len(),
            used_fallback,
            "task tree built"
        );

        BuiltTree { graph, used_fallback }
    }
}

fn unique_id(base: String, taken: &mut HashSet<String>) -> String {
    let mut id = base.clone();
    let mut n = 2;
    while taken.contains(&id) {
        id = format!("{base}-{n}");
        n += 1;
    }
    taken.insert(id.clone());
    id
}

/// Turn drafts into nodes for `branch` with ids unique in `graph`.
///
/// Draft prerequisites that name a title, in the same batch first and then
/// among existing nodes, are rewritten to that node's id; anything else is
/// kept verbatim.
pub fn materialize(graph: &TaskGraph, drafts: &[NodeDraft], branch: &str, priority: i64) -> Vec<FrontierNode> {
    let mut taken: HashSet<String> = graph.nodes.iter().map(|n| n.id.clone()).collect();
    let ids: Vec<String> = drafts
        .iter()
        .map(|d| unique_id(format!("{branch}-{}", slugify(&d.title)), &mut taken))
        .collect();
    let mut by_title: HashMap<&str, &str> = HashMap::new();
    for node in &graph.nodes {
        by_title.entry(node.title.as_str()).or_insert(node.id.as_str());
    }
    for (draft, id) in drafts.iter().zip(&ids) {
        by_title.insert(draft.title.as_str(), id.as_str());
    }

    drafts
        .iter()
        .zip(&ids)
        .map(|(draft, id)| {
            let prerequisites = draft
                .prerequisites
                .iter()
                .map(|p| by_title.get(p.as_str()).map_or_else(|| p.clone(), |id| id.to_string()))
                .collect();
            FrontierNode::new(id.clone(), draft.title.clone(), branch)
                .with_description(draft.description.clone())
                .with_difficulty(draft.difficulty)
                .with_duration(draft.duration.clone())
                .with_priority(priority)
                .with_prerequisites(prerequisites)
        })
        .collect()
}
