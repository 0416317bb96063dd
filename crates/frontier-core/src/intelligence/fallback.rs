//! Deterministic content used when no provider answers.

use super::{BranchDraft, BranchRequest, ContentGenerator, EvolutionRequest, NodeDraft, NodeRequest};
use crate::error::ProviderError;
use crate::graph::PriorityTier;

/// Branch titles used when the caller names no focus areas.
pub const DEFAULT_BRANCHES: [&str; 4] = ["Foundations", "Core Skills", "Applied Practice", "Mastery & Sharing"];

#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackGenerator;

impl FallbackGenerator {
    /// One branch per focus area, or the four defaults.
    pub fn branches(&self, request: &BranchRequest<'_>) -> Vec<BranchDraft> {
        let titles: Vec<String> = {
            let focus: Vec<String> = request
                .focus_areas
                .iter()
                .map(|f| f.trim().to_string())
                .filter(|f| !f.is_empty())
                .collect();
            if focus.is_empty() {
                DEFAULT_BRANCHES.iter().map(|t| t.to_string()).collect()
            } else {
                focus
            }
        };
        let count = titles.len();

        titles
            .into_iter()
            .enumerate()
            .map(|(i, title)| BranchDraft {
                description: format!("{title} toward: {}", request.goal),
                title,
                priority: Some(PriorityTier::by_position(i, count)),
            })
            .collect()
    }

    /// Explore, practise, apply: a three-step chain of rising difficulty.
    pub fn nodes(&self, request: &NodeRequest<'_>) -> Vec<NodeDraft> {
        let topic = &request.branch.title;
        let explore = format!("Explore {topic}");
        let practise = format!("Practise {topic}");
        let apply = format!("Apply {topic}");

        vec![
            NodeDraft::new(explore.clone(), 1, "20 minutes")
                .with_description(format!("Survey the key ideas of {topic} and note what stands out.")),
            NodeDraft::new(practise.clone(), 2, "30 minutes")
                .with_description(format!("Work through a focused exercise in {topic}."))
                .after(explore),
            NodeDraft::new(apply, 3, "45 minutes")
                .with_description(format!("Use {topic} on a small piece of real work toward: {}", request.goal))
                .after(practise),
        ]
    }

    /// A light exploration task and a deeper practice task.
    pub fn tasks(&self, request: &EvolutionRequest<'_>) -> Vec<NodeDraft> {
        vec![
            NodeDraft::new("Explore a new angle", 1, "20 minutes")
                .with_description(format!("Look for an unfamiliar resource or example related to: {}", request.goal)),
            NodeDraft::new("Deliberate practice session", 3, "45 minutes")
                .with_description(format!("Pick the hardest open question in {} and practise it directly.", request.path)),
        ]
    }
}

impl ContentGenerator for FallbackGenerator {
    fn design_branches(&self, request: &BranchRequest<'_>) -> Result<Vec<BranchDraft>, ProviderError> {
        Ok(self.branches(request))
    }

    fn branch_nodes(&self, request: &NodeRequest<'_>) -> Result<Vec<NodeDraft>, ProviderError> {
        Ok(self.nodes(request))
    }

    fn evolution_tasks(&self, request: &EvolutionRequest<'_>) -> Result<Vec<NodeDraft>, ProviderError> {
        Ok(self.tasks(request))
    }
}
