//! Generative content: branch designs, node text, evolution tasks.
//!
//! An [`IntelligenceProvider`] is an external service answering typed
//! requests with JSON. It may be absent, slow, or wrong, so components never
//! call it directly. They go through a [`GeneratorChain`], which tries the
//! [`RemoteGenerator`] once when a provider is configured and otherwise (or
//! on any [`ProviderError`]) answers from the deterministic
//! [`FallbackGenerator`].

pub mod fallback;
pub mod http;

pub use fallback::FallbackGenerator;
pub use http::HttpProvider;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

use crate::error::ProviderError;
use crate::graph::{clamp_difficulty, PriorityTier, StrategicBranch};
use crate::storage::IntelligenceConfig;

/// Request kinds understood by intelligence providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestType {
    BranchDesign,
    BranchNodeGeneration,
    TaskGeneration,
    NextTaskSelection,
    RoleInference,
    TargetRoleInference,
    CredentialsToSkillsMapping,
}

impl RequestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestType::BranchDesign => "branch-design",
            RequestType::BranchNodeGeneration => "branch-node-generation",
            RequestType::TaskGeneration => "task-generation",
            RequestType::NextTaskSelection => "next-task-selection",
            RequestType::RoleInference => "role-inference",
            RequestType::TargetRoleInference => "target-role-inference",
            RequestType::CredentialsToSkillsMapping => "credentials-to-skills-mapping",
        }
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// External service answering typed JSON requests.
pub trait IntelligenceProvider: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    fn request(&self, kind: RequestType, payload: &Value) -> Result<Value, ProviderError>;
}

/// A proposed branch, before it is given an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: Option<PriorityTier>,
}

/// A proposed node, before it is given an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub difficulty: u8,
    pub duration: String,
    /// Titles of other drafts in the same batch, or ids of existing nodes.
    #[serde(default)]
    pub prerequisites: Vec<String>,
}

impl NodeDraft {
    pub fn new(title: impl Into<String>, difficulty: u8, duration: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            difficulty: clamp_difficulty(difficulty),
            duration: duration.into(),
            prerequisites: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn after(mut self, prerequisite: impl Into<String>) -> Self {
        self.prerequisites.push(prerequisite.into());
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BranchRequest<'a> {
    pub goal: &'a str,
    pub path: &'a str,
    pub style: &'a str,
    pub focus_areas: &'a [String],
}

#[derive(Debug, Clone, Serialize)]
pub struct NodeRequest<'a> {
    pub goal: &'a str,
    pub path: &'a str,
    pub style: &'a str,
    pub branch: &'a StrategicBranch,
    /// Position of the branch in the tree.
    pub branch_index: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvolutionRequest<'a> {
    pub goal: &'a str,
    pub path: &'a str,
    pub strategy: &'a str,
    pub indicators: &'a [String],
    pub feedback: Option<&'a str>,
    pub completed_titles: &'a [String],
    pub available_titles: &'a [String],
}

/// Capability to produce content for the task graph.
pub trait ContentGenerator {
    fn design_branches(&self, request: &BranchRequest<'_>) -> Result<Vec<BranchDraft>, ProviderError>;

    fn branch_nodes(&self, request: &NodeRequest<'_>) -> Result<Vec<NodeDraft>, ProviderError>;

    fn evolution_tasks(&self, request: &EvolutionRequest<'_>) -> Result<Vec<NodeDraft>, ProviderError>;
}

/// Generator backed by an [`IntelligenceProvider`], validating response shapes.
pub struct RemoteGenerator {
    provider: Box<dyn IntelligenceProvider>,
}

impl RemoteGenerator {
    pub fn new(provider: Box<dyn IntelligenceProvider>) -> Self {
        Self { provider }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    fn nodes(&self, kind: RequestType, payload: Value) -> Result<Vec<NodeDraft>, ProviderError> {
        let response = self.provider.request(kind, &payload)?;
        parse_nodes(&response)
    }
}

impl ContentGenerator for RemoteGenerator {
    fn design_branches(&self, request: &BranchRequest<'_>) -> Result<Vec<BranchDraft>, ProviderError> {
        let payload = serde_json::to_value(request)
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        let response = self.provider.request(RequestType::BranchDesign, &payload)?;
        parse_branches(&response)
    }

    fn branch_nodes(&self, request: &NodeRequest<'_>) -> Result<Vec<NodeDraft>, ProviderError> {
        let payload = json!({
            "goal": request.goal,
            "path": request.path,
            "style": request.style,
            "branch": {
                "id": request.branch.id,
                "title": request.branch.title,
                "description": request.branch.description,
            },
        });
        self.nodes(RequestType::BranchNodeGeneration, payload)
    }

    fn evolution_tasks(&self, request: &EvolutionRequest<'_>) -> Result<Vec<NodeDraft>, ProviderError> {
        let payload = serde_json::to_value(request)
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        self.nodes(RequestType::TaskGeneration, payload)
    }
}

/// Items under the first present key, or the value itself if it is an array.
fn items<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Vec<Value>> {
    keys.iter()
        .find_map(|k| value.get(*k).and_then(Value::as_array))
        .or_else(|| value.as_array())
}

#[derive(Deserialize)]
struct RawBranch {
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    priority: Option<String>,
}

#[derive(Deserialize)]
struct RawNode {
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    difficulty: Option<f64>,
    #[serde(default)]
    duration: Option<Value>,
    #[serde(default)]
    prerequisites: Vec<String>,
}

fn parse_branches(response: &Value) -> Result<Vec<BranchDraft>, ProviderError> {
    let raw = items(response, &["branches"])
        .ok_or_else(|| ProviderError::InvalidResponse("expected a list of branches".into()))?;

    let drafts: Vec<BranchDraft> = raw
        .iter()
        .filter_map(|item| serde_json::from_value::<RawBranch>(item.clone()).ok())
        .filter(|b| !b.title.trim().is_empty())
        .map(|b| BranchDraft {
            title: b.title.trim().to_string(),
            description: b.description,
            priority: b.priority.as_deref().and_then(parse_tier),
        })
        .collect();

    if drafts.is_empty() {
        return Err(ProviderError::InvalidResponse("no usable branches".into()));
    }
    Ok(drafts)
}

fn parse_tier(text: &str) -> Option<PriorityTier> {
    match text.trim().to_ascii_lowercase().as_str() {
        "high" => Some(PriorityTier::High),
        "medium" => Some(PriorityTier::Medium),
        "low" => Some(PriorityTier::Low),
        _ => None,
    }
}

fn parse_nodes(response: &Value) -> Result<Vec<NodeDraft>, ProviderError> {
    let raw = items(response, &["nodes", "tasks"])
        .ok_or_else(|| ProviderError::InvalidResponse("expected a list of nodes".into()))?;

    let drafts: Vec<NodeDraft> = raw
        .iter()
        .filter_map(|item| serde_json::from_value::<RawNode>(item.clone()).ok())
        .filter(|n| !n.title.trim().is_empty())
        .map(|n| {
            let difficulty = n.difficulty.map_or(2, |d| d.round().clamp(1.0, 5.0) as u8);
            let duration = match n.duration {
                Some(Value::String(s)) if !s.trim().is_empty() => s,
                Some(Value::Number(m)) => format!("{} minutes", m.as_u64().unwrap_or(30)),
                _ => "30 minutes".to_string(),
            };
            NodeDraft {
                title: n.title.trim().to_string(),
                description: n.description,
                difficulty,
                duration,
                prerequisites: n.prerequisites,
            }
        })
        .collect();

    if drafts.is_empty() {
        return Err(ProviderError::InvalidResponse("no usable nodes".into()));
    }
    Ok(drafts)
}

/// Which generator produced a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationSource {
    Remote,
    Fallback,
}

impl fmt::Display for GenerationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationSource::Remote => f.write_str("remote"),
            GenerationSource::Fallback => f.write_str("fallback"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Generated<T> {
    pub value: T,
    pub source: GenerationSource,
}

/// Remote generator first when configured, fallback on any failure.
pub struct GeneratorChain {
    remote: Option<RemoteGenerator>,
    fallback: FallbackGenerator,
}

impl Default for GeneratorChain {
    fn default() -> Self {
        Self::fallback_only()
    }
}

impl GeneratorChain {
    pub fn fallback_only() -> Self {
        Self {
            remote: None,
            fallback: FallbackGenerator,
        }
    }

    pub fn with_provider(provider: Box<dyn IntelligenceProvider>) -> Self {
        Self {
            remote: Some(RemoteGenerator::new(provider)),
            fallback: FallbackGenerator,
        }
    }

    /// Chain for the configured provider, or fallback only when disabled.
    ///
    /// A provider that cannot be constructed is logged and skipped.
    pub fn from_config(config: &IntelligenceConfig) -> Self {
        match HttpProvider::from_config(config) {
            Ok(Some(provider)) => Self::with_provider(Box::new(provider)),
            Ok(None) => Self::fallback_only(),
            Err(e) => {
                tracing::warn!(error = %e, "intelligence provider unavailable, using built-in generators");
                Self::fallback_only()
            }
        }
    }

    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    fn run<T>(
        &self,
        kind: RequestType,
        remote: impl FnOnce(&RemoteGenerator) -> Result<T, ProviderError>,
        fallback: impl FnOnce(&FallbackGenerator) -> T,
    ) -> Generated<T> {
        if let Some(generator) = &self.remote {
            match remote(generator) {
                Ok(value) => {
                    tracing::debug!(request = %kind, provider = generator.provider_name(), "remote content accepted");
                    return Generated {
                        value,
                        source: GenerationSource::Remote,
                    };
                }
                Err(e) => {
                    tracing::warn!(
                        request = %kind,
                        provider = generator.provider_name(),
                        error = %e,
                        "intelligence request failed, using built-in generator"
                    );
                }
            }
        }
        Generated {
            value: fallback(&self.fallback),
            source: GenerationSource::Fallback,
        }
    }

    pub fn design_branches(&self, request: &BranchRequest<'_>) -> Generated<Vec<BranchDraft>> {
        self.run(
            RequestType::BranchDesign,
            |g| g.design_branches(request),
            |f| f.branches(request),
        )
    }

    pub fn branch_nodes(&self, request: &NodeRequest<'_>) -> Generated<Vec<NodeDraft>> {
        self.run(
            RequestType::BranchNodeGeneration,
            |g| g.branch_nodes(request),
            |f| f.nodes(request),
        )
    }

    pub fn evolution_tasks(&self, request: &EvolutionRequest<'_>) -> Generated<Vec<NodeDraft>> {
        self.run(
            RequestType::TaskGeneration,
            |g| g.evolution_tasks(request),
            |f| f.tasks(request),
        )
    }
}
