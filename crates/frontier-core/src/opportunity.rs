//! Opportunity signals captured when a block is completed.
//!
//! An [`OpportunityContext`] carries what happened around a piece of work
//! beyond the work itself: how engaged the user was, surprises, outside
//! feedback, virality. [`analyze`] turns it into opportunity records and a
//! recommended path label.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Engagement assumed when the user gives none.
pub const DEFAULT_ENGAGEMENT: u8 = 5;

/// Engagement at or above which the user shows natural talent.
pub const HIGH_ENGAGEMENT: u8 = 8;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    #[default]
    Neutral,
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for Sentiment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "positive" | "+" => Ok(Sentiment::Positive),
            "negative" | "-" => Ok(Sentiment::Negative),
            "neutral" | "" => Ok(Sentiment::Neutral),
            other => Err(format!("unknown sentiment '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExternalFeedback {
    pub source: String,
    pub content: String,
    #[serde(default)]
    pub sentiment: Sentiment,
}

/// Free-form signals attached to a completed block.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OpportunityContext {
    /// 1 to 10.
    #[serde(default = "default_engagement")]
    pub engagement_level: u8,
    #[serde(default)]
    pub unexpected_results: Vec<String>,
    #[serde(default)]
    pub new_skills_revealed: Vec<String>,
    #[serde(default)]
    pub external_feedback: Vec<ExternalFeedback>,
    #[serde(default)]
    pub social_reactions: Vec<String>,
    #[serde(default)]
    pub viral_potential: bool,
    #[serde(default)]
    pub industry_connections: Vec<String>,
    #[serde(default)]
    pub serendipitous_events: Vec<String>,
}

fn default_engagement() -> u8 {
    DEFAULT_ENGAGEMENT
}

impl Default for OpportunityContext {
    fn default() -> Self {
        Self {
            engagement_level: DEFAULT_ENGAGEMENT,
            unexpected_results: Vec::new(),
            new_skills_revealed: Vec::new(),
            external_feedback: Vec::new(),
            social_reactions: Vec::new(),
            viral_potential: false,
            industry_connections: Vec::new(),
            serendipitous_events: Vec::new(),
        }
    }
}

impl OpportunityContext {
    /// Whether the context says anything beyond the defaults.
    pub fn is_meaningful(&self) -> bool {
        self.engagement_level != DEFAULT_ENGAGEMENT
            || self.viral_potential
            || !self.unexpected_results.is_empty()
            || !self.new_skills_revealed.is_empty()
            || !self.external_feedback.is_empty()
            || !self.social_reactions.is_empty()
            || !self.industry_connections.is_empty()
            || !self.serendipitous_events.is_empty()
    }

    /// `Some(self)` if meaningful, else `None`.
    pub fn into_meaningful(self) -> Option<Self> {
        self.is_meaningful().then_some(self)
    }

    pub fn positive_feedback(&self) -> impl Iterator<Item = &ExternalFeedback> {
        self.external_feedback
            .iter()
            .filter(|f| f.sentiment == Sentiment::Positive)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OpportunityKind {
    NaturalTalent,
    SerendipitousDiscovery,
    ExternalValidation,
    ViralPotential,
}

impl fmt::Display for OpportunityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OpportunityKind::NaturalTalent => "natural_talent",
            OpportunityKind::SerendipitousDiscovery => "serendipitous_discovery",
            OpportunityKind::ExternalValidation => "external_validation",
            OpportunityKind::ViralPotential => "viral_potential",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Opportunity {
    pub kind: OpportunityKind,
    pub evidence: String,
}

/// Where the signals suggest taking the plan next.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecommendedPath {
    AcceleratedProfessionalPath,
    ExplorationAmplificationPath,
    NetworkingFocusPath,
    BreakthroughDeepeningPath,
    ContinuePlannedPath,
}

impl fmt::Display for RecommendedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RecommendedPath::AcceleratedProfessionalPath => "accelerated_professional_path",
            RecommendedPath::ExplorationAmplificationPath => "exploration_amplification_path",
            RecommendedPath::NetworkingFocusPath => "networking_focus_path",
            RecommendedPath::BreakthroughDeepeningPath => "breakthrough_deepening_path",
            RecommendedPath::ContinuePlannedPath => "continue_planned_path",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OpportunityAnalysis {
    pub opportunities: Vec<Opportunity>,
    pub recommended_path: RecommendedPath,
}

impl OpportunityAnalysis {
    pub fn none() -> Self {
        Self {
            opportunities: Vec::new(),
            recommended_path: RecommendedPath::ContinuePlannedPath,
        }
    }

    pub fn has(&self, kind: OpportunityKind) -> bool {
        self.opportunities.iter().any(|o| o.kind == kind)
    }
}

/// Detect opportunities in a completion context.
pub fn detect(context: &OpportunityContext) -> Vec<Opportunity> {
    let mut found = Vec::new();

    if context.engagement_level >= HIGH_ENGAGEMENT {
        found.push(Opportunity {
            kind: OpportunityKind::NaturalTalent,
            evidence: format!("engagement {}/10", context.engagement_level),
        });
    }
    if !context.unexpected_results.is_empty() {
        found.push(Opportunity {
            kind: OpportunityKind::SerendipitousDiscovery,
            evidence: context.unexpected_results.join("; "),
        });
    }
    let positive: Vec<&str> = context.positive_feedback().map(|f| f.source.as_str()).collect();
    if !positive.is_empty() {
        found.push(Opportunity {
            kind: OpportunityKind::ExternalValidation,
            evidence: format!("positive feedback from {}", positive.join(", ")),
        });
    }
    if context.viral_potential {
        found.push(Opportunity {
            kind: OpportunityKind::ViralPotential,
            evidence: if context.social_reactions.is_empty() {
                "flagged as shareable".to_string()
            } else {
                context.social_reactions.join("; ")
            },
        });
    }

    found
}

/// Fixed decision table over co-occurring opportunity kinds.
pub fn recommend_path(opportunities: &[Opportunity]) -> RecommendedPath {
    if opportunities.is_empty() {
        return RecommendedPath::ContinuePlannedPath;
    }
    let has = |kind| opportunities.iter().any(|o| o.kind == kind);
    let talent = has(OpportunityKind::NaturalTalent);
    let serendipity = has(OpportunityKind::SerendipitousDiscovery);
    let external = has(OpportunityKind::ExternalValidation);
    let viral = has(OpportunityKind::ViralPotential);

    if viral && external {
        RecommendedPath::AcceleratedProfessionalPath
    } else if talent && serendipity {
        RecommendedPath::ExplorationAmplificationPath
    } else if external && !talent && !serendipity && !viral {
        RecommendedPath::NetworkingFocusPath
    } else {
        RecommendedPath::BreakthroughDeepeningPath
    }
}

pub fn analyze(context: Option<&OpportunityContext>) -> OpportunityAnalysis {
    let Some(context) = context else {
        return OpportunityAnalysis::none();
    };
    let opportunities = detect(context);
    let recommended_path = recommend_path(&opportunities);
    OpportunityAnalysis {
        opportunities,
        recommended_path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feedback(sentiment: Sentiment) -> ExternalFeedback {
        ExternalFeedback {
            source: "mentor".into(),
            content: "nice".into(),
            sentiment,
        }
    }

    #[test]
    fn default_context_is_not_meaningful() {
        assert!(!OpportunityContext::default().is_meaningful());
        assert!(OpportunityContext::default().into_meaningful().is_none());
    }

    #[test]
    fn any_signal_is_meaningful() {
        let ctx = OpportunityContext {
            engagement_level: 6,
            ..Default::default()
        };
        assert!(ctx.is_meaningful());
        let ctx = OpportunityContext {
            social_reactions: vec!["12 likes".into()],
            ..Default::default()
        };
        assert!(ctx.is_meaningful());
    }

    #[test]
    fn high_engagement_is_talent() {
        let ctx = OpportunityContext {
            engagement_level: 9,
            ..Default::default()
        };
        let analysis = analyze(Some(&ctx));
        assert!(analysis.has(OpportunityKind::NaturalTalent));
        assert_eq!(analysis.opportunities.len(), 1);
        assert_eq!(analysis.recommended_path, RecommendedPath::BreakthroughDeepeningPath);
    }

    #[test]
    fn viral_plus_external_accelerates() {
        let ctx = OpportunityContext {
            viral_potential: true,
            external_feedback: vec![feedback(Sentiment::Positive)],
            ..Default::default()
        };
        assert_eq!(analyze(Some(&ctx)).recommended_path, RecommendedPath::AcceleratedProfessionalPath);
    }

    #[test]
    fn talent_plus_serendipity_explores() {
        let ctx = OpportunityContext {
            engagement_level: 8,
            unexpected_results: vec!["found a shortcut".into()],
            ..Default::default()
        };
        assert_eq!(analyze(Some(&ctx)).recommended_path, RecommendedPath::ExplorationAmplificationPath);
    }

    #[test]
    fn external_alone_is_networking() {
        let ctx = OpportunityContext {
            external_feedback: vec![feedback(Sentiment::Positive)],
            ..Default::default()
        };
        assert_eq!(analyze(Some(&ctx)).recommended_path, RecommendedPath::NetworkingFocusPath);
    }

    #[test]
    fn negative_feedback_is_not_validation() {
        let ctx = OpportunityContext {
            external_feedback: vec![feedback(Sentiment::Negative)],
            ..Default::default()
        };
        let analysis = analyze(Some(&ctx));
        assert!(analysis.opportunities.is_empty());
        assert_eq!(analysis.recommended_path, RecommendedPath::ContinuePlannedPath);
    }

    #[test]
    fn absent_context_continues_plan() {
        assert_eq!(analyze(None), OpportunityAnalysis::none());
    }

    #[test]
    fn context_deserializes_with_defaults() {
        let ctx: OpportunityContext = serde_json::from_str(r#"{"viral_potential": true}"#).unwrap();
        assert_eq!(ctx.engagement_level, DEFAULT_ENGAGEMENT);
        assert!(ctx.viral_potential);
    }
}
