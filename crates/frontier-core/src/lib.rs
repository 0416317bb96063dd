//! # Frontier Core Library
//!
//! This library provides the core logic for Frontier, a learning-plan
//! orchestrator. It follows a CLI-first philosophy: every operation is a
//! plain function of the [`Orchestrator`], and the `frontier` binary is a
//! thin layer over the same library.
//!
//! ## Architecture
//!
//! - **Task graph**: strategic branches and frontier nodes per learning path,
//!   with prerequisite resolution
//! - **Selection**: multi-factor scoring of ready nodes against energy, time
//!   and context
//! - **Day packing**: gap-free daily schedules of meals, learning, breaks and
//!   habit filler
//! - **Completion and evolution**: feeding outcomes back into history and the
//!   graph, and growing the frontier when progress stalls
//! - **Storage**: a JSON document contract with SQLite and in-memory backends
//!   and TOML configuration
//!
//! ## Key Components
//!
//! - [`Orchestrator`]: the exposed operations, one load/compute/save cycle each
//! - [`TaskGraph`]: branches and nodes for one path
//! - [`TaskSelector`]: next-task scoring
//! - [`DayPacker`]: daily schedule layout
//! - [`GeneratorChain`]: remote content with deterministic fallback
//! - [`DocumentStore`]: the storage contract

pub mod completion;
pub mod error;
pub mod evolution;
pub mod graph;
pub mod history;
pub mod intelligence;
pub mod opportunity;
pub mod orchestrator;
pub mod pacing;
pub mod parse;
pub mod project;
pub mod schedule;
pub mod scheduler;
pub mod selector;
pub mod session;
pub mod status;
pub mod storage;

pub use completion::{BlockOutcome, CompletionProcessor, NextAction};
pub use error::{ConfigError, CoreError, ProviderError, StorageError, ValidationError};
pub use evolution::{EvolutionEngine, EvolutionResult, EvolutionStrategy};
pub use graph::{FrontierNode, PrerequisiteMatching, ReadinessResolver, StrategicBranch, TaskGraph};
pub use history::LearningHistory;
pub use intelligence::{GeneratorChain, HttpProvider, IntelligenceProvider, RequestType};
pub use opportunity::{OpportunityContext, Sentiment};
pub use orchestrator::{
    CompletionReport, NextTask, NextTaskRequest, Orchestrator, Outcome, ProjectInit, ScheduleRequest,
};
pub use pacing::ReasoningReport;
pub use project::{ProjectConfig, Urgency};
pub use schedule::{BlockType, DaySchedule, TimeBlock};
pub use scheduler::DayPacker;
pub use selector::{ScoringWeights, TaskSelector};
pub use session::Session;
pub use status::StatusReport;
pub use storage::{Config, DocumentStore, Documents, MemoryStore, Scope, SqliteStore};
