//! Request-scoped operations over one project path.
//!
//! Every public operation is a load → compute → save cycle against the
//! documents of the [`Session`]'s path, and mutating ones run under that
//! path's lock. Failures are logged with the operation name and its input
//! before being returned. Nothing is retried, and steps already saved are
//! not rolled back when a later step fails.

use chrono::{Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::completion::{BlockOutcome, CompletionProcessor, GraphUpdate, NextAction};
use crate::error::{CoreError, Result, ValidationError};
use crate::evolution::{EvolutionEngine, EvolutionResult};
use crate::graph::{
    FrontierNode, PrerequisiteMatching, ReadinessResolver, TaskGraph, TreeBuilder, TreeSpec, GRAPH_KEY,
};
use crate::history::{HistoryDelta, LearningHistory, HISTORY_KEY};
use crate::intelligence::GeneratorChain;
use crate::opportunity::OpportunityAnalysis;
use crate::pacing::{self, ReasoningReport};
use crate::parse;
use crate::project::{ProjectConfig, Urgency, PROJECT_CONFIG_KEY};
use crate::schedule::{schedule_key, BlockType, DaySchedule, TimeBlock};
use crate::scheduler::{DayPacker, DayPlan, PackerConfig};
use crate::selector::{ScoreBreakdown, SelectionRequest, TaskSelector};
use crate::session::{PathLocks, Session};
use crate::status::StatusReport;
use crate::storage::{Config, DocumentStore, Documents};

/// Fallback day bounds when neither project nor config times parse.
const DEFAULT_WAKE: u32 = 7 * 60;
const DEFAULT_SLEEP: u32 = 22 * 60;

/// Ready tasks listed in tree-building summaries.
const SUMMARY_TASKS: usize = 3;

/// Structured result plus a human-readable summary.
#[derive(Debug, Clone, Serialize)]
pub struct Outcome<T> {
    pub data: T,
    pub summary: String,
}

impl<T> Outcome<T> {
    fn new(data: T, summary: impl Into<String>) -> Self {
        Self {
            data,
            summary: summary.into(),
        }
    }
}

/// Input for [`Orchestrator::init_project`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectInit {
    pub id: String,
    pub goal: String,
    #[serde(default)]
    pub urgency: Urgency,
    #[serde(default)]
    pub paths: Vec<String>,
    /// Defaults to the configured wake time.
    #[serde(default)]
    pub wake_time: Option<String>,
    #[serde(default)]
    pub sleep_time: Option<String>,
    #[serde(default)]
    pub meal_times: Option<Vec<String>>,
}

/// Input for [`Orchestrator::get_next_task`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NextTaskRequest {
    #[serde(default)]
    pub context: Option<String>,
    pub energy: u8,
    /// Free text such as "45 minutes".
    pub time_available: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NextTask {
    pub task: Option<FrontierNode>,
    pub score: Option<ScoreBreakdown>,
    pub available_minutes: u32,
    pub ready_count: usize,
}

/// Input for [`Orchestrator::generate_daily_schedule`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleRequest {
    pub date: NaiveDate,
    pub energy: u8,
    /// Hours (0-23) learning may start in; empty allows any.
    #[serde(default)]
    pub hours: Vec<u32>,
    #[serde(default)]
    pub focus_type: Option<String>,
    #[serde(default)]
    pub context: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompletionReport {
    pub block: TimeBlock,
    pub history: HistoryDelta,
    /// `None` when the block had no learning content or the path has no graph.
    pub graph: Option<GraphUpdate>,
    pub opportunities: OpportunityAnalysis,
    pub next: NextAction,
}

pub struct Orchestrator {
    docs: Documents,
    config: Config,
    generator: GeneratorChain,
    locks: PathLocks,
}

impl Orchestrator {
    /// Orchestrator over `store`, with the generator chain from `config`.
    pub fn new(store: Box<dyn DocumentStore>, config: Config) -> Self {
        let generator = GeneratorChain::from_config(&config.intelligence);
        Self {
            docs: Documents::new(store),
            config,
            generator,
            locks: PathLocks::new(),
        }
    }

    pub fn with_generator(mut self, generator: GeneratorChain) -> Self {
        self.generator = generator;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn documents(&self) -> &Documents {
        &self.docs
    }

    /// Create or replace a project's config document.
    pub fn init_project(&self, init: ProjectInit) -> Result<Outcome<ProjectConfig>> {
        let context = json!({ "project": init.id, "goal": init.goal, "paths": init.paths });
        self.run("init_project", &context, || {
            let session = Session::general(init.id.clone());
            self.locks.with(&session, || self.init_project_inner(&session, &init))
        })
    }

    /// Build and persist a fresh task tree for the session's path.
    pub fn build_tree(&self, session: &Session, style: &str, focus_areas: &[String]) -> Result<Outcome<TaskGraph>> {
        let context = json!({ "session": session, "style": style, "focus_areas": focus_areas });
        self.run("build_tree", &context, || {
            self.locks.with(session, || self.build_tree_inner(session, style, focus_areas))
        })
    }

    pub fn get_status(&self, session: &Session) -> Result<Outcome<StatusReport>> {
        let context = json!({ "session": session });
        self.run("get_status", &context, || self.get_status_inner(session, Local::now().date_naive()))
    }

    pub fn get_next_task(&self, session: &Session, request: &NextTaskRequest) -> Result<Outcome<NextTask>> {
        let context = json!({ "session": session, "request": request });
        self.run("get_next_task", &context, || self.get_next_task_inner(session, request))
    }

    /// Finish a block of the schedule for `date`.
    pub fn complete_block(
        &self,
        session: &Session,
        date: NaiveDate,
        block_id: &str,
        outcome: &BlockOutcome,
    ) -> Result<Outcome<CompletionReport>> {
        let context = json!({ "session": session, "date": date, "block_id": block_id, "outcome": outcome });
        self.run("complete_block", &context, || {
            self.locks
                .with(session, || self.complete_block_inner(session, date, block_id, outcome))
        })
    }

    pub fn evolve_strategy(&self, session: &Session, feedback: Option<&str>) -> Result<Outcome<EvolutionResult>> {
        let context = json!({ "session": session, "feedback": feedback });
        self.run("evolve_strategy", &context, || {
            self.locks.with(session, || self.evolve_strategy_inner(session, feedback))
        })
    }

    pub fn generate_daily_schedule(&self, session: &Session, request: &ScheduleRequest) -> Result<Outcome<DaySchedule>> {
        let context = json!({ "session": session, "request": request });
        self.run("generate_daily_schedule", &context, || {
            self.locks.with(session, || self.generate_daily_schedule_inner(session, request))
        })
    }

    /// Load a stored schedule without changing it.
    pub fn get_schedule(&self, session: &Session, date: NaiveDate) -> Result<Outcome<DaySchedule>> {
        let context = json!({ "session": session, "date": date });
        self.run("get_schedule", &context, || {
            self.project(session)?;
            let schedule = self.schedule(session, date)?;
            let summary = render_schedule(&schedule);
            Ok(Outcome::new(schedule, summary))
        })
    }

    pub fn analyze_reasoning(&self, session: &Session, detailed: bool) -> Result<Outcome<ReasoningReport>> {
        let context = json!({ "session": session, "detailed": detailed });
        self.run("analyze_reasoning", &context, || {
            let project = self.project(session)?;
            let graph = self.graph(session)?;
            let history = self.history(session)?;
            let report = pacing::analyze(&project, &graph, &history, Utc::now(), detailed);
            let summary = report.summary();
            Ok(Outcome::new(report, summary))
        })
    }

    fn run<T>(&self, operation: &str, context: &Value, f: impl FnOnce() -> Result<T>) -> Result<T> {
        f().or_else(|error| self.fail(operation, error, context))
    }

    fn fail<T>(&self, operation: &str, error: CoreError, context: &Value) -> Result<T> {
        tracing::error!(operation, error = %error, context = %context, "operation failed");
        self.docs.log_error(operation, &error.to_string(), context);
        Err(error)
    }

    fn matching(&self) -> PrerequisiteMatching {
        PrerequisiteMatching::from_title_fallback(self.config.graph.title_prerequisite_fallback)
    }

    fn resolver(&self) -> ReadinessResolver {
        ReadinessResolver::new(self.matching())
    }

    /// The session's project config, checking the path belongs to it.
    fn project(&self, session: &Session) -> Result<ProjectConfig> {
        let id = session.require_project()?;
        let project: ProjectConfig = self
            .docs
            .load_project(id, PROJECT_CONFIG_KEY)?
            .ok_or_else(|| CoreError::ConfigurationMissing(format!("project '{id}' has no config document")))?;
        if !project.has_path(&session.path) {
            return Err(CoreError::not_found("path", session.path.clone()));
        }
        Ok(project)
    }

    fn graph(&self, session: &Session) -> Result<TaskGraph> {
        self.docs
            .load_path(&session.project_id, &session.path, GRAPH_KEY)?
            .ok_or_else(|| CoreError::not_found("task graph", session.path.clone()))
    }

    fn history(&self, session: &Session) -> Result<LearningHistory> {
        Ok(self
            .docs
            .load_path(&session.project_id, &session.path, HISTORY_KEY)?
            .unwrap_or_else(|| LearningHistory::new(session.project_id.clone(), session.path.clone())))
    }

    fn schedule(&self, session: &Session, date: NaiveDate) -> Result<DaySchedule> {
        let key = schedule_key(date);
        self.docs
            .load_path(&session.project_id, &session.path, &key)?
            .ok_or_else(|| CoreError::not_found("schedule", key))
    }

    fn init_project_inner(&self, session: &Session, init: &ProjectInit) -> Result<Outcome<ProjectConfig>> {
        let id = session.require_project()?;
        if init.goal.trim().is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "goal".into(),
                message: "goal must not be empty".into(),
            }
            .into());
        }
        let defaults = &self.config.schedule;
        let wake = init.wake_time.clone().unwrap_or_else(|| defaults.wake_time.clone());
        let sleep = init.sleep_time.clone().unwrap_or_else(|| defaults.sleep_time.clone());
        let meals = init.meal_times.clone().unwrap_or_else(|| defaults.meal_times.clone());
        for (field, value) in [("wake_time", &wake), ("sleep_time", &sleep)]
            .into_iter()
            .chain(meals.iter().map(|m| ("meal_times", m)))
        {
            if parse::parse_clock(value).is_none() {
                return Err(ValidationError::InvalidValue {
                    field: field.into(),
                    message: format!("'{value}' is not a time like 7:00 AM"),
                }
                .into());
            }
        }

        let mut paths: Vec<String> = Vec::new();
        for path in init.paths.iter().map(|p| p.trim()).filter(|p| !p.is_empty()) {
            if !paths.iter().any(|p| p == path) {
                paths.push(path.to_string());
            }
        }

        let project = ProjectConfig::new(id, init.goal.trim())
            .with_urgency(init.urgency)
            .with_paths(paths)
            .with_day(wake, sleep, meals);
        self.docs.save_project(id, PROJECT_CONFIG_KEY, &project)?;
        tracing::info!(project = id, urgency = %project.urgency, "project initialised");

        let summary = format!(
            "Project '{}' ready: {} ({} urgency). Day runs {} to {}.",
            project.id, project.goal, project.urgency, project.wake_time, project.sleep_time
        );
        Ok(Outcome::new(project, summary))
    }

    fn build_tree_inner(&self, session: &Session, style: &str, focus_areas: &[String]) -> Result<Outcome<TaskGraph>> {
        let project = self.project(session)?;
        let built = TreeBuilder::new(&self.generator, self.config.priorities).build(
            &project.id,
            &TreeSpec {
                goal: &project.goal,
                path: &session.path,
                style,
                focus_areas,
            },
        );
        let graph = built.graph;
        self.docs.save_path(&project.id, &session.path, GRAPH_KEY, &graph)?;

        let existing: Option<LearningHistory> = self.docs.load_path(&project.id, &session.path, HISTORY_KEY)?;
        if existing.is_none() {
            let history = LearningHistory::new(project.id.clone(), session.path.clone());
            self.docs.save_path(&project.id, &session.path, HISTORY_KEY, &history)?;
        }

        let ready: Vec<&str> = self
            .resolver()
            .ready_nodes(&graph.nodes)
            .iter()
            .take(SUMMARY_TASKS)
            .map(|n| n.title.as_str())
            .collect();
        let mut summary = format!(
            "Built {} branches with {} tasks for path '{}'.",
            graph.branches.len(),
            graph.nodes.len(),
            session.path
        );
        if !ready.is_empty() {
            summary.push_str(&format!(" Start with: {}.", ready.join(", ")));
        }
        if built.used_fallback {
            summary.push_str(" Some content came from the built-in templates.");
        }
        Ok(Outcome::new(graph, summary))
    }

    fn get_status_inner(&self, session: &Session, today: NaiveDate) -> Result<Outcome<StatusReport>> {
        self.project(session)?;
        let graph = self.graph(session)?;
        let schedule: Option<DaySchedule> =
            self.docs
                .load_path(&session.project_id, &session.path, &schedule_key(today))?;
        let report = StatusReport::build(&graph, self.resolver(), schedule.as_ref());
        let summary = report.summary();
        Ok(Outcome::new(report, summary))
    }

    fn get_next_task_inner(&self, session: &Session, request: &NextTaskRequest) -> Result<Outcome<NextTask>> {
        check_energy(request.energy)?;
        self.project(session)?;
        let graph = self.graph(session)?;
        let ready = self.resolver().ready_nodes(&graph.nodes);
        let selection = SelectionRequest::from_input(
            request.energy,
            &request.time_available,
            request.context.as_deref(),
            &self.config.scoring,
        );
        let picked = TaskSelector::new(self.config.scoring).select(&ready, &selection);

        let summary = match &picked {
            Some(scored) => {
                let s = scored.score;
                format!(
                    "Next: {} ({}, difficulty {}, {})\nScore {} = priority {} + energy {} + time {} + context {} + breakthrough {} + generated {}",
                    scored.node.title,
                    scored.node.branch,
                    scored.node.difficulty,
                    scored.node.duration,
                    s.total,
                    s.priority,
                    s.energy,
                    s.time,
                    s.context,
                    s.breakthrough,
                    s.generated
                )
            }
            None => "No tasks are ready. Run strategy evolution to grow the frontier.".to_string(),
        };

        let data = NextTask {
            task: picked.as_ref().map(|s| s.node.clone()),
            score: picked.as_ref().map(|s| s.score),
            available_minutes: selection.available_minutes,
            ready_count: ready.len(),
        };
        Ok(Outcome::new(data, summary))
    }

    fn complete_block_inner(
        &self,
        session: &Session,
        date: NaiveDate,
        block_id: &str,
        outcome: &BlockOutcome,
    ) -> Result<Outcome<CompletionReport>> {
        self.project(session)?;
        let project_id = session.project_id.as_str();
        let path = session.path.as_str();
        let mut schedule = self.schedule(session, date)?;
        let now = Utc::now();
        let processor = CompletionProcessor::new(self.config.priorities);

        let block = processor.complete_block(&mut schedule, block_id, outcome, now)?;
        self.docs.save_path(project_id, path, &schedule.key(), &schedule)?;

        let mut history = self.history(session).map_err(|e| partial_write(block_id, "history", e))?;
        let delta = processor.record_history(&mut history, &schedule, &block, now);
        self.docs
            .save_path(project_id, path, HISTORY_KEY, &history)
            .map_err(|e| partial_write(block_id, "history", e))?;

        let graph_update = if block.has_learning_content() {
            let graph: Option<TaskGraph> = self
                .docs
                .load_path(project_id, path, GRAPH_KEY)
                .map_err(|e| partial_write(block_id, "graph", e))?;
            match graph {
                Some(mut graph) => {
                    let update = processor.update_graph(&mut graph, &block, outcome.actual_minutes, now);
                    self.docs
                        .save_path(project_id, path, GRAPH_KEY, &graph)
                        .map_err(|e| partial_write(block_id, "graph", e))?;
                    Some(update)
                }
                None => {
                    tracing::warn!(project = project_id, path, block = block_id, "no task graph, frontier not updated");
                    None
                }
            }
        } else {
            None
        };

        let opportunities = processor.analyze_opportunities(&block);
        let next = NextAction::after(&schedule, block_id);
        let summary = completion_summary(&block, &delta, graph_update.as_ref(), &opportunities, &next);

        Ok(Outcome::new(
            CompletionReport {
                block,
                history: delta,
                graph: graph_update,
                opportunities,
                next,
            },
            summary,
        ))
    }

    fn evolve_strategy_inner(&self, session: &Session, feedback: Option<&str>) -> Result<Outcome<EvolutionResult>> {
        let project = self.project(session)?;
        let mut graph = self.graph(session)?;
        let history = self.history(session)?;
        let feedback = feedback.map(str::trim).filter(|f| !f.is_empty());

        let result = EvolutionEngine::new(&self.generator, self.matching(), self.config.priorities).evolve(
            &project.goal,
            &mut graph,
            &history,
            feedback,
            Utc::now(),
        );
        self.docs.save_path(&project.id, &session.path, GRAPH_KEY, &graph)?;

        let summary = result.report.clone();
        Ok(Outcome::new(result, summary))
    }

    fn generate_daily_schedule_inner(&self, session: &Session, request: &ScheduleRequest) -> Result<Outcome<DaySchedule>> {
        check_energy(request.energy)?;
        if let Some(&hour) = request.hours.iter().find(|&&h| h > 23) {
            return Err(ValidationError::OutOfRange {
                field: "hours".into(),
                value: hour as i64,
                min: 0,
                max: 23,
            }
            .into());
        }
        let project = self.project(session)?;
        let graph: Option<TaskGraph> = self.docs.load_path(&project.id, &session.path, GRAPH_KEY)?;
        if graph.is_none() {
            tracing::warn!(project = %project.id, path = %session.path, "no task graph, scheduling without learning tasks");
        }

        let defaults = &self.config.schedule;
        let wake = parse::clock_or(&project.wake_time, parse::clock_or(&defaults.wake_time, DEFAULT_WAKE));
        let sleep = parse::clock_or(&project.sleep_time, parse::clock_or(&defaults.sleep_time, DEFAULT_SLEEP));
        let meal_times = if project.meal_times.is_empty() {
            &defaults.meal_times
        } else {
            &project.meal_times
        };
        let meals: Vec<u32> = meal_times.iter().filter_map(|m| parse::parse_clock(m)).collect();
        let focus_type = request
            .focus_type
            .clone()
            .filter(|f| !f.trim().is_empty())
            .unwrap_or_else(|| defaults.focus_type.clone());

        let mut tasks = graph
            .as_ref()
            .map(|g| self.resolver().ready_nodes(&g.nodes))
            .unwrap_or_default();
        tasks.sort_by_key(|n| std::cmp::Reverse(n.priority));

        let blocks = DayPacker::new(PackerConfig::from(defaults)).pack(&DayPlan {
            wake,
            sleep,
            meals,
            priority_hours: request.hours.clone(),
            tasks,
            energy: request.energy,
            focus_type: &focus_type,
        });

        let schedule = DaySchedule {
            project_id: project.id.clone(),
            path: session.path.clone(),
            date: request.date,
            energy_level: request.energy,
            focus_type,
            context: request.context.clone(),
            priority_hours: request.hours.clone(),
            blocks,
            generated_at: Utc::now(),
        };
        self.docs.save_path(&project.id, &session.path, &schedule.key(), &schedule)?;
        tracing::info!(
            project = %project.id,
            path = %session.path,
            date = %request.date,
            blocks = schedule.blocks.len(),
            "daily schedule generated"
        );

        let summary = render_schedule(&schedule);
        Ok(Outcome::new(schedule, summary))
    }
}

fn check_energy(energy: u8) -> Result<()> {
    if (1..=5).contains(&energy) {
        return Ok(());
    }
    Err(ValidationError::OutOfRange {
        field: "energy".into(),
        value: energy as i64,
        min: 1,
        max: 5,
    }
    .into())
}

/// Log that an earlier step of a completion already persisted.
fn partial_write(block_id: &str, step: &str, error: CoreError) -> CoreError {
    tracing::warn!(block = block_id, step, error = %error, "partial write: block saved as completed but a later step failed");
    error
}

fn completion_summary(
    block: &TimeBlock,
    delta: &HistoryDelta,
    graph: Option<&GraphUpdate>,
    opportunities: &OpportunityAnalysis,
    next: &NextAction,
) -> String {
    let mut lines = vec![format!("Completed '{}'.", block.title)];
    if delta.insights > 0 || delta.knowledge_gaps > 0 {
        lines.push(format!(
            "Recorded {} insight(s) and {} open question(s).",
            delta.insights, delta.knowledge_gaps
        ));
    }
    if let Some(update) = graph.filter(|u| u.added() > 0) {
        lines.push(format!(
            "Added {} follow-up and {} opportunity task(s).",
            update.follow_ups.len(),
            update.opportunity_nodes.len()
        ));
    }
    if !opportunities.opportunities.is_empty() {
        let kinds: Vec<String> = opportunities.opportunities.iter().map(|o| o.kind.to_string()).collect();
        lines.push(format!(
            "Opportunities: {}. Recommended: {}.",
            kinds.join(", "),
            opportunities.recommended_path
        ));
    }
    lines.push(next.describe());
    lines.join("\n")
}

fn render_schedule(schedule: &DaySchedule) -> String {
    let learning = schedule.learning_blocks().count();
    let mut lines = vec![format!(
        "Schedule for {} ({} blocks, {} learning, {} learning minutes, energy {}, focus {}):",
        schedule.date,
        schedule.blocks.len(),
        learning,
        schedule.learning_minutes(),
        schedule.energy_level,
        schedule.focus_type
    )];
    for block in &schedule.blocks {
        let mark = if block.completed { "x" } else { " " };
        lines.push(format!(
            "  [{mark}] {:>8}  {:<3} {:>3}m  {:<8}  {}",
            block.start_time, block.id, block.duration_minutes, block.block_type, block.title
        ));
    }
    lines.join("\n")
}
