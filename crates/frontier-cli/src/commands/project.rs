//! Project setup and selection.

use clap::Subcommand;
use frontier_core::project::PROJECT_CONFIG_KEY;
use frontier_core::{Config, CoreError, ProjectConfig, ProjectInit, Urgency};

use super::{CliResult, Context};

#[derive(Subcommand)]
pub enum ProjectAction {
    /// Create (or replace) a project and make it active
    Init {
        /// Project identifier
        id: String,
        /// What the project is working towards
        #[arg(long)]
        goal: String,
        /// low, medium, high or critical
        #[arg(long, default_value = "medium")]
        urgency: Urgency,
        /// Learning path (repeatable)
        #[arg(long = "learning-path")]
        paths: Vec<String>,
        /// Wake time, e.g. "7:00 AM"
        #[arg(long)]
        wake: Option<String>,
        /// Sleep time, e.g. "10:00 PM"
        #[arg(long)]
        sleep: Option<String>,
        /// Meal time (repeatable)
        #[arg(long)]
        meal: Vec<String>,
    },
    /// Select the active project (and path, with the global --path)
    Use { id: String },
    /// Print the active project's configuration
    Show,
}

pub fn run(action: ProjectAction, ctx: &Context) -> CliResult {
    match action {
        ProjectAction::Init {
            id,
            goal,
            urgency,
            paths,
            wake,
            sleep,
            meal,
        } => {
            let orch = ctx.orchestrator()?;
            let init = ProjectInit {
                id: id.clone(),
                goal,
                urgency,
                paths,
                wake_time: wake,
                sleep_time: sleep,
                meal_times: (!meal.is_empty()).then_some(meal),
            };
            let outcome = orch.init_project(init)?;
            activate(orch.config().clone(), &id, None)?;
            ctx.print(&outcome)?;
        }
        ProjectAction::Use { id } => {
            let path = ctx.path.clone();
            let orch = ctx.orchestrator()?;
            let project: Option<ProjectConfig> = orch.documents().load_project(&id, PROJECT_CONFIG_KEY)?;
            let project = project.ok_or_else(|| CoreError::not_found("project", id.as_str()))?;
            if let Some(path) = path.as_deref() {
                if !project.has_path(path) {
                    return Err(CoreError::not_found("path", path).into());
                }
            }
            activate(orch.config().clone(), &id, path.as_deref())?;
            println!("active project: {id}");
        }
        ProjectAction::Show => {
            let orch = ctx.orchestrator()?;
            let session = ctx.session(orch.config());
            let id = session.require_project()?;
            let project: Option<ProjectConfig> = orch.documents().load_project(id, PROJECT_CONFIG_KEY)?;
            let project = project.ok_or_else(|| CoreError::ConfigurationMissing(format!("project '{id}'")))?;
            if ctx.json {
                println!("{}", serde_json::to_string_pretty(&project)?);
            } else {
                println!("{} ({} urgency)", project.id, project.urgency);
                println!("goal: {}", project.goal);
                if !project.learning_paths.is_empty() {
                    println!("paths: {}", project.learning_paths.join(", "));
                }
                println!("day: {} - {}", project.wake_time, project.sleep_time);
                if !project.meal_times.is_empty() {
                    println!("meals: {}", project.meal_times.join(", "));
                }
            }
        }
    }
    Ok(())
}

fn activate(mut config: Config, project: &str, path: Option<&str>) -> CliResult {
    config.session.active_project = Some(project.to_string());
    config.session.active_path = path.map(String::from);
    config.save()?;
    Ok(())
}
