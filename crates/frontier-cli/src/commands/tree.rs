//! Task tree commands.

use clap::Subcommand;

use super::{split_list, CliResult, Context};

#[derive(Subcommand)]
pub enum TreeAction {
    /// Build a fresh task tree for the active path
    Build {
        /// Learning style hint, e.g. "hands-on"
        #[arg(long, default_value = "balanced")]
        style: String,
        /// Comma-separated focus areas
        #[arg(long)]
        focus: Option<String>,
    },
    /// Progress, readiness and today's schedule
    Status,
    /// Grow the frontier from history and optional feedback
    Evolve {
        #[arg(long)]
        feedback: Option<String>,
    },
}

pub fn run(action: TreeAction, ctx: &Context) -> CliResult {
    let orch = ctx.orchestrator()?;
    let session = ctx.session(orch.config());

    match action {
        TreeAction::Build { style, focus } => {
            let focus_areas = split_list(focus);
            ctx.print(&orch.build_tree(&session, &style, &focus_areas)?)
        }
        TreeAction::Status => ctx.print(&orch.get_status(&session)?),
        TreeAction::Evolve { feedback } => ctx.print(&orch.evolve_strategy(&session, feedback.as_deref())?),
    }
}
