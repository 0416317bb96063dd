//! Pacing and learning-trend analysis.

use super::{CliResult, Context};

pub fn run(detailed: bool, ctx: &Context) -> CliResult {
    let orch = ctx.orchestrator()?;
    let session = ctx.session(orch.config());
    ctx.print(&orch.analyze_reasoning(&session, detailed)?)
}
