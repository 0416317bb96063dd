//! Daily schedule commands.

use chrono::{Local, NaiveDate};
use clap::Subcommand;
use frontier_core::ScheduleRequest;

use super::{CliResult, Context};

#[derive(Subcommand)]
pub enum ScheduleAction {
    /// Pack a schedule for a day and store it
    Generate {
        /// Day to plan (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Expected energy, 1 to 5
        #[arg(long, default_value_t = 3)]
        energy: u8,
        /// Hours learning may start in, e.g. "9,10,14"
        #[arg(long, value_delimiter = ',')]
        hours: Vec<u32>,
        /// Focus type, e.g. "deep"
        #[arg(long)]
        focus: Option<String>,
        #[arg(long)]
        context: Option<String>,
    },
    /// Print a stored schedule
    Show {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

pub fn run(action: ScheduleAction, ctx: &Context) -> CliResult {
    let orch = ctx.orchestrator()?;
    let session = ctx.session(orch.config());
    let today = || Local::now().date_naive();

    match action {
        ScheduleAction::Generate {
            date,
            energy,
            hours,
            focus,
            context,
        } => {
            let request = ScheduleRequest {
                date: date.unwrap_or_else(today),
                energy,
                hours,
                focus_type: focus,
                context,
            };
            ctx.print(&orch.generate_daily_schedule(&session, &request)?)
        }
        ScheduleAction::Show { date } => ctx.print(&orch.get_schedule(&session, date.unwrap_or_else(today))?),
    }
}
