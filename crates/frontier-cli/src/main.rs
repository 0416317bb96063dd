use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::Context;

#[derive(Parser)]
#[command(name = "frontier", version, about = "Frontier learning-plan CLI")]
struct Cli {
    /// Project to operate on (defaults to the active project)
    #[arg(long, global = true)]
    project: Option<String>,
    /// Learning path (defaults to the active path, then "general")
    #[arg(long, global = true)]
    path: Option<String>,
    /// Print the structured result as JSON
    #[arg(long, global = true)]
    json: bool,
    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Project setup and selection
    Project {
        #[command(subcommand)]
        action: commands::project::ProjectAction,
    },
    /// Task tree building, status and evolution
    Tree {
        #[command(subcommand)]
        action: commands::tree::TreeAction,
    },
    /// Pick the best next task
    Next(commands::task::NextArgs),
    /// Complete a scheduled block
    Complete(commands::task::CompleteArgs),
    /// Daily schedule management
    Schedule {
        #[command(subcommand)]
        action: commands::schedule::ScheduleAction,
    },
    /// Pacing and learning-trend analysis
    Reasoning {
        /// Include skill levels, open questions and recent insights
        #[arg(long)]
        detailed: bool,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("FRONTIER_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let ctx = Context {
        project: cli.project,
        path: cli.path,
        json: cli.json,
    };
    let result = match cli.command {
        Commands::Project { action } => commands::project::run(action, &ctx),
        Commands::Tree { action } => commands::tree::run(action, &ctx),
        Commands::Next(args) => commands::task::next(args, &ctx),
        Commands::Complete(args) => commands::task::complete(args, &ctx),
        Commands::Schedule { action } => commands::schedule::run(action, &ctx),
        Commands::Reasoning { detailed } => commands::reasoning::run(detailed, &ctx),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
