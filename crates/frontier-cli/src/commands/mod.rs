//! Subcommand handlers.
//!
//! Each handler opens the store, runs one orchestrator operation and prints
//! either the human summary or, with `--json`, the structured result.

pub mod config;
pub mod project;
pub mod reasoning;
pub mod schedule;
pub mod task;
pub mod tree;

use frontier_core::storage::GENERAL_PATH;
use frontier_core::{Config, Orchestrator, Outcome, Session, SqliteStore};
use serde::Serialize;

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Global flags shared by every subcommand.
pub struct Context {
    pub project: Option<String>,
    pub path: Option<String>,
    pub json: bool,
}

impl Context {
    pub fn orchestrator(&self) -> Result<Orchestrator, Box<dyn std::error::Error>> {
        let config = Config::load()?;
        let store = SqliteStore::open()?;
        Ok(Orchestrator::new(Box::new(store), config))
    }

    /// Flags first, then the active selection saved in the config.
    ///
    /// An unresolved project stays empty so the core reports it as missing.
    pub fn session(&self, config: &Config) -> Session {
        let project = self
            .project
            .clone()
            .or_else(|| config.session.active_project.clone())
            .unwrap_or_default();
        let path = self
            .path
            .clone()
            .or_else(|| config.session.active_path.clone())
            .unwrap_or_else(|| GENERAL_PATH.to_string());
        tracing::debug!(%project, %path, "resolved session");
        Session::new(project, path)
    }

    pub fn print<T: Serialize>(&self, outcome: &Outcome<T>) -> CliResult {
        if self.json {
            println!("{}", serde_json::to_string_pretty(&outcome.data)?);
        } else {
            println!("{}", outcome.summary);
        }
        Ok(())
    }
}

/// Split a comma-separated flag into trimmed, non-empty items.
pub fn split_list(value: Option<String>) -> Vec<String> {
    value
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}
