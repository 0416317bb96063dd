//! Document storage contract.
//!
//! The core reads and writes whole JSON documents addressed by a [`Scope`]
//! and a key. Backends implement [`DocumentStore`]; components go through
//! the typed [`Documents`] façade, which owns the two rules every reader
//! must agree on:
//!
//! - **Two-tier lookup**: the `general` path reads its path-scoped document
//!   first and falls back to the project-scoped one when absent. Writes
//!   always land in the path scope. No other path falls back.
//! - **Owner verification**: a loaded document whose embedded identifiers
//!   disagree with the requested ones is a [`CoreError::DataIntegrity`]
//!   failure, never a silent substitute.

mod config;
pub mod memory;
pub mod sqlite;

pub use config::{Config, GraphConfig, IntelligenceConfig, ScheduleConfig, SessionConfig};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::error::{CoreError, Result, StorageError};

/// Path that may fall back to project-level storage.
pub const GENERAL_PATH: &str = "general";

/// Returns `~/.config/frontier[-dev]/` based on FRONTIER_ENV.
///
/// FRONTIER_DATA_DIR overrides the location entirely.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> std::io::Result<PathBuf> {
    let dir = match std::env::var_os("FRONTIER_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("FRONTIER_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("frontier-dev")
            } else {
                base_dir.join("frontier")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Where a document lives.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "level", rename_all = "snake_case")]
pub enum Scope {
    Project { project: String },
    Path { project: String, path: String },
}

impl Scope {
    pub fn project(project: impl Into<String>) -> Self {
        Scope::Project {
            project: project.into(),
        }
    }

    pub fn path(project: impl Into<String>, path: impl Into<String>) -> Self {
        Scope::Path {
            project: project.into(),
            path: path.into(),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Project { project } => write!(f, "project:{project}"),
            Scope::Path { project, path } => write!(f, "path:{project}/{path}"),
        }
    }
}

/// Backend contract: untyped load/save plus an error sink.
pub trait DocumentStore: Send + Sync {
    /// Load a document, `None` if absent.
    fn load_document(&self, scope: &Scope, key: &str) -> Result<Option<serde_json::Value>>;

    /// Save a document. Returns `false` if the backend declined the write.
    fn save_document(&self, scope: &Scope, key: &str, body: &serde_json::Value) -> Result<bool>;

    /// Record a failed operation. Must not fail.
    fn log_error(&self, operation: &str, message: &str, context: &serde_json::Value);
}

/// The identifiers a caller expects a document to carry.
#[derive(Debug, Clone, Copy)]
pub struct DocumentId<'a> {
    pub project: &'a str,
    pub path: Option<&'a str>,
    pub key: &'a str,
}

impl<'a> DocumentId<'a> {
    pub fn project(project: &'a str, key: &'a str) -> Self {
        Self {
            project,
            path: None,
            key,
        }
    }

    pub fn path(project: &'a str, path: &'a str, key: &'a str) -> Self {
        Self {
            project,
            path: Some(path),
            key,
        }
    }

    fn describe(&self) -> String {
        match self.path {
            Some(path) => format!("{}/{} ({})", self.project, path, self.key),
            None => format!("{} ({})", self.project, self.key),
        }
    }
}

/// A typed document that embeds its owner.
pub trait Document: Serialize + DeserializeOwned {
    /// Describe the embedded owner if it differs from `id`, else `None`.
    fn owner_mismatch(&self, id: &DocumentId<'_>) -> Option<String>;
}

/// Typed façade over a [`DocumentStore`].
pub struct Documents {
    store: Box<dyn DocumentStore>,
}

impl Documents {
    pub fn new(store: Box<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Load a project-scoped document.
    pub fn load_project<T: Document>(&self, project: &str, key: &str) -> Result<Option<T>> {
        let id = DocumentId::project(project, key);
        let raw = self.store.load_document(&Scope::project(project), key)?;
        raw.map(|value| Self::decode(value, &id)).transpose()
    }

    /// Load a path-scoped document with the `general` fallback.
    pub fn load_path<T: Document>(&self, project: &str, path: &str, key: &str) -> Result<Option<T>> {
        let id = DocumentId::path(project, path, key);

        if let Some(value) = self.store.load_document(&Scope::path(project, path), key)? {
            return Self::decode(value, &id).map(Some);
        }

        if path != GENERAL_PATH {
            return Ok(None);
        }

        match self.store.load_document(&Scope::project(project), key)? {
            Some(value) => {
                tracing::debug!(project, key, "general path read from project scope");
                Self::decode(value, &id).map(Some)
            }
            None => Ok(None),
        }
    }

    pub fn save_project<T: Document>(&self, project: &str, key: &str, doc: &T) -> Result<()> {
        self.save(&Scope::project(project), key, doc)
    }

    pub fn save_path<T: Document>(&self, project: &str, path: &str, key: &str, doc: &T) -> Result<()> {
        self.save(&Scope::path(project, path), key, doc)
    }

    pub fn log_error(&self, operation: &str, message: &str, context: &serde_json::Value) {
        self.store.log_error(operation, message, context);
    }

    fn save<T: Document>(&self, scope: &Scope, key: &str, doc: &T) -> Result<()> {
        let body = serde_json::to_value(doc)?;
        if self.store.save_document(scope, key, &body)? {
            Ok(())
        } else {
            Err(StorageError::QueryFailed(format!("store declined write of {key} in {scope}")).into())
        }
    }

    fn decode<T: Document>(value: serde_json::Value, id: &DocumentId<'_>) -> Result<T> {
        let doc: T = serde_json::from_value(value)
            .map_err(|e| StorageError::Serialization(format!("{}: {e}", id.key)))?;
        if let Some(found) = doc.owner_mismatch(id) {
            return Err(CoreError::DataIntegrity {
                key: id.key.to_string(),
                expected: id.describe(),
                found,
            });
        }
        Ok(doc)
    }
}
