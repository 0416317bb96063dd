//! Core error types for frontier-core.
//!
//! Three kinds of failure reach callers: missing configuration, unknown
//! entities, and integrity violations in stored documents. Provider failures
//! and unparsable free-text are recovered locally and never appear here as
//! public operation results.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for frontier-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// No active project was supplied, or its config document is absent.
    #[error("Configuration missing: {0}")]
    ConfigurationMissing(String),

    /// An entity the caller referenced does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// A stored document describes a different entity than the one requested.
    #[error("Data integrity violation for '{key}': expected {expected}, found {found}")]
    DataIntegrity {
        key: String,
        expected: String,
        found: String,
    },

    /// Storage backend errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration file errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            kind,
            id: id.into(),
        }
    }
}

/// Document store errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to open the backing database
    #[error("Failed to open store at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Database is locked
    #[error("Store is locked")]
    Locked,

    /// Stored body could not be encoded or decoded
    #[error("Document serialization failed: {0}")]
    Serialization(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown dot-path key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Value outside its documented range
    #[error("Value for '{field}' out of range: {value} (expected {min}..={max})")]
    OutOfRange {
        field: String,
        value: i64,
        min: i64,
        max: i64,
    },

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Intelligence provider failures.
///
/// Absorbed by [`crate::intelligence::GeneratorChain`]; public operations
/// never return these.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// No provider configured, or it could not be reached
    #[error("Intelligence provider unavailable: {0}")]
    Unavailable(String),

    /// Call exceeded its time budget
    #[error("Intelligence provider timed out after {secs}s")]
    Timeout { secs: u64 },

    /// Non-success HTTP status
    #[error("Intelligence provider returned HTTP {status}")]
    Http { status: u16 },

    /// Response did not have the shape the request type requires
    #[error("Invalid intelligence response: {0}")]
    InvalidResponse(String),
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(inner, _msg) => {
                if inner.code == rusqlite::ErrorCode::DatabaseLocked
                    || inner.code == rusqlite::ErrorCode::DatabaseBusy
                {
                    StorageError::Locked
                } else {
                    StorageError::QueryFailed(err.to_string())
                }
            }
            _ => StorageError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Storage(err.into())
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout { secs: 0 }
        } else if let Some(status) = err.status() {
            ProviderError::Http {
                status: status.as_u16(),
            }
        } else if err.is_decode() {
            ProviderError::InvalidResponse(err.to_string())
        } else {
            ProviderError::Unavailable(err.to_string())
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_kind_and_id() {
        let err = CoreError::not_found("block", "b-42");
        assert_eq!(err.to_string(), "block not found: b-42");
    }

    #[test]
    fn integrity_message_includes_both_ids() {
        let err = CoreError::DataIntegrity {
            key: "graph".into(),
            expected: "proj/general".into(),
            found: "other/general".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("proj/general"));
        assert!(msg.contains("other/general"));
    }

    #[test]
    fn locked_sqlite_maps_to_locked() {
        let err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_LOCKED),
            None,
        );
        assert!(matches!(StorageError::from(err), StorageError::Locked));
    }
}
