//! In-memory document store for tests and dry runs.

use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::Value;

use super::{DocumentStore, Scope};
use crate::error::{Result, StorageError};

/// A logged failure, kept for inspection.
#[derive(Debug, Clone)]
pub struct LoggedError {
    pub operation: String,
    pub message: String,
    pub context: Value,
}

#[derive(Default)]
pub struct MemoryStore {
    documents: Mutex<HashMap<(Scope, String), Value>>,
    errors: Mutex<Vec<LoggedError>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Failures recorded through `log_error`, oldest first.
    pub fn errors(&self) -> Vec<LoggedError> {
        self.errors.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.documents.lock().map(|d| d.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DocumentStore for MemoryStore {
    fn load_document(&self, scope: &Scope, key: &str) -> Result<Option<Value>> {
        let documents = self.documents.lock().map_err(|_| StorageError::Locked)?;
        Ok(documents.get(&(scope.clone(), key.to_string())).cloned())
    }

    fn save_document(&self, scope: &Scope, key: &str, body: &Value) -> Result<bool> {
        let mut documents = self.documents.lock().map_err(|_| StorageError::Locked)?;
        documents.insert((scope.clone(), key.to_string()), body.clone());
        Ok(true)
    }

    fn log_error(&self, operation: &str, message: &str, context: &Value) {
        if let Ok(mut errors) = self.errors.lock() {
            errors.push(LoggedError {
                operation: operation.to_string(),
                message: message.to_string(),
                context: context.clone(),
            });
        }
    }
}

impl<T: DocumentStore + ?Sized> DocumentStore for std::sync::Arc<T> {
    fn load_document(&self, scope: &Scope, key: &str) -> Result<Option<Value>> {
        (**self).load_document(scope, key)
    }

    fn save_document(&self, scope: &Scope, key: &str, body: &Value) -> Result<bool> {
        (**self).save_document(scope, key, body)
    }

    fn log_error(&self, operation: &str, message: &str, context: &Value) {
        (**self).log_error(operation, message, context)
    }
}
