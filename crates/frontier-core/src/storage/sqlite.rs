//! SQLite-backed document store.
//!
//! Provides persistent storage for:
//! - JSON documents keyed by scope and key
//! - An error log fed by `log_error`

use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

use super::{data_dir, DocumentStore, Scope};
use crate::error::{Result, StorageError};

/// SQLite database for document storage.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open the store at `<data_dir>/frontier.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("frontier.db");
        Self::open_at(&path)
    }

    /// Open the store at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| StorageError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        migrate(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Number of rows in the error log.
    pub fn error_count(&self) -> Result<u64> {
        let conn = self.conn.lock().map_err(|_| StorageError::Locked)?;
        let count: u64 = conn.query_row("SELECT COUNT(*) FROM error_log", [], |row| row.get(0))?;
        Ok(count)
    }
}

fn migrate(conn: &Connection) -> std::result::Result<(), rusqlite::Error> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS documents (
            scope       TEXT NOT NULL,
            key         TEXT NOT NULL,
            body        TEXT NOT NULL,
            updated_at  TEXT NOT NULL,
            PRIMARY KEY (scope, key)
        );

        CREATE TABLE IF NOT EXISTS error_log (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            operation   TEXT NOT NULL,
            message     TEXT NOT NULL,
            context     TEXT NOT NULL DEFAULT '{}',
            logged_at   TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_error_log_operation ON error_log(operation);",
    )
}

impl DocumentStore for SqliteStore {
    fn load_document(&self, scope: &Scope, key: &str) -> Result<Option<Value>> {
        let conn = self.conn.lock().map_err(|_| StorageError::Locked)?;
        let body: Option<String> = conn
            .query_row(
                "SELECT body FROM documents WHERE scope = ?1 AND key = ?2",
                params![scope.to_string(), key],
                |row| row.get(0),
            )
            .optional()?;

        match body {
            Some(text) => {
                let value = serde_json::from_str(&text)
                    .map_err(|e| StorageError::Serialization(format!("{scope} {key}: {e}")))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    fn save_document(&self, scope: &Scope, key: &str, body: &Value) -> Result<bool> {
        let text = serde_json::to_string(body)?;
        let mut conn = self.conn.lock().map_err(|_| StorageError::Locked)?;
        let tx = conn.transaction()?;
        let changed = tx.execute(
            "INSERT INTO documents (scope, key, body, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(scope, key) DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at",
            params![scope.to_string(), key, text, Utc::now().to_rfc3339()],
        )?;
        tx.commit()?;
        Ok(changed == 1)
    }

    fn log_error(&self, operation: &str, message: &str, context: &Value) {
        let Ok(conn) = self.conn.lock() else {
            tracing::warn!(operation, message, "error log unavailable: store lock poisoned");
            return;
        };
        if let Err(e) = conn.execute(
            "INSERT INTO error_log (operation, message, context, logged_at) VALUES (?1, ?2, ?3, ?4)",
            params![operation, message, context.to_string(), Utc::now().to_rfc3339()],
        ) {
            tracing::warn!(operation, error = %e, "failed to write error log");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn round_trip_in_memory() {
        let store = SqliteStore::open_memory().unwrap();
        let scope = Scope::path("p", "web");
        store.save_document(&scope, "graph", &json!({"nodes": []})).unwrap();
        assert_eq!(
            store.load_document(&scope, "graph").unwrap(),
            Some(json!({"nodes": []}))
        );
    }

    #[test]
    fn upsert_replaces_body() {
        let store = SqliteStore::open_memory().unwrap();
        let scope = Scope::project("p");
        assert!(store.save_document(&scope, "config", &json!({"v": 1})).unwrap());
        assert!(store.save_document(&scope, "config", &json!({"v": 2})).unwrap());
        assert_eq!(store.load_document(&scope, "config").unwrap(), Some(json!({"v": 2})));
    }

    #[test]
    fn missing_document_is_none() {
        let store = SqliteStore::open_memory().unwrap();
        assert!(store.load_document(&Scope::project("p"), "nope").unwrap().is_none());
    }

    #[test]
    fn persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("frontier.db");
        {
            let store = SqliteStore::open_at(&path).unwrap();
            store.save_document(&Scope::project("p"), "config", &json!({"id": "p"})).unwrap();
        }
        let store = SqliteStore::open_at(&path).unwrap();
        assert_eq!(
            store.load_document(&Scope::project("p"), "config").unwrap(),
            Some(json!({"id": "p"}))
        );
    }

    #[test]
    fn error_log_rows_are_written() {
        let store = SqliteStore::open_memory().unwrap();
        store.log_error("get_status", "Configuration missing", &json!({"project": ""}));
        assert_eq!(store.error_count().unwrap(), 1);
    }
}
