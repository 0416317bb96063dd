//! Request context and per-path locking.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::{CoreError, Result, StorageError};
use crate::storage::GENERAL_PATH;

/// The project and path an operation works on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub project_id: String,
    pub path: String,
}

impl Session {
    /// Surrounding whitespace is stripped from both ids, so every lookup
    /// and lock key sees the same value.
    pub fn new(project_id: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into().trim().to_string(),
            path: path.into().trim().to_string(),
        }
    }

    /// Session on the `general` path.
    pub fn general(project_id: impl Into<String>) -> Self {
        Self::new(project_id, GENERAL_PATH)
    }

    /// Fails when no project is selected.
    pub fn require_project(&self) -> Result<&str> {
        if self.project_id.is_empty() {
            return Err(CoreError::ConfigurationMissing("no active project selected".into()));
        }
        Ok(&self.project_id)
    }

    fn lock_key(&self) -> String {
        format!("{}/{}", self.project_id, self.path)
    }
}

/// One mutex per `project/path`, created on first use.
#[derive(Debug, Default)]
pub struct PathLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl PathLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the lock for the session's path.
    pub fn with<T>(&self, session: &Session, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let lock = {
            let mut locks = self.locks.lock().map_err(|_| StorageError::Locked)?;
            Arc::clone(locks.entry(session.lock_key()).or_default())
        };
        let _guard = lock.lock().map_err(|_| StorageError::Locked)?;
        f()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn empty_project_is_configuration_missing() {
        let err = Session::general("  ").require_project().unwrap_err();
        assert!(matches!(err, CoreError::ConfigurationMissing(_)));
        assert_eq!(Session::general("p").require_project().unwrap(), "p");
    }

    #[test]
    fn ids_are_trimmed_once() {
        let padded = Session::new(" piano ", " theory");
        assert_eq!(padded, Session::new("piano", "theory"));
        assert_eq!(padded.require_project().unwrap(), "piano");
        assert_eq!(padded.lock_key(), "piano/theory");
    }

    #[test]
    fn same_path_is_serialized() {
        let locks = Arc::new(PathLocks::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let overlap = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let locks = Arc::clone(&locks);
                let inside = Arc::clone(&inside);
                let overlap = Arc::clone(&overlap);
                thread::spawn(move || {
                    locks
                        .with(&Session::general("p"), || {
                            if inside.fetch_add(1, Ordering::SeqCst) > 0 {
                                overlap.fetch_add(1, Ordering::SeqCst);
                            }
                            thread::sleep(Duration::from_millis(10));
                            inside.fetch_sub(1, Ordering::SeqCst);
                            Ok(())
                        })
                        .unwrap();
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(overlap.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn errors_pass_through() {
        let locks = PathLocks::new();
        let result: Result<()> = locks.with(&Session::general("p"), || Err(CoreError::not_found("block", "b9")));
        assert!(matches!(result, Err(CoreError::NotFound { .. })));
    }
}
