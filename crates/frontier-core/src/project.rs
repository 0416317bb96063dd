//! Project-level configuration document.
//!
//! A project names a goal, how urgent it is, which learning paths it has and
//! the user's daily rhythm. It is stored once per project under the
//! project scope with key [`PROJECT_CONFIG_KEY`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::storage::{Document, DocumentId, GENERAL_PATH};

pub const PROJECT_CONFIG_KEY: &str = "config";

/// How hard the project deadline pushes the expected-progress curve.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Urgency {
    /// Percentage points of expected progress per elapsed day.
    pub fn factor(&self) -> f64 {
        match self {
            Urgency::Critical => 2.0,
            Urgency::High => 1.5,
            Urgency::Medium => 1.0,
            Urgency::Low => 0.7,
        }
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Urgency::Low => "low",
            Urgency::Medium => "medium",
            Urgency::High => "high",
            Urgency::Critical => "critical",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for Urgency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Urgency::Low),
            "medium" => Ok(Urgency::Medium),
            "high" => Ok(Urgency::High),
            "critical" => Ok(Urgency::Critical),
            other => Err(format!("unknown urgency '{other}' (low|medium|high|critical)")),
        }
    }
}

/// Project configuration document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub id: String,
    pub goal: String,
    #[serde(default)]
    pub urgency: Urgency,
    /// Named learning paths. `general` is always implied.
    #[serde(default)]
    pub learning_paths: Vec<String>,
    pub wake_time: String,
    pub sleep_time: String,
    #[serde(default)]
    pub meal_times: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl ProjectConfig {
    pub fn new(id: impl Into<String>, goal: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            goal: goal.into(),
            urgency: Urgency::default(),
            learning_paths: Vec::new(),
            wake_time: "7:00 AM".to_string(),
            sleep_time: "10:00 PM".to_string(),
            meal_times: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_urgency(mut self, urgency: Urgency) -> Self {
        self.urgency = urgency;
        self
    }

    pub fn with_paths(mut self, paths: Vec<String>) -> Self {
        self.learning_paths = paths;
        self
    }

    pub fn with_day(
        mut self,
        wake_time: impl Into<String>,
        sleep_time: impl Into<String>,
        meal_times: Vec<String>,
    ) -> Self {
        self.wake_time = wake_time.into();
        self.sleep_time = sleep_time.into();
        self.meal_times = meal_times;
        self
    }

    /// Whether `path` belongs to this project.
    pub fn has_path(&self, path: &str) -> bool {
        path == GENERAL_PATH || self.learning_paths.iter().any(|p| p == path)
    }
}

impl Document for ProjectConfig {
    fn owner_mismatch(&self, id: &DocumentId<'_>) -> Option<String> {
        (self.id != id.project).then(|| format!("project '{}'", self.id))
    }
}
