use crate::config::TaskConfig;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Driver attribute under which a task's remote identifier is reported.
pub const ARN_ATTRIBUTE: &str = "arn";

/// Caller-assigned local task identifier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub String);

impl TaskId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn from_string(s: String) -> Self {
        Self(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A task as handed to the driver by the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskRequest {
    pub id: TaskId,
    pub name: String,
    /// Where per-poll status lines are appended while the task is monitored.
    #[serde(default)]
    pub log_path: Option<PathBuf>,
    pub config: TaskConfig,
}

/// The pair of identifiers bound together for the lifetime of a supervisor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskIdentity {
    pub local: TaskId,
    pub remote: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Running,
    Exited,
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskState::Running => write!(f, "running"),
            TaskState::Exited => write!(f, "exited"),
        }
    }
}

/// Terminal result of a supervised task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExitOutcome {
    pub exit_code: i32,
    pub signal: Option<i32>,
    pub error: Option<String>,
}

impl ExitOutcome {
    pub fn success() -> Self {
        Self {
            exit_code: 0,
            signal: None,
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            exit_code: 1,
            signal: None,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == 0 && self.error.is_none()
    }
}

impl fmt::Display for ExitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "exit code {}", self.exit_code)?;
        if let Some(signal) = self.signal {
            write!(f, ", signal {}", signal)?;
        }
        if let Some(ref err) = self.error {
            write!(f, ": {}", err)?;
        }
        Ok(())
    }
}

/// Point-in-time snapshot of a supervised task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskStatus {
    pub id: TaskId,
    pub name: String,
    pub state: TaskState,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub exit: Option<ExitOutcome>,
    pub driver_attributes: BTreeMap<String, String>,
}

impl TaskStatus {
    pub fn arn(&self) -> Option<&str> {
        self.driver_attributes.get(ARN_ATTRIBUTE).map(String::as_str)
    }
}

/// Resource usage sample. Remote tasks are not executed locally, so every
/// counter is zero.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TaskResourceUsage {
    pub memory_rss_bytes: u64,
    pub cpu_percent: f64,
    pub timestamp: i64,
}

impl TaskResourceUsage {
    pub fn placeholder() -> Self {
        Self {
            timestamp: Utc::now().timestamp_nanos_opt().unwrap_or_default(),
            ..Self::default()
        }
    }
}
