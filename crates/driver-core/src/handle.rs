use crate::error::DriverError;
use crate::task::{TaskId, TaskRequest};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Version of the handle layout this driver writes and understands.
pub const TASK_HANDLE_VERSION: u32 = 1;

/// The durable subset of a supervised task: enough to resume supervision
/// after the orchestrator restarts. Stop intent is deliberately absent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersistableTaskState {
    pub task: TaskRequest,
    pub arn: String,
    pub started_at: DateTime<Utc>,
}

/// Handle returned by `start` and persisted by the orchestrator host.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskHandle {
    pub version: u32,
    pub config: TaskRequest,
    #[serde(default)]
    driver_state: Option<serde_json::Value>,
}

impl TaskHandle {
    pub fn new(config: TaskRequest) -> Self {
        Self {
            version: TASK_HANDLE_VERSION,
            config,
            driver_state: None,
        }
    }

    pub fn task_id(&self) -> &TaskId {
        &self.config.id
    }

    pub fn set_driver_state<T: Serialize>(&mut self, state: &T) -> Result<(), DriverError> {
        self.driver_state = Some(serde_json::to_value(state)?);
        Ok(())
    }

    pub fn get_driver_state<T: DeserializeOwned>(&self) -> Result<T, DriverError> {
        let value = self.driver_state.clone().unwrap_or(serde_json::Value::Null);
        serde_json::from_value(value).map_err(DriverError::HandleDecode)
    }

    pub fn file_name(task_id: &TaskId) -> String {
        format!("{}.handle.json", task_id)
    }

    /// Write the handle as `<task id>.handle.json` in `dir`.
    pub fn write_to_dir(&self, dir: &Path) -> Result<PathBuf, DriverError> {
        let path = dir.join(Self::file_name(self.task_id()));
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json)?;
        Ok(path)
    }

    pub fn read_from_file(path: &Path) -> Result<Self, DriverError> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }
}

/// Default directory for persisted handles.
pub fn handles_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("ecs-driver")
        .join("handles")
}

/// Read every handle in `dir`, skipping files that do not decode.
pub fn list_handles(dir: &Path) -> Result<Vec<TaskHandle>, DriverError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut handles = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path
            .file_name()
            .is_some_and(|n| n.to_string_lossy().ends_with(".handle.json"))
        {
            if let Ok(handle) = TaskHandle::read_from_file(&path) {
                handles.push(handle);
            }
        }
    }
    handles.sort_by(|a, b| a.task_id().cmp(b.task_id()));
    Ok(handles)
}
