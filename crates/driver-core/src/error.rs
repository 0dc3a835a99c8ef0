use crate::task::TaskId;
use thiserror::Error;

/// Failures reported by a [`crate::RemoteControlClient`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("ECS cluster status: {0}")]
    ClusterNotActive(String),

    #[error("remote service returned {0} clusters, expected 1")]
    UnexpectedClusterCount(usize),

    #[error("remote service unreachable: {0}")]
    Unreachable(String),

    #[error("remote API error: {0}")]
    Api(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

#[derive(Error, Debug)]
pub enum DriverError {
    #[error("invalid configuration: {0}")]
    Validation(String),

    #[error("failed to launch remote task: {0}")]
    RemoteLaunch(#[source] RemoteError),

    #[error("failed to terminate remote task: {0}")]
    RemoteTerminate(#[source] RemoteError),

    #[error("failed to query remote task: {0}")]
    RemoteQuery(#[source] RemoteError),

    #[error("task not found: {0}")]
    TaskNotFound(TaskId),

    #[error("task with ID {0} already started")]
    AlreadyExists(TaskId),

    #[error("cannot destroy running task {0}")]
    StillRunning(TaskId),

    #[error("driver is disabled")]
    Disabled,

    #[error("timed out waiting for task (id={task_id}) to stop (detach={detach})")]
    Timeout { task_id: TaskId, detach: bool },

    #[error("failed to decode task state from handle: {0}")]
    HandleDecode(#[source] serde_json::Error),

    #[error("operation not supported: {0}")]
    Unsupported(&'static str),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
