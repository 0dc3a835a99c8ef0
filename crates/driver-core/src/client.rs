use crate::config::TaskConfig;
use crate::error::RemoteError;

/// Remote task statuses that mean the task is already on its way out.
pub const STATUS_DEACTIVATING: &str = "DEACTIVATING";
pub const STATUS_STOPPING: &str = "STOPPING";
pub const STATUS_DEPROVISIONING: &str = "DEPROVISIONING";
pub const STATUS_STOPPED: &str = "STOPPED";

/// True if a remote task reporting `status` is tearing down or gone.
pub fn is_terminal_phase(status: &str) -> bool {
    matches!(
        status,
        STATUS_DEACTIVATING | STATUS_STOPPING | STATUS_DEPROVISIONING | STATUS_STOPPED
    )
}

/// Control-plane operations the driver needs from the remote container
/// service. Implementations are shared by every supervisor, so calls are
/// keyed by remote id and must not hold per-task state.
#[async_trait::async_trait]
pub trait RemoteControlClient: Send + Sync {
    /// Ok if the configured cluster exists and is active.
    async fn describe_cluster(&self) -> Result<(), RemoteError>;

    /// Last reported status string of the remote task.
    async fn describe_task_status(&self, remote_id: &str) -> Result<String, RemoteError>;

    /// Launch a task from an already validated configuration and return its
    /// remote id.
    async fn launch(&self, config: &TaskConfig) -> Result<String, RemoteError>;

    /// Ask the remote service to stop the task. Returns once the request is
    /// accepted, not once the task has stopped.
    async fn terminate(&self, remote_id: &str) -> Result<(), RemoteError>;
}
