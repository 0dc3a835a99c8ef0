use driver_core::handle::{handles_dir, TaskHandle};
use driver_core::{Driver, DriverConfig, TaskId, TaskRegistry};
use driver_ecs::EcsCliClient;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Build a driver talking to the cluster named in `config`.
pub fn build_driver(config: DriverConfig) -> Driver {
    debug!(
        "Using ECS cluster {} (region {})",
        config.cluster,
        config.region.as_deref().unwrap_or("default")
    );
    let client = Arc::new(EcsCliClient::from_config(&config));
    Driver::new(config, client, TaskRegistry::new())
}

pub fn handle_path(task_id: &TaskId) -> PathBuf {
    handles_dir().join(TaskHandle::file_name(task_id))
}

/// Load the persisted handle for `task_id`.
pub fn load_handle(task_id: &TaskId) -> anyhow::Result<TaskHandle> {
    let path = handle_path(task_id);
    if path.exists() {
        Ok(TaskHandle::read_from_file(&path)?)
    } else {
        anyhow::bail!("No persisted handle for task {}", task_id)
    }
}

pub fn save_handle(handle: &TaskHandle) -> anyhow::Result<PathBuf> {
    let dir = handles_dir();
    std::fs::create_dir_all(&dir)?;
    Ok(handle.write_to_dir(&dir)?)
}

pub fn remove_handle(task_id: &TaskId) -> anyhow::Result<()> {
    remove_handle_in(&handles_dir(), task_id)
}

pub fn remove_handle_in(dir: &Path, task_id: &TaskId) -> anyhow::Result<()> {
    let path = dir.join(TaskHandle::file_name(task_id));
    if path.exists() {
        std::fs::remove_file(path)?;
    }
    Ok(())
}
