use crate::commands::watch;
use crate::dispatch;
use driver_core::config::LaunchType;
use driver_core::{DriverConfig, TaskConfig, TaskId, TaskRequest};
use std::path::{Path, PathBuf};

pub async fn run(
    config: DriverConfig,
    task_file: &Path,
    id: Option<String>,
    name: Option<String>,
    launch_type: Option<LaunchType>,
    log_file: Option<PathBuf>,
    kill_on_interrupt: bool,
) -> anyhow::Result<()> {
    let mut task_config = TaskConfig::load_from(task_file)?;
    if launch_type.is_some() {
        task_config.task.launch_type = launch_type;
    }
    let task_id = id.map(TaskId::from_string).unwrap_or_default();
    let name = name.unwrap_or_else(|| task_config.task.task_definition.clone());

    let driver = dispatch::build_driver(config);
    let request = TaskRequest {
        id: task_id.clone(),
        name,
        log_path: log_file,
        config: task_config,
    };

    let handle = driver.start(request).await?;
    let handle_path = dispatch::save_handle(&handle)?;
    let status = driver.inspect(&task_id)?;

    println!("Task started:");
    println!("  ID:      {}", status.id);
    println!("  Name:    {}", status.name);
    println!("  ARN:     {}", status.arn().unwrap_or("-"));
    println!("  Status:  {}", status.state);
    println!("  Handle:  {}", handle_path.display());

    watch::until_exit(&driver, &task_id, kill_on_interrupt).await
}
