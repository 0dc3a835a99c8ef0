use crate::dispatch;
use driver_core::driver::DETACH_SIGNAL;
use driver_core::handle::handles_dir;
use driver_core::{Driver, DriverConfig, TaskId, TaskStatus};
use std::path::Path;
use std::time::Duration;

pub async fn run(config: DriverConfig, task_id_str: &str, detach: bool, timeout: u64) -> anyhow::Result<()> {
    let task_id = TaskId::from_string(task_id_str.to_string());
    let handle = dispatch::load_handle(&task_id)?;

    let driver = dispatch::build_driver(config);
    driver.recover(&handle)?;

    let status = stop_task(
        &driver,
        &task_id,
        detach,
        Duration::from_secs(timeout),
        &handles_dir(),
    )
    .await?;
    driver.shutdown();

    if detach {
        println!(
            "Task {} detached; remote task {} left running.",
            task_id,
            status.arn().unwrap_or("-")
        );
        println!("Resume with `ecs-driver attach {}`.", task_id);
    } else {
        println!("Task {} stopped.", task_id);
    }

    Ok(())
}

/// Stop a registered task and drop it from the driver. A killed task's
/// handle is deleted from `handles`; a detached task keeps its handle so it
/// can be attached again.
async fn stop_task(
    driver: &Driver,
    task_id: &TaskId,
    detach: bool,
    timeout: Duration,
    handles: &Path,
) -> anyhow::Result<TaskStatus> {
    let signal = if detach { DETACH_SIGNAL } else { "SIGKILL" };
    driver.stop(task_id, timeout, signal).await?;

    let status = driver.inspect(task_id)?;
    driver.destroy(task_id, false).await?;
    if !detach {
        dispatch::remove_handle_in(handles, task_id)?;
    }
    Ok(status)
}
