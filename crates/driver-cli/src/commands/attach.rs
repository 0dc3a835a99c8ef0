use crate::commands::watch;
use crate::dispatch;
use driver_core::{DriverConfig, TaskId};

pub async fn run(config: DriverConfig, task_id_str: &str, kill_on_interrupt: bool) -> anyhow::Result<()> {
    let task_id = TaskId::from_string(task_id_str.to_string());
    let handle = dispatch::load_handle(&task_id)?;

    let driver = dispatch::build_driver(config);
    driver.recover(&handle)?;

    let status = driver.inspect(&task_id)?;
    println!(
        "Attached to task {} ({}), started {}",
        task_id,
        status.arn().unwrap_or("-"),
        status.started_at
    );

    watch::until_exit(&driver, &task_id, kill_on_interrupt).await
}
