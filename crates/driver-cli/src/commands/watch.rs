use crate::dispatch;
use driver_core::driver::DETACH_SIGNAL;
use driver_core::{Driver, ExitOutcome, TaskId};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// How long Ctrl-C waits for the task to stop before giving up.
const INTERRUPT_STOP_TIMEOUT: Duration = Duration::from_secs(120);

/// Block until the task exits or the user presses Ctrl-C. Exited tasks are
/// destroyed and their handle removed; detached tasks keep their handle so
/// they can be attached again.
pub async fn until_exit(driver: &Driver, task_id: &TaskId, kill_on_interrupt: bool) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    let mut exits = driver.wait(task_id, cancel.clone())?;

    tokio::select! {
        outcome = exits.recv() => {
            match outcome {
                Some(outcome) => finish(driver, task_id, &outcome).await?,
                None => anyhow::bail!("Lost track of task {} before it exited", task_id),
            }
        }
        _ = tokio::signal::ctrl_c() => {
            cancel.cancel();
            if kill_on_interrupt {
                println!("Interrupted; terminating task {}...", task_id);
                driver.stop(task_id, INTERRUPT_STOP_TIMEOUT, "SIGKILL").await?;
                let outcome = driver.inspect(task_id)?.exit.unwrap_or_else(ExitOutcome::success);
                finish(driver, task_id, &outcome).await?;
            } else {
                driver.stop(task_id, INTERRUPT_STOP_TIMEOUT, DETACH_SIGNAL).await?;
                println!("Detached from task {}; the remote task keeps running.", task_id);
                println!("Resume with `ecs-driver attach {}`.", task_id);
            }
        }
    }

    driver.shutdown();
    Ok(())
}

async fn finish(driver: &Driver, task_id: &TaskId, outcome: &ExitOutcome) -> anyhow::Result<()> {
    println!("Task {} exited: {}", task_id, outcome);
    driver.destroy(task_id, false).await?;
    dispatch::remove_handle(task_id)?;
    if !outcome.is_success() {
        anyhow::bail!("task {} failed with {}", task_id, outcome);
    }
    Ok(())
}
