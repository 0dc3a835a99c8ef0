use driver_core::handle::{handles_dir, list_handles};
use driver_core::PersistableTaskState;

pub async fn run(json: bool) -> anyhow::Result<()> {
    let handles = list_handles(&handles_dir())?;

    if json {
        let entries: Vec<serde_json::Value> = handles
            .iter()
            .map(|h| {
                let state = h.get_driver_state::<PersistableTaskState>().ok();
                serde_json::json!({
                    "task_id": h.task_id(),
                    "name": h.config.name,
                    "arn": state.as_ref().map(|s| s.arn.clone()),
                    "started_at": state.as_ref().map(|s| s.started_at.to_rfc3339()),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if handles.is_empty() {
        println!("No tasks found.");
        return Ok(());
    }

    println!("{:<38} {:<20} {:<26} {}", "TASK ID", "NAME", "STARTED", "ARN");
    println!("{}", "-".repeat(110));
    for handle in &handles {
        let state = handle.get_driver_state::<PersistableTaskState>().ok();
        println!(
            "{:<38} {:<20} {:<26} {}",
            handle.task_id(),
            handle.config.name,
            state
                .as_ref()
                .map(|s| s.started_at.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                .unwrap_or_else(|| "-".into()),
            state.as_ref().map(|s| s.arn.as_str()).unwrap_or("-"),
        );
    }

    Ok(())
}
