use crate::dispatch;
use driver_core::driver::Fingerprint;
use driver_core::DriverConfig;
use tokio_util::sync::CancellationToken;

pub async fn run(config: DriverConfig, watch: bool) -> anyhow::Result<()> {
    let driver = dispatch::build_driver(config);
    let cancel = CancellationToken::new();
    let mut reports = driver.fingerprint(cancel.clone());

    loop {
        tokio::select! {
            report = reports.recv() => {
                let Some(report) = report else { break };
                print_report(&report);
                if !watch {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    cancel.cancel();
    driver.shutdown();
    Ok(())
}

fn print_report(report: &Fingerprint) {
    println!(
        "[{}] {}: {}",
        chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC"),
        report.health,
        report.description
    );
    for (key, value) in &report.attributes {
        println!("  {} = {}", key, value);
    }
}
