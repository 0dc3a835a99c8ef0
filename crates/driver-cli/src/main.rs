use anyhow::Result;
use clap::{Parser, Subcommand};
use driver_core::config::LaunchType;
use driver_core::DriverConfig;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod dispatch;

#[derive(Parser)]
#[command(name = "ecs-driver")]
#[command(about = "Run and supervise tasks on AWS ECS", long_about = None)]
struct Cli {
    /// Driver config file (defaults to the user config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Launch a task and supervise it until it exits
    Run {
        /// Task config file (YAML)
        task_file: PathBuf,

        /// Task ID (generated if omitted)
        #[arg(long)]
        id: Option<String>,

        /// Task name (defaults to the task definition)
        #[arg(long)]
        name: Option<String>,

        /// Override the launch type from the task file (EC2 or FARGATE)
        #[arg(long)]
        launch_type: Option<LaunchType>,

        /// Append remote status lines to this file
        #[arg(long)]
        log_file: Option<PathBuf>,

        /// Terminate the remote task on Ctrl-C instead of detaching
        #[arg(long)]
        kill_on_interrupt: bool,
    },

    /// Resume supervising a task started earlier
    Attach {
        task_id: String,

        /// Terminate the remote task on Ctrl-C instead of detaching
        #[arg(long)]
        kill_on_interrupt: bool,
    },

    /// Stop a task, terminating the remote task unless detaching
    Stop {
        task_id: String,

        /// Stop supervising but leave the remote task running
        #[arg(long)]
        detach: bool,

        /// Seconds to wait for the task to stop
        #[arg(short, long, default_value = "60")]
        timeout: u64,
    },

    /// List tasks with persisted handles
    List {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Report driver health
    Fingerprint {
        /// Keep reporting every fingerprint period
        #[arg(short, long)]
        watch: bool,
    },

    /// Show or initialize the driver config
    Config {
        /// Print the default config path
        #[arg(long)]
        path: bool,

        /// Write a sample config to the default path
        #[arg(long)]
        init: bool,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<DriverConfig> {
    match path {
        Some(path) => DriverConfig::load_from(path),
        None => DriverConfig::load_default(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    use Commands::*;

    match cli.command {
        Run {
            task_file,
            id,
            name,
            launch_type,
            log_file,
            kill_on_interrupt,
        } => {
            let config = load_config(cli.config.as_ref())?;
            commands::run::run(
                config,
                &task_file,
                id,
                name,
                launch_type,
                log_file,
                kill_on_interrupt,
            )
            .await?;
        }
        Attach {
            task_id,
            kill_on_interrupt,
        } => {
            let config = load_config(cli.config.as_ref())?;
            commands::attach::run(config, &task_id, kill_on_interrupt).await?;
        }
        Stop {
            task_id,
            detach,
            timeout,
        } => {
            let config = load_config(cli.config.as_ref())?;
            commands::stop::run(config, &task_id, detach, timeout).await?;
        }
        List { json } => {
            commands::list::run(json).await?;
        }
        Fingerprint { watch } => {
            let config = load_config(cli.config.as_ref())?;
            commands::fingerprint::run(config, watch).await?;
        }
        Config { path, init } => {
            commands::config::run(path, init).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_accepts_launch_type_override() {
        let cli = Cli::try_parse_from(["ecs-driver", "run", "task.yaml", "--launch-type", "fargate"]).unwrap();
        match cli.command {
            Commands::Run { launch_type, .. } => assert_eq!(launch_type, Some(LaunchType::Fargate)),
            _ => panic!("expected run"),
        }
        assert!(Cli::try_parse_from(["ecs-driver", "run", "task.yaml", "--launch-type", "external"]).is_err());
    }
}
