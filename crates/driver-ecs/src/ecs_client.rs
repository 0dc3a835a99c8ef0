use crate::api;
use driver_core::config::{DriverConfig, TaskConfig};
use driver_core::{RemoteControlClient, RemoteError};
use tokio::process::Command;
use tracing::{debug, info};

/// ECS control client that drives the `aws` command line tool.
/// Every call is stateless apart from the target cluster and region.
#[derive(Debug, Clone)]
pub struct EcsCliClient {
    aws_path: String,
    cluster: String,
    region: Option<String>,
}

impl EcsCliClient {
    pub fn new(aws_path: impl Into<String>, cluster: impl Into<String>, region: Option<String>) -> Self {
        Self {
            aws_path: aws_path.into(),
            cluster: cluster.into(),
            region,
        }
    }

    pub fn from_config(config: &DriverConfig) -> Self {
        Self::new(config.aws_path.clone(), config.cluster.clone(), config.region.clone())
    }

    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    /// Full argument list for an `aws ecs <subcommand>` invocation.
    fn command_args(&self, subcommand: Vec<String>) -> Vec<String> {
        let mut args = vec!["ecs".to_string()];
        args.extend(subcommand);
        if let Some(ref region) = self.region {
            args.push("--region".to_string());
            args.push(region.clone());
        }
        args.push("--output".to_string());
        args.push("json".to_string());
        args
    }

    /// Run an `aws ecs` subcommand and return its stdout.
    async fn run_cmd(&self, subcommand: Vec<String>) -> Result<String, RemoteError> {
        let args = self.command_args(subcommand);
        debug!("Running: {} {}", self.aws_path, args.join(" "));

        let output = Command::new(&self.aws_path)
            .args(&args)
            .output()
            .await
            .map_err(|e| RemoteError::Unreachable(format!("failed to run {}: {}", self.aws_path, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RemoteError::Api(format!(
                "ecs {} failed: {}",
                args.get(1).map(String::as_str).unwrap_or(""),
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[async_trait::async_trait]
impl RemoteControlClient for EcsCliClient {
    async fn describe_cluster(&self) -> Result<(), RemoteError> {
        let raw = self.run_cmd(api::describe_clusters_args(&self.cluster)).await?;
        api::check_cluster(&raw)
    }

    async fn describe_task_status(&self, remote_id: &str) -> Result<String, RemoteError> {
        let raw = self
            .run_cmd(api::describe_tasks_args(&self.cluster, remote_id))
            .await?;
        api::task_status(&raw)
    }

    async fn launch(&self, config: &TaskConfig) -> Result<String, RemoteError> {
        let raw = self.run_cmd(api::run_task_args(&self.cluster, config)).await?;
        let arn = api::launched_task_arn(&raw)?;
        info!("ECS accepted task {} on cluster {}", arn, self.cluster);
        Ok(arn)
    }

    async fn terminate(&self, remote_id: &str) -> Result<(), RemoteError> {
        self.run_cmd(api::stop_task_args(&self.cluster, remote_id))
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_args_include_region_and_output() {
        let client = EcsCliClient::new("aws", "prod", Some("eu-west-1".into()));
        let args = client.command_args(api::describe_clusters_args("prod"));
        assert_eq!(
            args,
            vec![
                "ecs",
                "describe-clusters",
                "--clusters",
                "prod",
                "--region",
                "eu-west-1",
                "--output",
                "json"
            ]
        );
    }

    #[test]
    fn test_command_args_without_region() {
        let client = EcsCliClient::new("aws", "prod", None);
        let args = client.command_args(api::stop_task_args("prod", "arn-1"));
        assert!(!args.iter().any(|a| a == "--region"));
        assert_eq!(args[1], "stop-task");
        assert!(args.iter().any(|a| a == api::STOP_REASON));
    }

    #[test]
    fn test_from_config() {
        let config = DriverConfig {
            enabled: true,
            cluster: "prod".into(),
            region: None,
            aws_path: "/usr/local/bin/aws".into(),
            ..DriverConfig::default()
        };
        let client = EcsCliClient::from_config(&config);
        assert_eq!(client.cluster(), "prod");
        assert_eq!(client.aws_path, "/usr/local/bin/aws");
    }

    #[tokio::test]
    async fn test_missing_binary_is_unreachable() {
        let client = EcsCliClient::new("/nonexistent/aws-cli-for-tests", "prod", None);
        let err = client.describe_cluster().await.unwrap_err();
        assert!(matches!(err, RemoteError::Unreachable(_)));
    }
}
