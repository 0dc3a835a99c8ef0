//! Request arguments and response shapes for the `aws ecs` subcommands the
//! client uses.

use driver_core::config::TaskConfig;
use driver_core::RemoteError;
use serde::Deserialize;

/// Value of `--started-by` on every task this driver launches.
pub const STARTED_BY: &str = "ecs-driver";

/// Reason attached to stop requests, visible in the AWS console.
pub const STOP_REASON: &str = "stopped by ecs-driver automation";

const CLUSTER_ACTIVE: &str = "ACTIVE";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    #[serde(default)]
    pub cluster_name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(default)]
    pub task_arn: Option<String>,
    #[serde(default)]
    pub last_status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Failure {
    #[serde(default)]
    pub arn: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DescribeClustersOutput {
    #[serde(default)]
    pub clusters: Vec<Cluster>,
}

#[derive(Debug, Deserialize)]
pub struct TasksOutput {
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub failures: Vec<Failure>,
}

pub fn describe_clusters_args(cluster: &str) -> Vec<String> {
    vec![
        "describe-clusters".to_string(),
        "--clusters".to_string(),
        cluster.to_string(),
    ]
}

pub fn describe_tasks_args(cluster: &str, task_arn: &str) -> Vec<String> {
    vec![
        "describe-tasks".to_string(),
        "--cluster".to_string(),
        cluster.to_string(),
        "--tasks".to_string(),
        task_arn.to_string(),
    ]
}

pub fn stop_task_args(cluster: &str, task_arn: &str) -> Vec<String> {
    vec![
        "stop-task".to_string(),
        "--cluster".to_string(),
        cluster.to_string(),
        "--task".to_string(),
        task_arn.to_string(),
        "--reason".to_string(),
        STOP_REASON.to_string(),
    ]
}

/// Translate a validated task configuration into `run-task` arguments.
pub fn run_task_args(cluster: &str, config: &TaskConfig) -> Vec<String> {
    let task = &config.task;
    let mut args = vec![
        "run-task".to_string(),
        "--cluster".to_string(),
        cluster.to_string(),
        "--count".to_string(),
        "1".to_string(),
        "--started-by".to_string(),
        STARTED_BY.to_string(),
    ];

    if let Some(launch_type) = task.launch_type {
        args.push("--launch-type".to_string());
        args.push(launch_type.to_string());
    }

    args.push("--task-definition".to_string());
    args.push(task.task_definition.clone());

    if let Some(ref network) = task.network_configuration {
        let vpc = &network.aws_vpc_configuration;
        let mut awsvpc = serde_json::json!({
            "subnets": vpc.subnets,
            "assignPublicIp": if vpc.assign_public_ip { "ENABLED" } else { "DISABLED" },
        });
        if !vpc.security_groups.is_empty() {
            awsvpc["securityGroups"] = serde_json::json!(vpc.security_groups);
        }
        args.push("--network-configuration".to_string());
        args.push(serde_json::json!({ "awsvpcConfiguration": awsvpc }).to_string());
    }

    args
}

fn decode<'a, T: Deserialize<'a>>(raw: &'a str) -> Result<T, RemoteError> {
    serde_json::from_str(raw).map_err(|e| RemoteError::MalformedResponse(e.to_string()))
}

/// Ok only for exactly one cluster in the ACTIVE state.
pub fn check_cluster(raw: &str) -> Result<(), RemoteError> {
    let output: DescribeClustersOutput = decode(raw)?;
    if output.clusters.len() != 1 {
        return Err(RemoteError::UnexpectedClusterCount(output.clusters.len()));
    }
    match output.clusters[0].status.as_deref() {
        Some(CLUSTER_ACTIVE) => Ok(()),
        Some(status) => Err(RemoteError::ClusterNotActive(status.to_string())),
        None => Err(RemoteError::MalformedResponse(
            "cluster has no status".to_string(),
        )),
    }
}

pub fn task_status(raw: &str) -> Result<String, RemoteError> {
    let output: TasksOutput = decode(raw)?;
    if let Some(failure) = output.failures.first() {
        return Err(failure_error(failure));
    }
    output
        .tasks
        .into_iter()
        .next()
        .and_then(|t| t.last_status)
        .ok_or_else(|| RemoteError::MalformedResponse("task has no lastStatus".to_string()))
}

pub fn launched_task_arn(raw: &str) -> Result<String, RemoteError> {
    let output: TasksOutput = decode(raw)?;
    if let Some(arn) = output.tasks.into_iter().next().and_then(|t| t.task_arn) {
        return Ok(arn);
    }
    match output.failures.first() {
        Some(failure) => Err(failure_error(failure)),
        None => Err(RemoteError::MalformedResponse(
            "run-task returned no tasks".to_string(),
        )),
    }
}

fn failure_error(failure: &Failure) -> RemoteError {
    RemoteError::Api(format!(
        "{} ({})",
        failure.reason.as_deref().unwrap_or("unknown failure"),
        failure.arn.as_deref().unwrap_or("no arn")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use driver_core::config::{AwsVpcConfiguration, EcsTaskConfig, LaunchType, NetworkConfiguration};

    fn config(network: Option<NetworkConfiguration>) -> TaskConfig {
        TaskConfig {
            task: EcsTaskConfig {
                launch_type: Some(LaunchType::Fargate),
                task_definition: "web:3".into(),
                network_configuration: network,
            },
        }
    }

    fn value_after<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1))
            .map(String::as_str)
    }

    #[test]
    fn test_run_task_args_without_network() {
        let args = run_task_args("prod", &config(None));
        assert_eq!(args[0], "run-task");
        assert_eq!(value_after(&args, "--cluster"), Some("prod"));
        assert_eq!(value_after(&args, "--count"), Some("1"));
        assert_eq!(value_after(&args, "--started-by"), Some(STARTED_BY));
        assert_eq!(value_after(&args, "--launch-type"), Some("FARGATE"));
        assert_eq!(value_after(&args, "--task-definition"), Some("web:3"));
        assert!(!args.iter().any(|a| a == "--network-configuration"));
    }

    #[test]
    fn test_run_task_args_network_block() {
        let network = NetworkConfiguration {
            aws_vpc_configuration: AwsVpcConfiguration {
                assign_public_ip: true,
                security_groups: vec!["sg-1".into()],
                subnets: vec!["subnet-1".into(), "subnet-2".into()],
            },
        };
        let args = run_task_args("prod", &config(Some(network)));
        let raw = value_after(&args, "--network-configuration").unwrap();
        let json: serde_json::Value = serde_json::from_str(raw).unwrap();
        let vpc = &json["awsvpcConfiguration"];
        assert_eq!(vpc["assignPublicIp"], "ENABLED");
        assert_eq!(vpc["subnets"], serde_json::json!(["subnet-1", "subnet-2"]));
        assert_eq!(vpc["securityGroups"], serde_json::json!(["sg-1"]));
    }

    #[test]
    fn test_run_task_args_omits_unset_launch_type() {
        let mut cfg = config(None);
        cfg.task.launch_type = None;
        let args = run_task_args("prod", &cfg);
        assert!(!args.iter().any(|a| a == "--launch-type"));
    }

    #[test]
    fn test_check_cluster() {
        assert!(check_cluster(r#"{"clusters":[{"clusterName":"prod","status":"ACTIVE"}]}"#).is_ok());
        assert_eq!(
            check_cluster(r#"{"clusters":[{"status":"INACTIVE"}]}"#),
            Err(RemoteError::ClusterNotActive("INACTIVE".into()))
        );
        assert_eq!(
            check_cluster(r#"{"clusters":[],"failures":[{"reason":"MISSING"}]}"#),
            Err(RemoteError::UnexpectedClusterCount(0))
        );
        assert!(matches!(
            check_cluster("not json"),
            Err(RemoteError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_task_status() {
        let raw = r#"{"tasks":[{"taskArn":"arn-1","lastStatus":"RUNNING"}],"failures":[]}"#;
        assert_eq!(task_status(raw).unwrap(), "RUNNING");

        let missing = r#"{"tasks":[],"failures":[{"arn":"arn-1","reason":"MISSING"}]}"#;
        assert_eq!(
            task_status(missing),
            Err(RemoteError::Api("MISSING (arn-1)".into()))
        );

        assert!(matches!(
            task_status(r#"{"tasks":[],"failures":[]}"#),
            Err(RemoteError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_launched_task_arn() {
        let raw = r#"{"tasks":[{"taskArn":"arn:aws:ecs:us-east-1:1:task/prod/abc","lastStatus":"PROVISIONING"}],"failures":[]}"#;
        assert_eq!(
            launched_task_arn(raw).unwrap(),
            "arn:aws:ecs:us-east-1:1:task/prod/abc"
        );

        let failed = r#"{"tasks":[],"failures":[{"reason":"RESOURCE:MEMORY"}]}"#;
        assert_eq!(
            launched_task_arn(failed),
            Err(RemoteError::Api("RESOURCE:MEMORY (no arn)".into()))
        );
    }
}
