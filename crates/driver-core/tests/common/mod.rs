#![allow(dead_code)]

use driver_core::config::{EcsTaskConfig, LaunchType, TaskConfig};
use driver_core::{Driver, DriverConfig, RemoteControlClient, RemoteError, TaskId, TaskRegistry, TaskRequest};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Scripted stand-in for the remote service.
#[derive(Default)]
pub struct FakeClient {
    state: Mutex<FakeState>,
}

#[derive(Default)]
struct FakeState {
    launched: usize,
    statuses: HashMap<String, String>,
    terminated: Vec<String>,
    /// Polls left before a terminated task reports STOPPED.
    stopping: HashMap<String, usize>,
    stop_delay_polls: usize,
    launch_delay: Option<Duration>,
    describe_task_calls: usize,
    describe_cluster_calls: usize,
    query_error: Option<RemoteError>,
    launch_error: Option<RemoteError>,
    cluster_error: Option<RemoteError>,
}

impl FakeClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Terminated tasks report STOPPING for `polls` polls before STOPPED.
    pub fn with_stop_delay(polls: usize) -> Arc<Self> {
        let client = Self::default();
        client.state.lock().stop_delay_polls = polls;
        Arc::new(client)
    }

    /// Every launch takes `delay` before the remote side answers.
    pub fn with_launch_delay(delay: Duration) -> Arc<Self> {
        let client = Self::default();
        client.state.lock().launch_delay = Some(delay);
        Arc::new(client)
    }

    pub fn set_status(&self, arn: &str, status: &str) {
        self.state.lock().statuses.insert(arn.to_string(), status.to_string());
    }

    pub fn fail_queries(&self, err: RemoteError) {
        self.state.lock().query_error = Some(err);
    }

    pub fn fail_launches(&self, err: RemoteError) {
        self.state.lock().launch_error = Some(err);
    }

    pub fn fail_cluster(&self, err: Option<RemoteError>) {
        self.state.lock().cluster_error = err;
    }

    pub fn launch_count(&self) -> usize {
        self.state.lock().launched
    }

    pub fn terminate_count(&self) -> usize {
        self.state.lock().terminated.len()
    }

    pub fn terminated(&self) -> Vec<String> {
        self.state.lock().terminated.clone()
    }

    pub fn describe_task_calls(&self) -> usize {
        self.state.lock().describe_task_calls
    }

    pub fn describe_cluster_calls(&self) -> usize {
        self.state.lock().describe_cluster_calls
    }
}

#[async_trait::async_trait]
impl RemoteControlClient for FakeClient {
    async fn describe_cluster(&self) -> Result<(), RemoteError> {
        let mut state = self.state.lock();
        state.describe_cluster_calls += 1;
        match state.cluster_error.clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn describe_task_status(&self, remote_id: &str) -> Result<String, RemoteError> {
        let mut state = self.state.lock();
        state.describe_task_calls += 1;
        if let Some(err) = state.query_error.clone() {
            return Err(err);
        }
        if let Some(left) = state.stopping.get_mut(remote_id) {
            if *left == 0 {
                return Ok("STOPPED".to_string());
            }
            *left -= 1;
            return Ok("STOPPING".to_string());
        }
        state
            .statuses
            .get(remote_id)
            .cloned()
            .ok_or_else(|| RemoteError::MalformedResponse(format!("no task {}", remote_id)))
    }

    async fn launch(&self, _config: &TaskConfig) -> Result<String, RemoteError> {
        let delay = self.state.lock().launch_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let mut state = self.state.lock();
        if let Some(err) = state.launch_error.clone() {
            return Err(err);
        }
        state.launched += 1;
        let arn = format!("arn-{}", state.launched);
        state.statuses.insert(arn.clone(), "RUNNING".to_string());
        Ok(arn)
    }

    async fn terminate(&self, remote_id: &str) -> Result<(), RemoteError> {
        let mut state = self.state.lock();
        state.terminated.push(remote_id.to_string());
        let delay = state.stop_delay_polls;
        state.stopping.insert(remote_id.to_string(), delay);
        Ok(())
    }
}

pub fn driver_config() -> DriverConfig {
    DriverConfig {
        enabled: true,
        cluster: "test-cluster".to_string(),
        region: Some("us-east-1".to_string()),
        poll_interval_secs: 5,
        fingerprint_period_secs: 30,
        aws_path: "aws".to_string(),
    }
}

pub fn driver(client: Arc<FakeClient>) -> Driver {
    Driver::new(driver_config(), client, TaskRegistry::new())
}

pub fn task_config() -> TaskConfig {
    TaskConfig {
        task: EcsTaskConfig {
            launch_type: Some(LaunchType::Fargate),
            task_definition: "web:1".to_string(),
            network_configuration: None,
        },
    }
}

pub fn request(id: &str) -> TaskRequest {
    TaskRequest {
        id: TaskId::from(id),
        name: format!("{}-name", id),
        log_path: None,
        config: task_config(),
    }
}
