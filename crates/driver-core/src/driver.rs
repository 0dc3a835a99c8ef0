use crate::client::RemoteControlClient;
use crate::config::{DriverConfig, MIN_PERIOD_SECS};
use crate::error::DriverError;
use crate::handle::{PersistableTaskState, TaskHandle};
use crate::registry::TaskRegistry;
use crate::supervisor::TaskSupervisor;
use crate::task::{ExitOutcome, TaskId, TaskRequest, TaskResourceUsage, TaskStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Stop signal that ends supervision without terminating the remote task.
pub const DETACH_SIGNAL: &str = "DETACH";

/// Fingerprint attribute reporting whether the remote service is usable.
pub const DRIVER_ATTRIBUTE: &str = "driver.ecs";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Capabilities {
    pub send_signals: bool,
    pub exec: bool,
    pub remote_tasks: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    Undetected,
    Unhealthy,
    Healthy,
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthState::Undetected => write!(f, "undetected"),
            HealthState::Unhealthy => write!(f, "unhealthy"),
            HealthState::Healthy => write!(f, "healthy"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Fingerprint {
    pub health: HealthState,
    pub description: String,
    pub attributes: BTreeMap<String, String>,
}

/// Coordinates supervisors for every task delegated to the remote service.
///
/// The registry is injected so independent drivers never share tasks.
pub struct Driver {
    config: DriverConfig,
    client: Arc<dyn RemoteControlClient>,
    tasks: TaskRegistry,
    shutdown: CancellationToken,
}

impl Driver {
    pub fn new(
        config: DriverConfig,
        client: Arc<dyn RemoteControlClient>,
        tasks: TaskRegistry,
    ) -> Self {
        if let Err(e) = config.validate() {
            warn!("{}; using the {}s minimum instead", e, MIN_PERIOD_SECS);
        }
        Self {
            config,
            client,
            tasks,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.tasks
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            send_signals: false,
            exec: false,
            remote_tasks: true,
        }
    }

    /// Launch a remote task and begin supervising it. Returns as soon as the
    /// launch request is accepted.
    pub async fn start(&self, request: TaskRequest) -> Result<TaskHandle, DriverError> {
        if !self.config.enabled {
            return Err(DriverError::Disabled);
        }
        if self.tasks.contains(&request.id) {
            return Err(DriverError::AlreadyExists(request.id));
        }
        request.config.validate()?;

        info!(
            "Starting task {} from task definition {}",
            request.id, request.config.task.task_definition
        );
        let arn = self
            .client
            .launch(&request.config)
            .await
            .map_err(DriverError::RemoteLaunch)?;

        let state = PersistableTaskState {
            task: request.clone(),
            arn: arn.clone(),
            started_at: Utc::now(),
        };
        info!("Task {} started as remote task {}", request.id, arn);

        let mut handle = TaskHandle::new(request.clone());
        if let Err(e) = handle.set_driver_state(&state) {
            error!("Failed to set driver state for task {}: {}", request.id, e);
            self.abandon_launch(&request.id, &arn).await;
            return Err(e);
        }

        let supervisor = self.supervisor_for(request.clone(), arn.clone(), state.started_at);
        if !self.tasks.insert_if_absent(request.id.clone(), Arc::clone(&supervisor)) {
            warn!("Task {} was started concurrently; abandoning {}", request.id, arn);
            self.abandon_launch(&request.id, &arn).await;
            return Err(DriverError::AlreadyExists(request.id));
        }
        supervisor.spawn();

        Ok(handle)
    }

    /// Resume supervision of a task from its persisted handle. Never launches
    /// anything; recovering an already registered task is a no-op.
    pub fn recover(&self, handle: &TaskHandle) -> Result<(), DriverError> {
        let task_id = handle.task_id();
        info!("Recovering task {} (handle version {})", task_id, handle.version);

        if self.tasks.contains(task_id) {
            info!("No task to recover; task {} already exists", task_id);
            return Ok(());
        }

        let state: PersistableTaskState = handle.get_driver_state().map_err(|e| {
            error!("Failed to decode task state for {}: {}", task_id, e);
            e
        })?;

        let supervisor = self.supervisor_for(handle.config.clone(), state.arn.clone(), state.started_at);
        if self.tasks.insert_if_absent(task_id.clone(), Arc::clone(&supervisor)) {
            supervisor.spawn();
            info!(
                "Task {} recovered; remote task {} started at {}",
                task_id, state.arn, state.started_at
            );
        }
        Ok(())
    }

    /// Stream that yields the task's exit outcome once, then closes. Closes
    /// without a value if `cancel` fires or the driver shuts down first.
    pub fn wait(
        &self,
        task_id: &TaskId,
        cancel: CancellationToken,
    ) -> Result<mpsc::Receiver<ExitOutcome>, DriverError> {
        debug!("Wait called for task {}", task_id);
        let supervisor = self.lookup(task_id)?;
        let shutdown = self.shutdown.clone();
        let (tx, rx) = mpsc::channel(1);

        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = shutdown.cancelled() => return,
                _ = supervisor.completed() => {}
            }
            let Some(outcome) = supervisor.exit_outcome() else {
                return;
            };
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = shutdown.cancelled() => {}
                _ = tx.send(outcome) => {}
            }
        });

        Ok(rx)
    }

    /// Request a stop and wait up to `timeout` for the task to exit. On
    /// timeout the supervisor keeps working in the background.
    pub async fn stop(
        &self,
        task_id: &TaskId,
        timeout: Duration,
        signal: &str,
    ) -> Result<(), DriverError> {
        info!("Stopping task {} (timeout {:?}, signal {})", task_id, timeout, signal);
        let supervisor = self.lookup(task_id)?;

        let detach = signal == DETACH_SIGNAL;
        supervisor.request_stop(detach);

        if tokio::time::timeout(timeout, supervisor.completed()).await.is_err() {
            return Err(DriverError::Timeout {
                task_id: task_id.clone(),
                detach,
            });
        }

        info!("Task {} stopped (detach={})", task_id, detach);
        Ok(())
    }

    /// Stop the task if needed and, once it is terminal, forget it. The only
    /// way a task leaves the registry.
    pub async fn destroy(&self, task_id: &TaskId, force: bool) -> Result<(), DriverError> {
        info!("Destroying task {} (force={})", task_id, force);
        let supervisor = self.lookup(task_id)?;

        if supervisor.is_running() && !force {
            return Err(DriverError::StillRunning(task_id.clone()));
        }

        // A task that was detached stays detached; this only kills tasks
        // that never asked to detach.
        supervisor.request_stop(false);
        tokio::select! {
            _ = supervisor.completed() => {}
            _ = self.shutdown.cancelled() => {}
        }

        self.tasks.delete(task_id);
        info!("Task {} destroyed", task_id);
        Ok(())
    }

    pub fn inspect(&self, task_id: &TaskId) -> Result<TaskStatus, DriverError> {
        Ok(self.lookup(task_id)?.status())
    }

    /// Periodic usage samples. The driver cannot see inside a remote task, so
    /// every sample is zeroed.
    pub fn task_stats(
        &self,
        task_id: &TaskId,
        interval: Duration,
        cancel: CancellationToken,
    ) -> Result<mpsc::Receiver<TaskResourceUsage>, DriverError> {
        self.lookup(task_id)?;
        debug!("Sending stats for task {}", task_id);

        let shutdown = self.shutdown.clone();
        let task_id = task_id.clone();
        let (tx, rx) = mpsc::channel(1);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {}
                }
                if tx.send(TaskResourceUsage::placeholder()).await.is_err() {
                    break;
                }
            }
            debug!("Stopped sending stats for task {}", task_id);
        });

        Ok(rx)
    }

    /// Health reports: one immediately, then one per fingerprint period,
    /// until `cancel` fires, the driver shuts down or the receiver is dropped.
    pub fn fingerprint(&self, cancel: CancellationToken) -> mpsc::Receiver<Fingerprint> {
        let config = self.config.clone();
        let client = Arc::clone(&self.client);
        let shutdown = self.shutdown.clone();
        let period = config.fingerprint_period();
        let (tx, rx) = mpsc::channel(1);

        tokio::spawn(async move {
            let mut delay = Duration::ZERO;
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = shutdown.cancelled() => return,
                    _ = tokio::time::sleep(delay) => {}
                }
                delay = period;

                let fingerprint = build_fingerprint(&config, client.as_ref()).await;
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = shutdown.cancelled() => return,
                    sent = tx.send(fingerprint) => {
                        if sent.is_err() {
                            return;
                        }
                    }
                }
            }
        });

        rx
    }

    pub fn signal_task(&self, _task_id: &TaskId, _signal: &str) -> Result<(), DriverError> {
        Err(DriverError::Unsupported("ECS driver does not support signals"))
    }

    pub fn exec_task(
        &self,
        _task_id: &TaskId,
        _cmd: &[String],
        _timeout: Duration,
    ) -> Result<(), DriverError> {
        Err(DriverError::Unsupported("ECS driver does not support exec"))
    }

    /// Stop every polling loop and stream. Remote tasks are left running.
    pub fn shutdown(&self) {
        info!("Driver shutting down");
        self.shutdown.cancel();
    }

    fn lookup(&self, task_id: &TaskId) -> Result<Arc<TaskSupervisor>, DriverError> {
        self.tasks
            .get(task_id)
            .ok_or_else(|| DriverError::TaskNotFound(task_id.clone()))
    }

    fn supervisor_for(
        &self,
        request: TaskRequest,
        arn: String,
        started_at: DateTime<Utc>,
    ) -> Arc<TaskSupervisor> {
        TaskSupervisor::new(
            request,
            arn,
            started_at,
            Arc::clone(&self.client),
            self.config.poll_interval(),
            self.shutdown.clone(),
        )
    }

    /// Terminate a remote task that was launched but will not be supervised.
    async fn abandon_launch(&self, task_id: &TaskId, arn: &str) {
        if let Err(e) = self.client.terminate(arn).await {
            error!(
                "Failed to terminate abandoned remote task {} for {}: {}",
                arn, task_id, e
            );
        }
    }
}

/// One health report for the remote dependency.
pub async fn build_fingerprint(
    config: &DriverConfig,
    client: &dyn RemoteControlClient,
) -> Fingerprint {
    let mut attributes = BTreeMap::new();
    if !config.enabled {
        return Fingerprint {
            health: HealthState::Undetected,
            description: "disabled".to_string(),
            attributes,
        };
    }

    match client.describe_cluster().await {
        Ok(()) => {
            attributes.insert(DRIVER_ATTRIBUTE.to_string(), "true".to_string());
            Fingerprint {
                health: HealthState::Healthy,
                description: "Healthy".to_string(),
                attributes,
            }
        }
        Err(e) => {
            attributes.insert(DRIVER_ATTRIBUTE.to_string(), "false".to_string());
            Fingerprint {
                health: HealthState::Unhealthy,
                description: e.to_string(),
                attributes,
            }
        }
    }
}
