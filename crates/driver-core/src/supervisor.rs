//! Per-task reconciliation between local intent and the remote task.
//!
//! A supervisor polls the remote service on a fixed interval while it is
//! monitoring. A stop request moves it to stopping, which either terminates
//! the remote task and polls until it reports stopped, or, when a detach was
//! requested, ends supervision and leaves the remote task alone. Query
//! failures and remote tasks that enter a terminal phase on their own end the
//! task with a failure outcome.

use crate::client::{is_terminal_phase, RemoteControlClient, STATUS_STOPPED};
use crate::error::DriverError;
use crate::latch::{CompletionLatch, StickyFlag};
use crate::status_log::StatusLog;
use crate::task::{
    ExitOutcome, TaskIdentity, TaskRequest, TaskState, TaskStatus, ARN_ATTRIBUTE,
};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Mutable part of a supervised task. Only touched under the supervisor's lock.
#[derive(Debug, Clone)]
struct SupervisionRecord {
    state: TaskState,
    exit: Option<ExitOutcome>,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    detach: StickyFlag,
}

/// What woke the reconciliation loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopEvent {
    Tick,
    StopRequested,
    Shutdown,
}

pub struct TaskSupervisor {
    identity: TaskIdentity,
    request: TaskRequest,
    client: Arc<dyn RemoteControlClient>,
    poll_interval: Duration,
    record: RwLock<SupervisionRecord>,
    stop: CancellationToken,
    shutdown: CancellationToken,
    completion: CompletionLatch,
    spawned: AtomicBool,
}

impl TaskSupervisor {
    /// Build a supervisor for a remote task that has already been launched.
    /// `shutdown` is the driver-wide token; cancelling it ends polling
    /// without touching the remote task.
    pub fn new(
        request: TaskRequest,
        remote_id: String,
        started_at: DateTime<Utc>,
        client: Arc<dyn RemoteControlClient>,
        poll_interval: Duration,
        shutdown: CancellationToken,
    ) -> Arc<Self> {
        Arc::new(Self {
            identity: TaskIdentity {
                local: request.id.clone(),
                remote: remote_id,
            },
            request,
            client,
            poll_interval,
            record: RwLock::new(SupervisionRecord {
                state: TaskState::Running,
                exit: None,
                started_at,
                completed_at: None,
                detach: StickyFlag::new(),
            }),
            stop: CancellationToken::new(),
            shutdown,
            completion: CompletionLatch::new(),
            spawned: AtomicBool::new(false),
        })
    }

    pub fn status(&self) -> TaskStatus {
        let record = self.record.read();
        let mut driver_attributes = BTreeMap::new();
        driver_attributes.insert(ARN_ATTRIBUTE.to_string(), self.identity.remote.clone());
        TaskStatus {
            id: self.request.id.clone(),
            name: self.request.name.clone(),
            state: record.state,
            started_at: record.started_at,
            completed_at: record.completed_at,
            exit: record.exit.clone(),
            driver_attributes,
        }
    }

    pub fn is_running(&self) -> bool {
        self.record.read().state == TaskState::Running
    }

    pub fn detach_requested(&self) -> bool {
        self.record.read().detach.is_set()
    }

    pub fn exit_outcome(&self) -> Option<ExitOutcome> {
        self.record.read().exit.clone()
    }

    /// Ask the loop to stop. A detach request is sticky: once made, later
    /// kill requests cannot bring back remote termination. Returns without
    /// waiting for the loop.
    ///
    /// Detach only counts until stopping has begun. Once the loop has chosen
    /// to terminate the remote task, a later detach request is recorded but
    /// the terminate still goes ahead.
    pub fn request_stop(&self, detach: bool) {
        {
            let mut record = self.record.write();
            if detach {
                record.detach.set();
            }
        }
        self.stop.cancel();
    }

    /// Resolves once the supervisor has reached its terminal state.
    pub async fn completed(&self) {
        self.completion.wait().await
    }

    pub fn is_complete(&self) -> bool {
        self.completion.is_fired()
    }

    /// Start the reconciliation loop. Only the first call spawns anything.
    pub fn spawn(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        if self.spawned.swap(true, Ordering::AcqRel) {
            return None;
        }
        let supervisor = Arc::clone(self);
        Some(tokio::spawn(async move { supervisor.run().await }))
    }

    async fn run(&self) {
        debug!(
            "Supervising task {} (remote {}) every {:?}",
            self.identity.local, self.identity.remote, self.poll_interval
        );

        let mut log = match StatusLog::open(self.request.log_path.as_deref()).await {
            Ok(log) => log,
            Err(e) => {
                self.finish(ExitOutcome::failure(format!(
                    "failed to open task log: {}",
                    e
                )));
                return;
            }
        };

        let outcome = self.supervise(&mut log).await;

        if let Err(e) = log.close().await {
            warn!(
                "Failed to close task log for {} correctly: {}",
                self.identity.local, e
            );
        }

        match outcome {
            Some(outcome) => self.finish(outcome),
            None => info!(
                "Driver shutting down; leaving remote task {} for task {} untouched",
                self.identity.remote, self.identity.local
            ),
        }
    }

    /// Drive the state machine. `None` means the driver shut down before a
    /// terminal state was reached.
    async fn supervise(&self, log: &mut StatusLog) -> Option<ExitOutcome> {
        loop {
            match self.next_event().await {
                LoopEvent::Shutdown => return None,
                LoopEvent::StopRequested => break,
                LoopEvent::Tick => {
                    let status = match self
                        .interruptible(self.client.describe_task_status(&self.identity.remote))
                        .await?
                    {
                        Ok(status) => status,
                        Err(e) => {
                            warn!(
                                "Lost track of remote task {} for task {}: {}",
                                self.identity.remote, self.identity.local, e
                            );
                            return Some(ExitOutcome::failure(format!(
                                "failed to find remote task: {}",
                                DriverError::RemoteQuery(e)
                            )));
                        }
                    };

                    // Recorded before the terminal check so the log shows the
                    // status that ended the task.
                    if let Err(e) = log.record(&self.identity.remote, &status).await {
                        warn!("Failed to write task log for {}: {}", self.identity.local, e);
                    }

                    if is_terminal_phase(&status) {
                        warn!(
                            "Remote task {} for task {} entered terminal phase {}",
                            self.identity.remote, self.identity.local, status
                        );
                        return Some(ExitOutcome::failure(format!(
                            "remote task status in terminal phase: {}",
                            status
                        )));
                    }
                    debug!(
                        "Remote task {} for task {} is {}",
                        self.identity.remote, self.identity.local, status
                    );
                }
            }
        }

        // Read once; the choice between detach and terminate is final here.
        if self.detach_requested() {
            info!(
                "Detaching from remote task {} for task {}",
                self.identity.remote, self.identity.local
            );
            return Some(ExitOutcome::success());
        }

        self.terminate_remote().await
    }

    /// Issue a single terminate request and wait for the remote task to
    /// report stopped.
    async fn terminate_remote(&self) -> Option<ExitOutcome> {
        info!(
            "Terminating remote task {} for task {}",
            self.identity.remote, self.identity.local
        );
        if let Err(e) = self
            .interruptible(self.client.terminate(&self.identity.remote))
            .await?
        {
            return Some(ExitOutcome::failure(format!(
                "failed to stop remote task correctly: {}",
                DriverError::RemoteTerminate(e)
            )));
        }

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => return None,
                _ = tokio::time::sleep(self.poll_interval) => {}
            }

            match self
                .interruptible(self.client.describe_task_status(&self.identity.remote))
                .await?
            {
                Ok(status) if status == STATUS_STOPPED => {
                    info!("Remote task {} has successfully been stopped", self.identity.remote);
                    return Some(ExitOutcome::success());
                }
                Ok(status) => debug!(
                    "Continuing to monitor shutdown of remote task {}: {}",
                    self.identity.remote, status
                ),
                Err(e) => {
                    return Some(ExitOutcome::failure(format!(
                        "failed to stop remote task correctly: {}",
                        DriverError::RemoteQuery(e)
                    )))
                }
            }
        }
    }

    async fn next_event(&self) -> LoopEvent {
        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => LoopEvent::Shutdown,
            _ = self.stop.cancelled() => LoopEvent::StopRequested,
            _ = tokio::time::sleep(self.poll_interval) => LoopEvent::Tick,
        }
    }

    /// Run a remote call unless the driver shuts down first.
    async fn interruptible<T>(&self, call: impl Future<Output = T>) -> Option<T> {
        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => None,
            result = call => Some(result),
        }
    }

    fn finish(&self, outcome: ExitOutcome) {
        {
            let mut record = self.record.write();
            if record.exit.is_some() {
                return;
            }
            info!("Task {} exited: {}", self.identity.local, outcome);
            record.state = TaskState::Exited;
            record.exit = Some(outcome);
            record.completed_at = Some(Utc::now());
        }
        self.completion.fire();
    }
}

impl std::fmt::Debug for TaskSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskSupervisor")
            .field("identity", &self.identity)
            .field("poll_interval", &self.poll_interval)
            .field("record", &*self.record.read())
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::{EcsTaskConfig, TaskConfig};
    use crate::error::RemoteError;
    use crate::task::TaskId;

    struct IdleClient;

    #[async_trait::async_trait]
    impl RemoteControlClient for IdleClient {
        async fn describe_cluster(&self) -> Result<(), RemoteError> {
            Ok(())
        }

        async fn describe_task_status(&self, _remote_id: &str) -> Result<String, RemoteError> {
            Ok("RUNNING".into())
        }

        async fn launch(&self, _config: &TaskConfig) -> Result<String, RemoteError> {
            Ok("arn-idle".into())
        }

        async fn terminate(&self, _remote_id: &str) -> Result<(), RemoteError> {
            Ok(())
        }
    }

    /// A supervisor whose loop has not been spawned.
    pub(crate) fn idle_supervisor(id: &str) -> Arc<TaskSupervisor> {
        let request = TaskRequest {
            id: TaskId::from(id),
            name: id.to_string(),
            log_path: None,
            config: TaskConfig {
                task: EcsTaskConfig {
                    launch_type: None,
                    task_definition: "idle:1".into(),
                    network_configuration: None,
                },
            },
        };
        TaskSupervisor::new(
            request,
            format!("arn-{}", id),
            Utc::now(),
            Arc::new(IdleClient),
            Duration::from_secs(5),
            CancellationToken::new(),
        )
    }

    #[test]
    fn test_new_supervisor_is_running() {
        let sup = idle_supervisor("t1");
        let status = sup.status();
        assert!(sup.is_running());
        assert_eq!(status.state, TaskState::Running);
        assert_eq!(status.exit, None);
        assert_eq!(status.completed_at, None);
        assert_eq!(status.arn(), Some("arn-t1"));
    }

    #[test]
    fn test_detach_request_is_sticky() {
        let sup = idle_supervisor("t1");
        sup.request_stop(true);
        sup.request_stop(false);
        assert!(sup.detach_requested());
    }

    #[test]
    fn test_finish_sets_outcome_once() {
        let sup = idle_supervisor("t1");
        sup.finish(ExitOutcome::failure("first"));
        sup.finish(ExitOutcome::success());

        assert!(sup.is_complete());
        assert!(!sup.is_running());
        assert_eq!(sup.exit_outcome(), Some(ExitOutcome::failure("first")));
        assert!(sup.status().completed_at.is_some());
    }

    #[tokio::test]
    async fn test_spawn_only_once() {
        let sup = idle_supervisor("t1");
        let handle = sup.spawn();
        assert!(handle.is_some());
        assert!(sup.spawn().is_none());

        sup.request_stop(true);
        handle.unwrap().await.unwrap();
        assert_eq!(sup.exit_outcome(), Some(ExitOutcome::success()));
    }
}
