pub mod client;
pub mod config;
pub mod driver;
pub mod error;
pub mod handle;
pub mod latch;
pub mod registry;
pub mod status_log;
pub mod supervisor;
pub mod task;

pub use client::RemoteControlClient;
pub use config::{DriverConfig, TaskConfig};
pub use driver::Driver;
pub use error::{DriverError, RemoteError};
pub use handle::{PersistableTaskState, TaskHandle};
pub use registry::TaskRegistry;
pub use supervisor::TaskSupervisor;
pub use task::{ExitOutcome, TaskId, TaskRequest, TaskState, TaskStatus};
