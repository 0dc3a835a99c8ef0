use crate::error::DriverError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Driver-wide configuration.
/// Loaded from ~/.config/ecs-driver/driver.yaml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DriverConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub cluster: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_fingerprint_period_secs")]
    pub fingerprint_period_secs: u64,
    #[serde(default = "default_aws_path")]
    pub aws_path: String,
}

/// Floor for both polling periods; a zero period would spin.
pub const MIN_PERIOD_SECS: u64 = 1;

fn default_poll_interval_secs() -> u64 {
    5
}

fn default_fingerprint_period_secs() -> u64 {
    30
}

fn default_aws_path() -> String {
    "aws".to_string()
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            cluster: String::new(),
            region: None,
            poll_interval_secs: default_poll_interval_secs(),
            fingerprint_period_secs: default_fingerprint_period_secs(),
            aws_path: default_aws_path(),
        }
    }
}

impl DriverConfig {
    /// Load config from the default path, or the disabled default if absent.
    pub fn load_default() -> anyhow::Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: DriverConfig = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("/etc"))
            .join("ecs-driver")
            .join("driver.yaml")
    }

    pub fn validate(&self) -> Result<(), DriverError> {
        if self.poll_interval_secs < MIN_PERIOD_SECS {
            return Err(DriverError::Validation(format!(
                "poll_interval_secs must be at least {}",
                MIN_PERIOD_SECS
            )));
        }
        if self.fingerprint_period_secs < MIN_PERIOD_SECS {
            return Err(DriverError::Validation(format!(
                "fingerprint_period_secs must be at least {}",
                MIN_PERIOD_SECS
            )));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(MIN_PERIOD_SECS))
    }

    pub fn fingerprint_period(&self) -> Duration {
        Duration::from_secs(self.fingerprint_period_secs.max(MIN_PERIOD_SECS))
    }
}

/// Per-task driver configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskConfig {
    pub task: EcsTaskConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EcsTaskConfig {
    #[serde(default)]
    pub launch_type: Option<LaunchType>,
    #[serde(default)]
    pub task_definition: String,
    #[serde(default)]
    pub network_configuration: Option<NetworkConfiguration>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum LaunchType {
    Ec2,
    Fargate,
}

impl fmt::Display for LaunchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LaunchType::Ec2 => write!(f, "EC2"),
            LaunchType::Fargate => write!(f, "FARGATE"),
        }
    }
}

impl FromStr for LaunchType {
    type Err = DriverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EC2" => Ok(LaunchType::Ec2),
            "FARGATE" => Ok(LaunchType::Fargate),
            other => Err(DriverError::Validation(format!(
                "unknown launch type {:?} (expected EC2 or FARGATE)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NetworkConfiguration {
    #[serde(default)]
    pub aws_vpc_configuration: AwsVpcConfiguration,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AwsVpcConfiguration {
    #[serde(default)]
    pub assign_public_ip: bool,
    #[serde(default)]
    pub security_groups: Vec<String>,
    #[serde(default)]
    pub subnets: Vec<String>,
}

impl TaskConfig {
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: TaskConfig = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Structural checks run before anything is sent to the remote service.
    pub fn validate(&self) -> Result<(), DriverError> {
        let task = &self.task;
        if task.task_definition.trim().is_empty() {
            return Err(DriverError::Validation(
                "task_definition must not be empty".into(),
            ));
        }

        if let Some(ref network) = task.network_configuration {
            let vpc = &network.aws_vpc_configuration;
            if vpc.subnets.is_empty() {
                return Err(DriverError::Validation(
                    "aws_vpc_configuration requires at least one subnet".into(),
                ));
            }
            if vpc.subnets.iter().any(|s| s.trim().is_empty()) {
                return Err(DriverError::Validation("subnet entries must not be blank".into()));
            }
            if vpc.security_groups.iter().any(|s| s.trim().is_empty()) {
                return Err(DriverError::Validation(
                    "security group entries must not be blank".into(),
                ));
            }
        }

        Ok(())
    }
}
