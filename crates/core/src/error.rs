use thiserror::Error;

use crate::types::{DeviceId, TaskId};

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Config serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Task {task_id} has already been executed")]
    AlreadyExecuted { task_id: TaskId },

    #[error("Device {device_id}: {reason}")]
    InvalidDevice { device_id: DeviceId, reason: String },

    #[error("Unknown model: {0}")]
    UnknownModel(String),
}

/// Failure reported by an execution collaborator.
///
/// Recorded as-is by the decision-quality tracker; never interpreted.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExecutionError {
    #[error("Cloud service unavailable")]
    Unavailable,

    #[error("Execution failed: {0}")]
    Failed(String),
}
