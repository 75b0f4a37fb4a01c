use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;
use crate::types::{Destination, DeviceId, TaskId, Timestamp};

/// Opaque inference input. Only its shape is ever inspected.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskInput {
    pub data: String,
    pub size: [u32; 3],
}

impl Default for TaskInput {
    fn default() -> Self {
        Self {
            data: String::new(),
            size: [224, 224, 3],
        }
    }
}

/// Handle to the result produced by an executor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResultHandle {
    pub status: String,
    pub source: Destination,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<DeviceId>,
}

impl ResultHandle {
    pub fn completed(source: Destination, device: Option<DeviceId>) -> Self {
        Self {
            status: "completed".to_string(),
            source,
            device,
        }
    }
}

/// Fields filled in once the task has been executed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskOutcome {
    pub result: ResultHandle,
    pub execution_time: f64,
    pub source: Destination,
}

/// A unit of inference work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub input: TaskInput,
    pub created_at: Timestamp,
    /// Seconds from `created_at`. `None` means no deadline.
    pub deadline: Option<f64>,
    pub sensitive: bool,
    outcome: Option<TaskOutcome>,
}

impl Task {
    pub fn new(
        input: TaskInput,
        created_at: Timestamp,
        deadline: Option<f64>,
        sensitive: bool,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            input,
            created_at,
            deadline,
            sensitive,
            outcome: None,
        }
    }

    /// Sensitive tasks must never leave the edge.
    pub fn is_sensitive(&self) -> bool {
        self.sensitive
    }

    pub fn has_missed_deadline(&self, now: Timestamp) -> bool {
        match self.deadline {
            Some(deadline) => now > self.created_at + deadline,
            None => false,
        }
    }

    /// Seconds left before the deadline (negative once missed).
    pub fn remaining_time(&self, now: Timestamp) -> Option<f64> {
        self.deadline.map(|deadline| self.created_at + deadline - now)
    }

    /// Record the execution result. A task is executed at most once.
    pub fn record_execution(
        &mut self,
        result: ResultHandle,
        execution_time: f64,
        source: Destination,
    ) -> Result<(), CoreError> {
        if self.outcome.is_some() {
            return Err(CoreError::AlreadyExecuted { task_id: self.id });
        }
        self.outcome = Some(TaskOutcome {
            result,
            execution_time,
            source,
        });
        Ok(())
    }

    pub fn outcome(&self) -> Option<&TaskOutcome> {
        self.outcome.as_ref()
    }

    pub fn is_completed(&self) -> bool {
        self.outcome.is_some()
    }
}

impl std::fmt::Display for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = if self.is_completed() { "completed" } else { "pending" };
        let sensitivity = if self.sensitive { "sensitive" } else { "non-sensitive" };
        write!(f, "Task({}, {}, {})", self.id, status, sensitivity)
    }
}
