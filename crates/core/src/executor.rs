use crate::error::ExecutionError;
use crate::task::{ResultHandle, Task};
use crate::types::Destination;

/// Result of running a task on one of the tiers.
#[derive(Debug, Clone, PartialEq)]
pub struct Execution {
    pub result: ResultHandle,
    pub duration_secs: f64,
}

/// Runs tasks on a destination tier.
pub trait Executor: Send + Sync {
    fn execute(&self, task: &Task) -> Result<Execution, ExecutionError>;

    /// Tier this executor runs work on.
    fn destination(&self) -> Destination;
}
