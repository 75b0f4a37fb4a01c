use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a compute device (e.g. `"root"`, `"edge1"`).
pub type DeviceId = String;

pub type TaskId = Uuid;

/// Seconds since the UNIX epoch, or since the start of a simulated run.
pub type Timestamp = f64;

/// Where a task ends up being executed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    Edge,
    Cloud,
}

/// Outcome of a vertical placement decision.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    Edge,
    Cloud,
    /// The task's deadline has already passed; it is not dispatched.
    Skip,
}

impl Placement {
    pub const ALL: [Placement; 3] = [Placement::Edge, Placement::Cloud, Placement::Skip];

    /// The execution destination, or `None` for a skipped task.
    pub fn destination(self) -> Option<Destination> {
        match self {
            Placement::Edge => Some(Destination::Edge),
            Placement::Cloud => Some(Destination::Cloud),
            Placement::Skip => None,
        }
    }
}

impl From<Destination> for Placement {
    fn from(destination: Destination) -> Self {
        match destination {
            Destination::Edge => Placement::Edge,
            Destination::Cloud => Placement::Cloud,
        }
    }
}

// --- Display implementations ---

impl std::fmt::Display for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Destination::Edge => write!(f, "edge"),
            Destination::Cloud => write!(f, "cloud"),
        }
    }
}

impl std::fmt::Display for Placement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Placement::Edge => write!(f, "edge"),
            Placement::Cloud => write!(f, "cloud"),
            Placement::Skip => write!(f, "skip"),
        }
    }
}
