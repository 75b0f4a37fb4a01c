pub mod clock;
pub mod config;
pub mod device;
pub mod error;
pub mod executor;
pub mod model;
pub mod sampler;
pub mod task;
pub mod types;

pub use clock::{Clock, ManualClock};
pub use config::{BalancerConfig, DecisionMode, TieredConfig};
pub use device::Device;
pub use error::{CoreError, ExecutionError};
pub use executor::{Execution, Executor};
pub use model::{Layer, LayerKind, Model};
pub use sampler::{FixedLoad, LoadSampler};
pub use task::{ResultHandle, Task, TaskInput};
pub use types::{Destination, DeviceId, Placement, TaskId, Timestamp};
