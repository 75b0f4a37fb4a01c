pub mod count;
pub mod cpu;
pub mod deadline;
pub mod horizontal;
pub mod quality;
pub mod stats;
pub mod vertical;
pub mod weighted;

#[cfg(test)]
pub(crate) mod tests_common;

use tiered_core::config::BalancerConfig;
use tiered_core::device::Device;
use tiered_core::task::Task;
use tiered_core::types::Destination;

/// Everything a strategy may read or mutate while choosing a destination.
///
/// The vertical balancer builds one per decision while holding its state
/// lock, so `edge_counter` updates never interleave across tasks.
pub struct DecisionContext<'a> {
    pub task: &'a Task,
    pub root: &'a Device,
    pub config: &'a BalancerConfig,
    /// Edge placements since the last offload.
    pub edge_counter: &'a mut u32,
}

/// Trait for edge/cloud placement strategies.
pub trait PlacementStrategy: Send + Sync {
    /// Choose between edge and cloud for a task that is neither sensitive
    /// nor expired.
    fn choose(&self, ctx: &mut DecisionContext<'_>) -> Destination;

    /// Name of the strategy.
    fn name(&self) -> &str;
}

pub use count::CountStrategy;
pub use cpu::CpuStrategy;
pub use deadline::DeadlineStrategy;
pub use horizontal::{
    HorizontalBalancer, LayerAssignment, LayerSplit, ParameterRange, PowerShare, PowerShares,
};
pub use quality::{DestinationQuality, QualityTracker};
pub use stats::{DecisionStatistics, PlacementShare, StatisticsReport};
pub use vertical::{strategy_for, VerticalBalancer};
pub use weighted::{WeightedScore, WeightedStrategy};
