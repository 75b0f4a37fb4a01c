use tiered_core::types::Destination;
use tracing::debug;

use crate::{DecisionContext, PlacementStrategy};

/// Offloads tasks whose deadline is loose enough to absorb the network
/// round trip. Tasks without a deadline stay at the edge.
pub struct DeadlineStrategy;

impl PlacementStrategy for DeadlineStrategy {
    fn choose(&self, ctx: &mut DecisionContext<'_>) -> Destination {
        let destination = match ctx.task.deadline {
            Some(deadline) if deadline > ctx.config.deadline_threshold => Destination::Cloud,
            _ => Destination::Edge,
        };
        debug!(
            "deadline strategy: deadline {:?} vs threshold {}s -> {}",
            ctx.task.deadline, ctx.config.deadline_threshold, destination
        );
        destination
    }

    fn name(&self) -> &str {
        "deadline"
    }
}
