use tiered_core::types::Destination;
use tracing::debug;

use crate::{DecisionContext, PlacementStrategy};

/// Periodic offload: every `count_threshold`-th task goes to the cloud.
///
/// The counter is incremented first; when it reaches the threshold it is
/// reset and the task is offloaded. With a threshold of 3 this yields
/// `edge, edge, cloud, edge, edge, cloud, ...`.
pub struct CountStrategy;

impl PlacementStrategy for CountStrategy {
    fn choose(&self, ctx: &mut DecisionContext<'_>) -> Destination {
        *ctx.edge_counter += 1;
        if *ctx.edge_counter >= ctx.config.count_threshold {
            debug!(
                "count strategy: counter reached {}, offloading",
                ctx.config.count_threshold
            );
            *ctx.edge_counter = 0;
            Destination::Cloud
        } else {
            Destination::Edge
        }
    }

    fn name(&self) -> &str {
        "count"
    }
}
