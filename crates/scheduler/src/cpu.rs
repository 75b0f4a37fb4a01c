use tiered_core::types::Destination;
use tracing::debug;

use crate::{DecisionContext, PlacementStrategy};

/// Offloads when the root device's load exceeds `cpu_threshold`.
pub struct CpuStrategy;

impl PlacementStrategy for CpuStrategy {
    fn choose(&self, ctx: &mut DecisionContext<'_>) -> Destination {
        let load = ctx.root.refresh_load();
        let destination = if load > ctx.config.cpu_threshold {
            Destination::Cloud
        } else {
            Destination::Edge
        };
        debug!(
            "cpu strategy: load {:.1}% vs threshold {:.1}% -> {}",
            load, ctx.config.cpu_threshold, destination
        );
        destination
    }

    fn name(&self) -> &str {
        "cpu"
    }
}
