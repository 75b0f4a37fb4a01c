use serde::Serialize;
use tiered_core::types::Placement;

/// Count and share of one placement outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PlacementShare {
    pub count: u64,
    /// Percentage of all decisions, 0 when nothing has been decided yet.
    pub percentage: f64,
}

/// Snapshot of the decision counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StatisticsReport {
    pub edge: PlacementShare,
    pub cloud: PlacementShare,
    pub skip: PlacementShare,
    pub total: u64,
}

impl StatisticsReport {
    pub fn get(&self, placement: Placement) -> &PlacementShare {
        match placement {
            Placement::Edge => &self.edge,
            Placement::Cloud => &self.cloud,
            Placement::Skip => &self.skip,
        }
    }
}

/// Running count of decisions per outcome.
#[derive(Debug, Clone, Default)]
pub struct DecisionStatistics {
    edge: u64,
    cloud: u64,
    skip: u64,
}

impl DecisionStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, placement: Placement) {
        match placement {
            Placement::Edge => self.edge += 1,
            Placement::Cloud => self.cloud += 1,
            Placement::Skip => self.skip += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.edge + self.cloud + self.skip
    }

    pub fn report(&self) -> StatisticsReport {
        let total = self.total();
        let share = |count: u64| PlacementShare {
            count,
            percentage: if total == 0 {
                0.0
            } else {
                count as f64 / total as f64 * 100.0
            },
        };

        StatisticsReport {
            edge: share(self.edge),
            cloud: share(self.cloud),
            skip: share(self.skip),
            total,
        }
    }
}
