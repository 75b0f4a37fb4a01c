use serde::Serialize;
use tiered_core::types::Destination;

/// Running execution quality for one destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DestinationQuality {
    pub count: u64,
    pub avg_execution_time: f64,
    pub missed_deadlines: u64,
    /// Executions the collaborator reported as failed. Not part of `count`.
    pub failures: u64,
}

impl DestinationQuality {
    fn record(&mut self, execution_time: f64, deadline_missed: bool) {
        self.count += 1;
        self.avg_execution_time += (execution_time - self.avg_execution_time) / self.count as f64;
        if deadline_missed {
            self.missed_deadlines += 1;
        }
    }

    /// Percentage of recorded executions that missed their deadline.
    pub fn miss_rate(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.missed_deadlines as f64 / self.count as f64 * 100.0
        }
    }
}

/// Per-destination outcome averages, used to evaluate strategies after the
/// fact. Both destinations are tracked from construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct QualityTracker {
    pub edge: DestinationQuality,
    pub cloud: DestinationQuality,
}

impl QualityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, destination: Destination, execution_time: f64, deadline_missed: bool) {
        self.get_mut(destination).record(execution_time, deadline_missed);
    }

    pub fn record_failure(&mut self, destination: Destination) {
        self.get_mut(destination).failures += 1;
    }

    pub fn get(&self, destination: Destination) -> &DestinationQuality {
        match destination {
            Destination::Edge => &self.edge,
            Destination::Cloud => &self.cloud,
        }
    }

    fn get_mut(&mut self, destination: Destination) -> &mut DestinationQuality {
        match destination {
            Destination::Edge => &mut self.edge,
            Destination::Cloud => &mut self.cloud,
        }
    }
}
