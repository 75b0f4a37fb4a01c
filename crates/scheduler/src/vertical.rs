use std::sync::Arc;

use parking_lot::Mutex;
use tiered_core::config::{BalancerConfig, DecisionMode};
use tiered_core::device::Device;
use tiered_core::task::Task;
use tiered_core::types::{Destination, Placement, Timestamp};
use tracing::debug;

use crate::quality::QualityTracker;
use crate::stats::{DecisionStatistics, StatisticsReport};
use crate::{
    CountStrategy, CpuStrategy, DeadlineStrategy, DecisionContext, PlacementStrategy,
    WeightedStrategy,
};

static CPU: CpuStrategy = CpuStrategy;
static DEADLINE: DeadlineStrategy = DeadlineStrategy;
static COUNT: CountStrategy = CountStrategy;
static WEIGHTED: WeightedStrategy = WeightedStrategy;

pub fn strategy_for(mode: DecisionMode) -> &'static dyn PlacementStrategy {
    match mode {
        DecisionMode::Cpu => &CPU,
        DecisionMode::Deadline => &DEADLINE,
        DecisionMode::Count => &COUNT,
        DecisionMode::Weighted => &WEIGHTED,
    }
}

/// State mutated by decisions. Guarded by a single lock so the counter's
/// compare-then-reset and the statistics updates never interleave.
#[derive(Debug, Default)]
struct BalancerState {
    edge_counter: u32,
    decisions: DecisionStatistics,
    quality: QualityTracker,
}

/// Decides per task whether it runs at the edge, in the cloud, or not at all.
///
/// Precedence: sensitive tasks always stay at the edge, then tasks past their
/// deadline are skipped, then the selected strategy picks edge or cloud.
pub struct VerticalBalancer {
    root: Arc<Device>,
    config: BalancerConfig,
    state: Mutex<BalancerState>,
}

impl VerticalBalancer {
    pub fn new(root: Arc<Device>, config: BalancerConfig) -> Self {
        Self {
            root,
            config,
            state: Mutex::new(BalancerState::default()),
        }
    }

    pub fn config(&self) -> &BalancerConfig {
        &self.config
    }

    pub fn root(&self) -> &Arc<Device> {
        &self.root
    }

    /// Decide using the configured default mode.
    pub fn decide_default(&self, task: &Task, now: Timestamp) -> Placement {
        self.decide(task, now, self.config.mode)
    }

    pub fn decide(&self, task: &Task, now: Timestamp, mode: DecisionMode) -> Placement {
        self.decide_with(task, now, Some(strategy_for(mode)))
    }

    /// Decide with a strategy given by name. Unknown names fall back to the
    /// edge rather than dropping the task.
    pub fn decide_by_name(&self, task: &Task, now: Timestamp, mode: &str) -> Placement {
        match mode.parse::<DecisionMode>() {
            Ok(mode) => self.decide(task, now, mode),
            Err(_) => {
                debug!("Unknown decision mode '{}', defaulting to edge", mode);
                self.decide_with(task, now, None)
            }
        }
    }

    fn decide_with(
        &self,
        task: &Task,
        now: Timestamp,
        strategy: Option<&dyn PlacementStrategy>,
    ) -> Placement {
        let mut state = self.state.lock();

        let placement = if task.is_sensitive() {
            Placement::Edge
        } else if task.has_missed_deadline(now) {
            Placement::Skip
        } else {
            match strategy {
                Some(strategy) => {
                    let BalancerState { edge_counter, .. } = &mut *state;
                    let mut ctx = DecisionContext {
                        task,
                        root: &self.root,
                        config: &self.config,
                        edge_counter,
                    };
                    Placement::from(strategy.choose(&mut ctx))
                }
                None => Placement::Edge,
            }
        };

        state.decisions.record(placement);
        debug!(
            "Task {} -> {} (strategy={}, sensitive={})",
            task.id,
            placement,
            strategy.map(|s| s.name()).unwrap_or("none"),
            task.is_sensitive()
        );
        placement
    }

    /// Record how an executed task went.
    pub fn record_outcome(
        &self,
        destination: Destination,
        execution_time: f64,
        deadline_missed: bool,
    ) {
        self.state
            .lock()
            .quality
            .record(destination, execution_time, deadline_missed);
    }

    /// Record a failure reported by an execution collaborator. Does not
    /// influence later decisions.
    pub fn record_failure(&self, destination: Destination) {
        self.state.lock().quality.record_failure(destination);
    }

    pub fn statistics(&self) -> StatisticsReport {
        self.state.lock().decisions.report()
    }

    pub fn quality(&self) -> QualityTracker {
        self.state.lock().quality
    }

    /// Edge placements since the last offload (count and weighted modes).
    pub fn edge_counter(&self) -> u32 {
        self.state.lock().edge_counter
    }
}

impl std::fmt::Debug for VerticalBalancer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerticalBalancer")
            .field("root", self.root.id())
            .field("config", &self.config)
            .finish()
    }
}
