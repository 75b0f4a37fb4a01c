use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info, warn};

use tiered_core::clock::{Clock, ManualClock};
use tiered_core::config::TieredConfig;
use tiered_core::error::CoreError;
use tiered_core::device::Device;
use tiered_core::executor::Executor;
use tiered_core::model::Model;
use tiered_core::sampler::LoadSampler;
use tiered_core::task::{Task, TaskInput};
use tiered_core::types::{Destination, Placement};
use tiered_scheduler::{
    HorizontalBalancer, LayerAssignment, QualityTracker, StatisticsReport, VerticalBalancer,
};

use crate::executor::{CloudService, EdgeExecutor};
use crate::monitor::{CpuPhase, MonitorStatistics, SystemMonitor};

/// Everything recorded for one experiment run.
#[derive(Debug, Clone, Serialize)]
pub struct ExperimentResult {
    pub mode: String,
    pub num_tasks: usize,
    pub model: Option<String>,
    pub layer_distribution: Vec<LayerAssignment>,
    pub vertical_balancer_stats: StatisticsReport,
    pub decision_quality: QualityTracker,
    pub system_stats: MonitorStatistics,
}

/// Orchestrates task creation, placement, execution and monitoring over a
/// simulated clock.
pub struct TieredSystem {
    config: TieredConfig,
    clock: Arc<ManualClock>,
    root: Arc<Device>,
    vertical: VerticalBalancer,
    horizontal: HorizontalBalancer,
    edge: EdgeExecutor,
    cloud: CloudService,
    monitor: SystemMonitor,
    rng: StdRng,
    realtime: bool,
}

impl TieredSystem {
    pub fn new(
        config: TieredConfig,
        sampler: Arc<dyn LoadSampler>,
        model: Option<Model>,
        seed: u64,
        realtime: bool,
    ) -> Result<Self> {
        config
            .vertical
            .validate()
            .context("invalid vertical balancer config")?;

        let devices = &config.devices;
        let mut root = Device::root(
            devices.root.id.clone(),
            devices.root.cpu_speed_ghz,
            devices.root.cores,
            sampler.clone(),
        );
        for edge in &devices.edges {
            let device =
                Device::new(edge.id.clone(), edge.cpu_speed_ghz, edge.cores, sampler.clone());
            if !root.connect(Arc::new(device))? {
                warn!("Duplicate device id {} ignored", edge.id);
            }
        }
        if let Some(model) = model {
            root.assign_model(Arc::new(model));
        }
        let root = Arc::new(root);

        let clock = Arc::new(ManualClock::new(0.0));
        let vertical = VerticalBalancer::new(root.clone(), config.vertical.clone());
        let horizontal = HorizontalBalancer::new(root.clone());
        let edge = EdgeExecutor::new(root.clone(), config.edge.clone());
        let cloud = CloudService::new(config.cloud.clone(), clock.clone(), seed.wrapping_add(1));

        info!(
            "System ready: root {} with {} edge devices, model {}",
            root.id(),
            root.subordinates().len(),
            root.model().map(|m| m.to_string()).unwrap_or_else(|| "none".into())
        );

        Ok(Self {
            config,
            clock,
            root,
            vertical,
            horizontal,
            edge,
            cloud,
            monitor: SystemMonitor::new(),
            rng: StdRng::seed_from_u64(seed),
            realtime,
        })
    }

    pub fn vertical(&self) -> &VerticalBalancer {
        &self.vertical
    }

    pub fn monitor(&self) -> &SystemMonitor {
        &self.monitor
    }

    /// Create a task at the current time with a random deadline and
    /// sensitivity drawn from the task generation config.
    pub fn create_task(&mut self) -> Task {
        let gen = &self.config.tasks;
        let deadline = if gen.max_deadline_secs > gen.min_deadline_secs {
            self.rng.gen_range(gen.min_deadline_secs..gen.max_deadline_secs)
        } else {
            gen.min_deadline_secs
        };
        let sensitive = self.rng.gen::<f64>() < gen.sensitive_ratio;
        let input = TaskInput {
            data: format!("random_image_data_{}", self.rng.gen_range(1000..10000)),
            ..Default::default()
        };

        Task::new(input, self.clock.now(), Some(deadline), sensitive)
    }

    /// Place and execute one task. Returns the placement decision.
    ///
    /// A task that already ran is rejected before any sampling or decision.
    pub async fn process_task(&mut self, task: &mut Task, mode: &str) -> Result<Placement> {
        if task.is_completed() {
            return Err(CoreError::AlreadyExecuted { task_id: task.id }.into());
        }

        let load = self.root.refresh_load();
        self.monitor
            .record_cpu_usage(self.root.id(), load, self.clock.now(), CpuPhase::BeforeTask);

        let placement = self.vertical.decide_by_name(task, self.clock.now(), mode);
        let Some(destination) = placement.destination() else {
            debug!("Skipping task {}: deadline already passed", task.id);
            return Ok(placement);
        };

        let executor: &dyn Executor = match destination {
            Destination::Edge => {
                if let Some(model) = self.root.model() {
                    let plan = self.horizontal.plan_model(model);
                    debug!("Edge plan for task {}: {} split layers", task.id, plan.len());
                }
                &self.edge
            }
            Destination::Cloud => &self.cloud,
        };
        let source = executor.destination();

        match executor.execute(task) {
            Ok(execution) => {
                self.wait(execution.duration_secs).await;
                let end = self.clock.now();
                let missed = task.has_missed_deadline(end);

                task.record_execution(execution.result, execution.duration_secs, source)?;
                self.monitor
                    .record_execution(task.id, execution.duration_secs, source, missed);
                self.vertical
                    .record_outcome(source, execution.duration_secs, missed);
            }
            Err(e) => {
                warn!("Task {} failed on {}: {}", task.id, source, e);
                self.monitor.record_failure();
                self.vertical.record_failure(source);
            }
        }

        let load = self.root.refresh_load();
        self.monitor
            .record_cpu_usage(self.root.id(), load, self.clock.now(), CpuPhase::AfterTask);

        Ok(placement)
    }

    /// Generate `num_tasks` tasks up front, then process them in order.
    pub async fn run_experiment(
        &mut self,
        num_tasks: usize,
        mode: &str,
    ) -> Result<ExperimentResult> {
        info!("Running experiment: {} tasks, mode {}", num_tasks, mode);

        let layer_distribution = match self.root.model() {
            Some(model) => self.horizontal.distribute_layers(model),
            None => Vec::new(),
        };

        let mut tasks: Vec<Task> = (0..num_tasks).map(|_| self.create_task()).collect();
        for task in &mut tasks {
            self.process_task(task, mode).await?;
        }

        let stats = self.vertical.statistics();
        info!(
            "Mode {}: edge {} / cloud {} / skip {}",
            mode, stats.edge.count, stats.cloud.count, stats.skip.count
        );

        Ok(ExperimentResult {
            mode: mode.to_string(),
            num_tasks,
            model: self.root.model().map(|m| m.name.clone()),
            layer_distribution,
            vertical_balancer_stats: stats,
            decision_quality: self.vertical.quality(),
            system_stats: self.monitor.statistics(),
        })
    }

    /// Advance simulated time, optionally sleeping for real.
    async fn wait(&self, secs: f64) {
        if self.realtime && secs > 0.0 {
            tokio::time::sleep(Duration::from_secs_f64(secs)).await;
        }
        self.clock.advance(secs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiered_core::config::DecisionMode;
    use tiered_core::model;
    use tiered_core::sampler::FixedLoad;

    fn system(load: f64, config: TieredConfig) -> TieredSystem {
        let sampler = Arc::new(FixedLoad::new(load));
        TieredSystem::new(config, sampler, Some(model::alexnet()), 11, false).unwrap()
    }

    #[tokio::test]
    async fn test_sensitive_task_runs_at_edge() {
        let mut sys = system(100.0, TieredConfig::default());
        let mut task = Task::new(TaskInput::default(), 0.0, Some(5.0), true);

        let placement = sys.process_task(&mut task, "cpu").await.unwrap();
        assert_eq!(placement, Placement::Edge);
        assert_eq!(task.outcome().unwrap().source, Destination::Edge);
        assert_eq!(sys.vertical().quality().edge.count, 1);
    }

    #[tokio::test]
    async fn test_expired_task_is_not_executed() {
        let mut sys = system(0.0, TieredConfig::default());
        let mut task = Task::new(TaskInput::default(), -10.0, Some(1.0), false);

        let placement = sys.process_task(&mut task, "weighted").await.unwrap();
        assert_eq!(placement, Placement::Skip);
        assert!(!task.is_completed());
        assert_eq!(sys.monitor().total_tasks(), 0);
    }

    #[tokio::test]
    async fn test_cloud_failure_is_recorded_not_executed() {
        let mut config = TieredConfig::default();
        config.cloud.success_rate = 0.0;
        let mut sys = system(100.0, config);
        let mut task = Task::new(TaskInput::default(), 0.0, Some(5.0), false);

        let placement = sys.process_task(&mut task, "cpu").await.unwrap();
        assert_eq!(placement, Placement::Cloud);
        assert!(!task.is_completed());
        assert_eq!(sys.vertical().quality().cloud.failures, 1);
        assert_eq!(sys.monitor().statistics().deadline_performance.failed_tasks, 1);
    }

    #[tokio::test]
    async fn test_completed_task_is_rejected_without_side_effects() {
        let mut config = TieredConfig::default();
        config.vertical.count_threshold = 10;
        let mut sys = system(0.0, config);
        let mut task = Task::new(TaskInput::default(), 0.0, Some(5.0), false);

        let placement = sys.process_task(&mut task, "count").await.unwrap();
        assert_eq!(placement, Placement::Edge);
        let before = (
            sys.vertical().statistics(),
            sys.vertical().edge_counter(),
            sys.monitor().statistics(),
        );
        assert_eq!(before.0.total, 1);
        assert_eq!(before.1, 1);

        let err = sys.process_task(&mut task, "count").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CoreError>(),
            Some(CoreError::AlreadyExecuted { .. })
        ));

        assert_eq!(sys.vertical().statistics(), before.0);
        assert_eq!(sys.vertical().edge_counter(), before.1);
        assert_eq!(sys.monitor().statistics(), before.2);
        assert_eq!(sys.monitor().total_tasks(), 1);
    }

    #[tokio::test]
    async fn test_experiment_accounts_for_every_task() {
        let mut config = TieredConfig::default();
        config.vertical.count_threshold = 3;
        config.tasks.sensitive_ratio = 0.0;
        let mut sys = system(0.0, config);

        let result = sys
            .run_experiment(30, DecisionMode::Count.name())
            .await
            .unwrap();

        let stats = result.vertical_balancer_stats;
        assert_eq!(stats.total, 30);
        let quality = result.decision_quality;
        let failures = quality.edge.failures + quality.cloud.failures;
        assert_eq!(
            quality.edge.count + quality.cloud.count + failures,
            stats.edge.count + stats.cloud.count
        );
        assert_eq!(result.layer_distribution.len(), 4);
        assert_eq!(result.model.as_deref(), Some("AlexNet"));
    }

    #[tokio::test]
    async fn test_unknown_mode_runs_everything_at_edge() {
        let mut config = TieredConfig::default();
        config.tasks.min_deadline_secs = 1000.0;
        config.tasks.max_deadline_secs = 2000.0;
        let mut sys = system(100.0, config);

        let result = sys.run_experiment(10, "random").await.unwrap();
        assert_eq!(result.vertical_balancer_stats.edge.count, 10);
        assert_eq!(result.decision_quality.edge.count, 10);
    }
}
