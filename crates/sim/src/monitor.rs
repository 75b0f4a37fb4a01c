use serde::Serialize;

use tiered_core::types::{Destination, DeviceId, TaskId, Timestamp};

/// When a CPU sample was taken relative to task processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CpuPhase {
    BeforeTask,
    AfterTask,
}

#[derive(Debug, Clone, Serialize)]
pub struct CpuSample {
    pub device_id: DeviceId,
    pub cpu_usage: f64,
    pub timestamp: Timestamp,
    pub phase: CpuPhase,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExecutionRecord {
    pub task_id: TaskId,
    pub execution_time: f64,
    pub source: Destination,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CpuSummary {
    pub overall: f64,
    pub before_task: f64,
    pub after_task: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ExecutionSummary {
    pub overall: f64,
    pub edge: f64,
    pub cloud: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DeadlineSummary {
    pub total_tasks: u64,
    pub missed_deadlines: u64,
    pub miss_rate: f64,
    pub failed_tasks: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MonitorStatistics {
    pub cpu_usage: CpuSummary,
    pub execution_time: ExecutionSummary,
    pub deadline_performance: DeadlineSummary,
}

/// Records CPU samples and task executions over an experiment.
#[derive(Debug, Default)]
pub struct SystemMonitor {
    cpu_history: Vec<CpuSample>,
    executions: Vec<ExecutionRecord>,
    missed_deadlines: u64,
    failed_tasks: u64,
}

impl SystemMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_cpu_usage(
        &mut self,
        device_id: &DeviceId,
        cpu_usage: f64,
        timestamp: Timestamp,
        phase: CpuPhase,
    ) {
        self.cpu_history.push(CpuSample {
            device_id: device_id.clone(),
            cpu_usage,
            timestamp,
            phase,
        });
    }

    pub fn record_execution(
        &mut self,
        task_id: TaskId,
        execution_time: f64,
        source: Destination,
        deadline_missed: bool,
    ) {
        self.executions.push(ExecutionRecord {
            task_id,
            execution_time,
            source,
        });
        if deadline_missed {
            self.missed_deadlines += 1;
        }
    }

    pub fn record_failure(&mut self) {
        self.failed_tasks += 1;
    }

    pub fn total_tasks(&self) -> u64 {
        self.executions.len() as u64
    }

    pub fn average_cpu_usage(&self, device_id: Option<&str>, phase: Option<CpuPhase>) -> f64 {
        average(
            self.cpu_history
                .iter()
                .filter(|s| device_id.map_or(true, |id| s.device_id == id))
                .filter(|s| phase.map_or(true, |p| s.phase == p))
                .map(|s| s.cpu_usage),
        )
    }

    pub fn average_execution_time(&self, source: Option<Destination>) -> f64 {
        average(
            self.executions
                .iter()
                .filter(|e| source.map_or(true, |s| e.source == s))
                .map(|e| e.execution_time),
        )
    }

    /// Percentage of executed tasks that finished past their deadline.
    pub fn deadline_miss_rate(&self) -> f64 {
        let total = self.total_tasks();
        if total == 0 {
            0.0
        } else {
            self.missed_deadlines as f64 / total as f64 * 100.0
        }
    }

    pub fn statistics(&self) -> MonitorStatistics {
        MonitorStatistics {
            cpu_usage: CpuSummary {
                overall: self.average_cpu_usage(None, None),
                before_task: self.average_cpu_usage(None, Some(CpuPhase::BeforeTask)),
                after_task: self.average_cpu_usage(None, Some(CpuPhase::AfterTask)),
            },
            execution_time: ExecutionSummary {
                overall: self.average_execution_time(None),
                edge: self.average_execution_time(Some(Destination::Edge)),
                cloud: self.average_execution_time(Some(Destination::Cloud)),
            },
            deadline_performance: DeadlineSummary {
                total_tasks: self.total_tasks(),
                missed_deadlines: self.missed_deadlines,
                miss_rate: self.deadline_miss_rate(),
                failed_tasks: self.failed_tasks,
            },
        }
    }
}

fn average(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}
