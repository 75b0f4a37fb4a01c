use std::sync::Arc;

use tiered_core::config::BalancerConfig;
use tiered_core::device::Device;
use tiered_core::model::{self, Model};
use tiered_core::sampler::{FixedLoad, LoadSampler};
use tiered_core::task::{Task, TaskInput};

pub const NOW: f64 = 1_000.0;

/// Root device at the given load with `subordinates` edge devices at 0%.
pub fn make_root(load: f64) -> (Arc<FixedLoad>, Device) {
    let sampler = Arc::new(FixedLoad::new(0.0).with("root", load));
    let root = Device::root("root", 1.4, 4, sampler.clone() as Arc<dyn LoadSampler>);
    (sampler, root)
}

/// Root plus the three default edge devices (edge1 1.2x4, edge2 2.4x4, edge3 1.0x2).
pub fn make_cluster(sampler: Arc<FixedLoad>) -> Device {
    let dyn_sampler: Arc<dyn LoadSampler> = sampler;
    let mut root = Device::root("root", 1.4, 4, dyn_sampler.clone());
    for (id, speed, cores) in [("edge1", 1.2, 4), ("edge2", 2.4, 4), ("edge3", 1.0, 2)] {
        root.connect(Arc::new(Device::new(id, speed, cores, dyn_sampler.clone())))
            .unwrap();
    }
    root
}

pub fn with_model(mut root: Device, model: Model) -> Device {
    root.assign_model(Arc::new(model));
    root
}

pub fn alexnet_root(load: f64) -> Device {
    let (_, root) = make_root(load);
    with_model(root, model::alexnet())
}

/// Non-sensitive task created at `NOW` with the given deadline.
pub fn make_task(deadline: Option<f64>) -> Task {
    Task::new(TaskInput::default(), NOW, deadline, false)
}

pub fn make_sensitive_task(deadline: Option<f64>) -> Task {
    Task::new(TaskInput::default(), NOW, deadline, true)
}

pub fn config_with_counts(count_threshold: u32) -> BalancerConfig {
    BalancerConfig {
        count_threshold,
        ..Default::default()
    }
}
