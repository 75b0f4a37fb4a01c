use std::collections::HashMap;

use parking_lot::Mutex;

use crate::types::DeviceId;

/// Samples the instantaneous load (percent) of a device.
///
/// Implementations may return values outside `[0, 100]`; the device clamps.
pub trait LoadSampler: Send + Sync {
    fn sample(&self, device_id: &DeviceId) -> f64;
}

/// Sampler returning preset loads, settable at runtime.
#[derive(Debug, Default)]
pub struct FixedLoad {
    default_load: f64,
    overrides: Mutex<HashMap<DeviceId, f64>>,
}

impl FixedLoad {
    pub fn new(default_load: f64) -> Self {
        Self {
            default_load,
            overrides: Mutex::new(HashMap::new()),
        }
    }

    pub fn with(self, device_id: impl Into<DeviceId>, load: f64) -> Self {
        self.set(device_id, load);
        self
    }

    pub fn set(&self, device_id: impl Into<DeviceId>, load: f64) {
        self.overrides.lock().insert(device_id.into(), load);
    }
}

impl LoadSampler for FixedLoad {
    fn sample(&self, device_id: &DeviceId) -> f64 {
        self.overrides
            .lock()
            .get(device_id)
            .copied()
            .unwrap_or(self.default_load)
    }
}
