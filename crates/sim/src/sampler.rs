use std::collections::HashMap;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sysinfo::System;
use tracing::debug;

use tiered_core::sampler::LoadSampler;
use tiered_core::types::DeviceId;

/// Samples the host's global CPU usage. Every simulated device sees the
/// same host, so the device id is ignored.
pub struct SystemLoadSampler {
    sys: Mutex<System>,
}

impl SystemLoadSampler {
    pub fn new() -> Self {
        let mut sys = System::new();
        sys.refresh_cpu_usage();
        Self {
            sys: Mutex::new(sys),
        }
    }
}

impl Default for SystemLoadSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadSampler for SystemLoadSampler {
    fn sample(&self, device_id: &DeviceId) -> f64 {
        let mut sys = self.sys.lock();
        sys.refresh_cpu_usage();
        let load = sys.global_cpu_usage() as f64;
        debug!("Host CPU for {}: {:.1}%", device_id, load);
        load
    }
}

/// Max change in load between two samples of the same device.
const MAX_STEP_PCT: f64 = 10.0;

/// Seeded random walk per device, for reproducible runs.
pub struct SyntheticLoadSampler {
    inner: Mutex<SyntheticState>,
}

struct SyntheticState {
    rng: StdRng,
    loads: HashMap<DeviceId, f64>,
}

impl SyntheticLoadSampler {
    pub fn new(seed: u64) -> Self {
        Self {
            inner: Mutex::new(SyntheticState {
                rng: StdRng::seed_from_u64(seed),
                loads: HashMap::new(),
            }),
        }
    }
}

impl LoadSampler for SyntheticLoadSampler {
    fn sample(&self, device_id: &DeviceId) -> f64 {
        let mut state = self.inner.lock();
        let SyntheticState { rng, loads } = &mut *state;

        let load = match loads.get(device_id) {
            Some(&prev) => (prev + rng.gen_range(-MAX_STEP_PCT..=MAX_STEP_PCT)).clamp(0.0, 100.0),
            None => rng.gen_range(10.0..60.0),
        };
        loads.insert(device_id.clone(), load);
        load
    }
}
