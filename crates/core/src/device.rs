use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::error::CoreError;
use crate::model::Model;
use crate::sampler::LoadSampler;
use crate::types::DeviceId;

/// Clamp a sampled load percentage into `[0, 100]`. NaN reads as idle.
pub fn clamp_load(load: f64) -> f64 {
    if load.is_nan() {
        0.0
    } else {
        load.clamp(0.0, 100.0)
    }
}

/// Power of a device with the given capacity at a given load.
pub fn power_at(capacity_ghz: f64, cores: u32, load_pct: f64) -> f64 {
    (capacity_ghz * cores as f64 * (1.0 - clamp_load(load_pct) / 100.0)).max(0.0)
}

/// A compute node. Only the root device may own subordinates.
pub struct Device {
    id: DeviceId,
    capacity_ghz: f64,
    cores: u32,
    is_root: bool,
    load_pct: Mutex<f64>,
    model: Option<Arc<Model>>,
    subordinates: Vec<Arc<Device>>,
    sampler: Arc<dyn LoadSampler>,
}

impl Device {
    pub fn new(
        id: impl Into<DeviceId>,
        capacity_ghz: f64,
        cores: u32,
        sampler: Arc<dyn LoadSampler>,
    ) -> Self {
        Self {
            id: id.into(),
            capacity_ghz,
            cores,
            is_root: false,
            load_pct: Mutex::new(0.0),
            model: None,
            subordinates: Vec::new(),
            sampler,
        }
    }

    /// The device hosting the balancers.
    pub fn root(
        id: impl Into<DeviceId>,
        capacity_ghz: f64,
        cores: u32,
        sampler: Arc<dyn LoadSampler>,
    ) -> Self {
        Self {
            is_root: true,
            ..Self::new(id, capacity_ghz, cores, sampler)
        }
    }

    pub fn id(&self) -> &DeviceId {
        &self.id
    }

    pub fn capacity_ghz(&self) -> f64 {
        self.capacity_ghz
    }

    pub fn cores(&self) -> u32 {
        self.cores
    }

    pub fn is_root(&self) -> bool {
        self.is_root
    }

    /// Last sampled load, in `[0, 100]`.
    pub fn load(&self) -> f64 {
        *self.load_pct.lock()
    }

    /// Sample the current load and store it. Returns the clamped value.
    pub fn refresh_load(&self) -> f64 {
        let load = clamp_load(self.sampler.sample(&self.id));
        *self.load_pct.lock() = load;
        load
    }

    /// `capacity × cores × (1 − load/100)` at the last sampled load.
    pub fn computational_power(&self) -> f64 {
        power_at(self.capacity_ghz, self.cores, self.load())
    }

    pub fn model(&self) -> Option<&Arc<Model>> {
        self.model.as_ref()
    }

    pub fn assign_model(&mut self, model: Arc<Model>) {
        debug!("Device {} assigned model {}", self.id, model.name);
        self.model = Some(model);
    }

    pub fn subordinates(&self) -> &[Arc<Device>] {
        &self.subordinates
    }

    /// Register a subordinate device. Returns `false` if a device with the
    /// same id is already connected.
    pub fn connect(&mut self, device: Arc<Device>) -> Result<bool, CoreError> {
        if !self.is_root {
            return Err(CoreError::InvalidDevice {
                device_id: self.id.clone(),
                reason: "only the root device may own subordinates".into(),
            });
        }
        if device.id == self.id || self.subordinates.iter().any(|d| d.id == device.id) {
            return Ok(false);
        }
        debug!("Device {} connected to {}", device.id, self.id);
        self.subordinates.push(device);
        Ok(true)
    }
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("id", &self.id)
            .field("capacity_ghz", &self.capacity_ghz)
            .field("cores", &self.cores)
            .field("is_root", &self.is_root)
            .field("load_pct", &self.load())
            .field("subordinates", &self.subordinates.len())
            .finish()
    }
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Device({}, cores={}, speed={}GHz)",
            self.id, self.cores, self.capacity_ghz
        )
    }
}
