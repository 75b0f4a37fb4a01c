use std::sync::Arc;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

use tiered_core::clock::Clock;
use tiered_core::config::{CloudConfig, EdgeConfig};
use tiered_core::device::Device;
use tiered_core::error::ExecutionError;
use tiered_core::executor::{Execution, Executor};
use tiered_core::task::{ResultHandle, Task};
use tiered_core::types::{Destination, Timestamp};

/// Runs tasks on the root edge device. Always succeeds.
pub struct EdgeExecutor {
    root: Arc<Device>,
    config: EdgeConfig,
}

impl EdgeExecutor {
    pub fn new(root: Arc<Device>, config: EdgeConfig) -> Self {
        Self { root, config }
    }
}

impl Executor for EdgeExecutor {
    fn execute(&self, task: &Task) -> Result<Execution, ExecutionError> {
        let mut duration_secs = self.config.processing_secs;
        if self.root.model().is_some() {
            duration_secs += self.config.model_processing_secs;
        }
        debug!("Edge executed task {} in {:.3}s", task.id, duration_secs);

        Ok(Execution {
            result: ResultHandle::completed(Destination::Edge, Some(self.root.id().clone())),
            duration_secs,
        })
    }

    fn destination(&self) -> Destination {
        Destination::Edge
    }
}

/// Simulated remote service reached through a rate-limited gateway.
///
/// Each request may find the service unavailable. Successful requests pay
/// a random one-way latency twice plus the processing time.
pub struct CloudService {
    config: CloudConfig,
    clock: Arc<dyn Clock>,
    inner: Mutex<CloudState>,
}

struct CloudState {
    rng: StdRng,
    last_request: Option<Timestamp>,
}

impl CloudService {
    pub fn new(config: CloudConfig, clock: Arc<dyn Clock>, seed: u64) -> Self {
        Self {
            config,
            clock,
            inner: Mutex::new(CloudState {
                rng: StdRng::seed_from_u64(seed),
                last_request: None,
            }),
        }
    }
}

impl Executor for CloudService {
    fn execute(&self, task: &Task) -> Result<Execution, ExecutionError> {
        let mut state = self.inner.lock();
        let now = self.clock.now();

        // Gateway rate limit: back off when requests arrive too close together.
        let throttle_secs = match state.last_request {
            Some(last) if now - last < self.config.min_request_interval_secs => {
                self.config.min_request_interval_secs
            }
            _ => 0.0,
        };
        state.last_request = Some(now + throttle_secs);

        if state.rng.gen::<f64>() >= self.config.success_rate {
            warn!("Cloud unavailable for task {}", task.id);
            return Err(ExecutionError::Unavailable);
        }

        let (min, max) = (self.config.min_latency_secs, self.config.max_latency_secs);
        let latency = if max > min { state.rng.gen_range(min..max) } else { min };
        let duration_secs = throttle_secs + 2.0 * latency + self.config.processing_secs;
        debug!(
            "Cloud executed task {} in {:.3}s (round trip {:.3}s)",
            task.id,
            duration_secs,
            2.0 * latency
        );

        Ok(Execution {
            result: ResultHandle::completed(Destination::Cloud, None),
            duration_secs,
        })
    }

    fn destination(&self) -> Destination {
        Destination::Cloud
    }
}
