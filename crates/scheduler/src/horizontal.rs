use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tiered_core::device::{power_at, Device};
use tiered_core::model::{Layer, Model};
use tiered_core::types::DeviceId;
use tracing::debug;

/// One device's share of the cluster's computational power.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PowerShare {
    pub device_id: DeviceId,
    pub power: f64,
    /// Fraction in `[0, 1]`; fractions over all devices sum to 1.
    pub share: f64,
}

/// Power shares in connected-device order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PowerShares {
    shares: Vec<PowerShare>,
}

impl PowerShares {
    pub fn get(&self, device_id: &str) -> Option<f64> {
        self.shares
            .iter()
            .find(|s| s.device_id == device_id)
            .map(|s| s.share)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PowerShare> {
        self.shares.iter()
    }

    pub fn len(&self) -> usize {
        self.shares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shares.is_empty()
    }

    pub fn total_power(&self) -> f64 {
        self.shares.iter().map(|s| s.power).sum()
    }
}

/// Half-open parameter range `[start, end)` assigned to a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParameterRange {
    pub device_id: DeviceId,
    pub start: u64,
    pub end: u64,
}

impl ParameterRange {
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }
}

/// Whole layers (by index) assigned to a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayerAssignment {
    pub device_id: DeviceId,
    pub layers: Vec<usize>,
}

/// Parameter split of one layer of a model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayerSplit {
    pub layer_index: usize,
    pub ranges: Vec<ParameterRange>,
}

/// Splits edge work across the root device and its subordinates in
/// proportion to their computational power.
pub struct HorizontalBalancer {
    root: Arc<Device>,
    /// Serializes load refreshes so a share computation sees one snapshot.
    snapshot: Mutex<()>,
}

impl HorizontalBalancer {
    pub fn new(root: Arc<Device>) -> Self {
        Self {
            root,
            snapshot: Mutex::new(()),
        }
    }

    /// Root first, then subordinates in registration order.
    pub fn connected_devices(&self) -> Vec<Arc<Device>> {
        std::iter::once(self.root.clone())
            .chain(self.root.subordinates().iter().cloned())
            .collect()
    }

    /// Refresh every device's load and compute its fraction of the total
    /// power. Falls back to equal shares when every device is saturated.
    pub fn power_shares(&self) -> PowerShares {
        let devices = self.connected_devices();

        let powers: Vec<(DeviceId, f64)> = {
            let _guard = self.snapshot.lock();
            devices
                .iter()
                .map(|d| {
                    let load = d.refresh_load();
                    (d.id().clone(), power_at(d.capacity_ghz(), d.cores(), load))
                })
                .collect()
        };

        let total: f64 = powers.iter().map(|(_, p)| p).sum();
        let count = powers.len() as f64;

        let shares = powers
            .into_iter()
            .map(|(device_id, power)| {
                let share = if total == 0.0 { 1.0 / count } else { power / total };
                PowerShare {
                    device_id,
                    power,
                    share,
                }
            })
            .collect();

        if total == 0.0 {
            debug!("All devices saturated, using equal shares");
        }
        PowerShares { shares }
    }

    /// Split a layer's parameters across devices.
    ///
    /// Non-divisible layers go entirely to the root. Divisible layers are
    /// walked in device order, each device taking `floor(params * share)`
    /// (at least 1). The walk stops once `[0, params)` is covered and the
    /// last device absorbs any rounding shortfall, so rounding error
    /// accumulates toward the front of the list.
    pub fn distribute_parameters(&self, layer: &Layer) -> Vec<ParameterRange> {
        let total = layer.parameters;

        if !layer.is_divisible() {
            return vec![ParameterRange {
                device_id: self.root.id().clone(),
                start: 0,
                end: total,
            }];
        }

        let shares = self.power_shares();
        let last = shares.len().saturating_sub(1);
        let mut ranges = Vec::with_capacity(shares.len());
        let mut start = 0u64;

        for (i, share) in shares.iter().enumerate() {
            let count = ((total as f64 * share.share).floor() as u64).max(1);
            let end = if i == last {
                total
            } else {
                start.saturating_add(count).min(total)
            };

            ranges.push(ParameterRange {
                device_id: share.device_id.clone(),
                start,
                end,
            });
            start = end;

            if end >= total {
                break;
            }
        }

        debug!(
            "Split {} params across {} devices: {:?}",
            total,
            ranges.len(),
            ranges.iter().map(|r| r.len()).collect::<Vec<_>>()
        );
        ranges
    }

    /// Assign whole layers by index. Each device takes
    /// `max(1, floor(layers * share))` consecutive indices; the last device
    /// always takes exactly the remainder. Every device appears in the
    /// result, possibly with no layers.
    pub fn distribute_layers(&self, model: &Model) -> Vec<LayerAssignment> {
        let shares = self.power_shares();
        let total = model.num_layers();
        let last = shares.len().saturating_sub(1);

        let mut assignments: Vec<LayerAssignment> = shares
            .iter()
            .map(|s| LayerAssignment {
                device_id: s.device_id.clone(),
                layers: Vec::new(),
            })
            .collect();

        let mut assigned = 0usize;
        for (i, share) in shares.iter().enumerate() {
            if assigned >= total {
                break;
            }

            let count = if i == last {
                total - assigned
            } else {
                ((total as f64 * share.share).floor() as usize).max(1)
            };
            let end = (assigned + count).min(total);

            assignments[i].layers = (assigned..end).collect();
            debug!(
                "Device {} gets layers {}..{} of {}",
                share.device_id, assigned, end, model.name
            );
            assigned = end;
        }

        assignments
    }

    /// Parameter splits for every layer worth distributing (divisible and
    /// computationally intensive).
    pub fn plan_model(&self, model: &Model) -> Vec<LayerSplit> {
        model
            .intensive_divisible_layers()
            .into_iter()
            .map(|(layer_index, layer)| LayerSplit {
                layer_index,
                ranges: self.distribute_parameters(layer),
            })
            .collect()
    }
}

impl std::fmt::Debug for HorizontalBalancer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HorizontalBalancer")
            .field("root", self.root.id())
            .field("connected_devices", &(self.root.subordinates().len() + 1))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests_common::*;
    use approx::assert_relative_eq;
    use tiered_core::model::{self, LayerKind};
    use tiered_core::sampler::FixedLoad;

    fn cluster(sampler: FixedLoad) -> HorizontalBalancer {
        HorizontalBalancer::new(Arc::new(make_cluster(Arc::new(sampler))))
    }

    fn assert_covers(ranges: &[ParameterRange], total: u64) {
        let mut expected_start = 0;
        for r in ranges {
            assert_eq!(r.start, expected_start, "ranges must be contiguous");
            assert!(r.end >= r.start);
            expected_start = r.end;
        }
        assert_eq!(expected_start, total);
    }

    fn assert_layers_cover(assignments: &[LayerAssignment], total: usize) {
        let flat: Vec<usize> = assignments.iter().flat_map(|a| a.layers.clone()).collect();
        assert_eq!(flat, (0..total).collect::<Vec<_>>());
    }

    #[test]
    fn test_connected_devices_order() {
        let hb = cluster(FixedLoad::new(0.0));
        let ids: Vec<String> = hb.connected_devices().iter().map(|d| d.id().clone()).collect();
        assert_eq!(ids, vec!["root", "edge1", "edge2", "edge3"]);
    }

    #[test]
    fn test_power_shares_proportional() {
        // Powers at 0% load: 5.6, 4.8, 9.6, 2.0 -> total 22
        let hb = cluster(FixedLoad::new(0.0));
        let shares = hb.power_shares();

        assert_eq!(shares.len(), 4);
        assert_relative_eq!(shares.total_power(), 22.0, epsilon = 1e-9);
        assert_relative_eq!(shares.get("edge2").unwrap(), 9.6 / 22.0, epsilon = 1e-12);
        let sum: f64 = shares.iter().map(|s| s.share).sum();
        assert_relative_eq!(sum, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_power_shares_reflect_load() {
        let sampler = FixedLoad::new(0.0).with("edge2", 100.0);
        let hb = cluster(sampler);
        let shares = hb.power_shares();

        assert_eq!(shares.get("edge2"), Some(0.0));
        assert_relative_eq!(shares.get("root").unwrap(), 5.6 / 12.4, epsilon = 1e-12);
    }

    #[test]
    fn test_all_saturated_falls_back_to_equal_shares() {
        let hb = cluster(FixedLoad::new(100.0));
        let shares = hb.power_shares();

        for share in shares.iter() {
            assert_relative_eq!(share.share, 0.25);
        }
        let sum: f64 = shares.iter().map(|s| s.share).sum();
        assert_relative_eq!(sum, 1.0);
    }

    #[test]
    fn test_lone_root_gets_everything() {
        let (_, root) = make_root(40.0);
        let hb = HorizontalBalancer::new(Arc::new(root));
        assert_eq!(hb.power_shares().get("root"), Some(1.0));

        let ranges = hb.distribute_parameters(&Layer::linear(1234));
        assert_eq!(ranges.len(), 1);
        assert_covers(&ranges, 1234);

        let layers = hb.distribute_layers(&model::vgg11());
        assert_layers_cover(&layers, 11);
    }

    #[test]
    fn test_non_divisible_layer_stays_on_root() {
        let hb = cluster(FixedLoad::new(0.0));
        let ranges = hb.distribute_parameters(&Layer::conv2d(307_456));
        assert_eq!(
            ranges,
            vec![ParameterRange {
                device_id: "root".into(),
                start: 0,
                end: 307_456
            }]
        );
    }

    #[test]
    fn test_divisible_layer_ranges_cover_exactly() {
        let hb = cluster(FixedLoad::new(0.0));
        let layer = Layer::linear(37_752_832);
        let ranges = hb.distribute_parameters(&layer);

        assert_eq!(ranges.len(), 4);
        assert_covers(&ranges, layer.parameters);
        // edge2 is the strongest device
        let longest = ranges.iter().max_by_key(|r| r.len()).unwrap();
        assert_eq!(longest.device_id, "edge2");
    }

    #[test]
    fn test_rounding_shortfall_goes_to_last_device() {
        // Equal shares of 10 params across 4 devices: 2, 2, 2, then 4.
        let hb = cluster(FixedLoad::new(100.0));
        let ranges = hb.distribute_parameters(&Layer::linear(10));

        let lens: Vec<u64> = ranges.iter().map(|r| r.len()).collect();
        assert_eq!(lens, vec![2, 2, 2, 4]);
        assert_covers(&ranges, 10);
    }

    #[test]
    fn test_tiny_layer_stops_early() {
        // Minimum of one parameter per device covers 2 params after two devices.
        let hb = cluster(FixedLoad::new(0.0));
        let ranges = hb.distribute_parameters(&Layer::linear(2));

        assert_eq!(ranges.len(), 2);
        assert_eq!(ranges[0].device_id, "root");
        assert_eq!(ranges[1].device_id, "edge1");
        assert_covers(&ranges, 2);
    }

    #[test]
    fn test_empty_divisible_layer() {
        let hb = cluster(FixedLoad::new(0.0));
        let ranges = hb.distribute_parameters(&Layer::new(LayerKind::Linear, 0, true));
        assert_eq!(ranges.len(), 1);
        assert!(ranges[0].is_empty());
    }

    #[test]
    fn test_distribute_layers_last_device_gets_remainder() {
        // Shares 5.6/22, 4.8/22, 9.6/22, 2/22 over 8 layers:
        // floor(2.04)=2, floor(1.75)=1, floor(3.49)=3, remainder 2
        let hb = cluster(FixedLoad::new(0.0));
        let assignments = hb.distribute_layers(&model::alexnet());

        let counts: Vec<usize> = assignments.iter().map(|a| a.layers.len()).collect();
        assert_eq!(counts, vec![2, 1, 3, 2]);
        assert_eq!(assignments[3].layers, vec![6, 7]);
        assert_layers_cover(&assignments, 8);
    }

    #[test]
    fn test_distribute_layers_fewer_layers_than_devices() {
        let hb = cluster(FixedLoad::new(0.0));
        let model = Model::with_layers("two", vec![Layer::linear(10), Layer::linear(20)]);
        let assignments = hb.distribute_layers(&model);

        assert_eq!(assignments.len(), 4);
        assert_eq!(assignments[0].layers, vec![0]);
        assert_eq!(assignments[1].layers, vec![1]);
        assert!(assignments[2].layers.is_empty());
        assert!(assignments[3].layers.is_empty());
    }

    #[test]
    fn test_distribute_layers_empty_model() {
        let hb = cluster(FixedLoad::new(0.0));
        let assignments = hb.distribute_layers(&Model::new("empty"));
        assert_eq!(assignments.len(), 4);
        assert!(assignments.iter().all(|a| a.layers.is_empty()));
    }

    #[test]
    fn test_distribute_layers_covers_for_many_sizes() {
        for load in [0.0, 50.0, 100.0] {
            let hb = cluster(FixedLoad::new(0.0).with("edge1", load));
            for m in 0..40 {
                let layers = (0..m).map(|_| Layer::conv2d(100)).collect();
                let model = Model::with_layers("synthetic", layers);
                assert_layers_cover(&hb.distribute_layers(&model), m);
            }
        }
    }

    #[test]
    fn test_distribute_parameters_covers_for_many_sizes() {
        let profiles = [
            FixedLoad::new(0.0),
            FixedLoad::new(100.0),
            FixedLoad::new(0.0).with("edge2", 95.0),
            FixedLoad::new(30.0).with("root", 90.0).with("edge3", 10.0),
        ];
        for sampler in profiles {
            let hb = cluster(sampler);
            let order: Vec<String> =
                hb.connected_devices().iter().map(|d| d.id().clone()).collect();
            for params in 0..300u64 {
                let ranges = hb.distribute_parameters(&Layer::linear(params));
                assert_covers(&ranges, params);

                let ids: Vec<String> = ranges.iter().map(|r| r.device_id.clone()).collect();
                assert_eq!(ids[..], order[..ids.len()]);
                if params > 0 {
                    assert!(ranges.iter().all(|r| !r.is_empty()), "params={}", params);
                }
            }
        }
    }

    #[test]
    fn test_plan_model_targets_intensive_divisible_layers() {
        let hb = cluster(FixedLoad::new(0.0));
        let model = model::vgg19();
        let plan = hb.plan_model(&model);

        let indices: Vec<usize> = plan.iter().map(|s| s.layer_index).collect();
        assert_eq!(indices, vec![16, 17, 18]);
        for split in &plan {
            assert_covers(&split.ranges, model.layer(split.layer_index).unwrap().parameters);
        }
    }
}
