use serde::Serialize;
use tiered_core::config::DeadlineDomain;
use tiered_core::types::Destination;
use tracing::debug;

use crate::{DecisionContext, PlacementStrategy};

/// Load is scaled by this factor before capping at 100.
const CPU_SCALE: f64 = 1.5;

/// Each model layer adds this much to the computation sub-score.
const PER_LAYER_SCORE: f64 = 5.0;

const MAX_SUBSCORE: f64 = 100.0;

/// Breakdown of a weighted score. Sub-scores are in `[0, 100]`; absent
/// terms (no deadline, no model) are `None`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeightedScore {
    pub cpu: f64,
    pub deadline: Option<f64>,
    pub computation: Option<f64>,
    pub recency: f64,
    pub total: f64,
}

/// Multi-factor strategy. Higher scores favor the cloud.
///
/// score = cpu * w_cpu + deadline * w_deadline + computation * w_computation
///       + recency * w_task_count
///
/// Weights are used as configured. An absent deadline or model term
/// contributes zero unless `renormalize_absent_weights` is set, in which
/// case the present terms are rescaled to the full weight sum.
pub struct WeightedStrategy;

impl WeightedStrategy {
    /// Compute the score for the task in `ctx`. Refreshes the root load.
    pub fn score(ctx: &DecisionContext<'_>) -> WeightedScore {
        let config = ctx.config;
        let weights = &config.weights;

        let load = ctx.root.refresh_load();
        let cpu = (load * CPU_SCALE).min(MAX_SUBSCORE);
        let deadline = ctx
            .task
            .deadline
            .map(|d| deadline_score(d, &config.deadline_domain));
        let computation = ctx
            .root
            .model()
            .map(|m| (m.num_layers() as f64 * PER_LAYER_SCORE).min(MAX_SUBSCORE));
        let recency = recency_score(*ctx.edge_counter, config.count_threshold);

        let mut total = cpu * weights.cpu + recency * weights.task_count;
        let mut present_weight = weights.cpu + weights.task_count;
        if let Some(score) = deadline {
            total += score * weights.deadline;
            present_weight += weights.deadline;
        }
        if let Some(score) = computation {
            total += score * weights.computation;
            present_weight += weights.computation;
        }

        if config.renormalize_absent_weights && present_weight > 0.0 {
            total *= weights.total() / present_weight;
        }

        WeightedScore {
            cpu,
            deadline,
            computation,
            recency,
            total,
        }
    }
}

/// Shorter deadlines score higher. Linear over the configured domain.
pub fn deadline_score(deadline: f64, domain: &DeadlineDomain) -> f64 {
    let span = domain.max_secs - domain.min_secs;
    if span <= 0.0 {
        return 0.0;
    }
    (MAX_SUBSCORE * (1.0 - (deadline - domain.min_secs) / span)).clamp(0.0, MAX_SUBSCORE)
}

/// Rises as consecutive edge placements accumulate.
pub fn recency_score(edge_counter: u32, count_threshold: u32) -> f64 {
    if count_threshold == 0 {
        return MAX_SUBSCORE;
    }
    (edge_counter as f64 / count_threshold as f64 * MAX_SUBSCORE).min(MAX_SUBSCORE)
}

impl PlacementStrategy for WeightedStrategy {
    fn choose(&self, ctx: &mut DecisionContext<'_>) -> Destination {
        let score = Self::score(ctx);

        let destination = if score.total >= ctx.config.cloud_threshold {
            *ctx.edge_counter = 0;
            Destination::Cloud
        } else {
            *ctx.edge_counter += 1;
            Destination::Edge
        };

        debug!(
            "weighted score {:.2} (cpu={:.1}, deadline={:?}, computation={:?}, recency={:.1}) \
             -> {}",
            score.total, score.cpu, score.deadline, score.computation, score.recency, destination
        );
        destination
    }

    fn name(&self) -> &str {
        "weighted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests_common::*;
    use approx::assert_relative_eq;
    use tiered_core::config::BalancerConfig;

    #[test]
    fn test_worked_example_hits_threshold() {
        // 50% load, deadline 0.5s, no model, fresh counter:
        // min(100, 75) * 0.4 + 100 * 0.3 + 0 * 0.2 + 0 * 0.1 = 60
        let (_, root) = make_root(50.0);
        let task = make_task(Some(0.5));
        let config = BalancerConfig::default();
        let mut counter = 0;
        let mut ctx = DecisionContext {
            task: &task,
            root: &root,
            config: &config,
            edge_counter: &mut counter,
        };

        let score = WeightedStrategy::score(&ctx);
        assert_relative_eq!(score.cpu, 75.0);
        assert_eq!(score.deadline, Some(100.0));
        assert_eq!(score.computation, None);
        assert_relative_eq!(score.recency, 0.0);
        assert_relative_eq!(score.total, 75.0 * 0.4 + 100.0 * 0.3);

        assert_eq!(WeightedStrategy.choose(&mut ctx), Destination::Cloud);
        assert_eq!(counter, 0);
    }

    #[test]
    fn test_worked_example_with_recency() {
        let (_, root) = make_root(50.0);
        let task = make_task(Some(0.5));
        let config = BalancerConfig::default();
        let mut counter = 5;
        let ctx = DecisionContext {
            task: &task,
            root: &root,
            config: &config,
            edge_counter: &mut counter,
        };

        // recency = 5 / 25 * 100 = 20
        let score = WeightedStrategy::score(&ctx);
        assert_relative_eq!(score.recency, 20.0);
        assert_relative_eq!(score.total, 75.0 * 0.4 + 100.0 * 0.3 + 20.0 * 0.1);
    }

    #[test]
    fn test_low_score_stays_at_edge_and_counts() {
        let (_, root) = make_root(10.0);
        let task = make_task(Some(9.0));
        let config = BalancerConfig::default();
        let mut counter = 3;
        let mut ctx = DecisionContext {
            task: &task,
            root: &root,
            config: &config,
            edge_counter: &mut counter,
        };

        assert_eq!(WeightedStrategy.choose(&mut ctx), Destination::Edge);
        assert_eq!(counter, 4);
    }

    #[test]
    fn test_model_adds_computation_term() {
        let root = alexnet_root(0.0);
        let task = make_task(None);
        let config = BalancerConfig::default();
        let mut counter = 0;
        let ctx = DecisionContext {
            task: &task,
            root: &root,
            config: &config,
            edge_counter: &mut counter,
        };

        // AlexNet has 8 layers -> 40
        let score = WeightedStrategy::score(&ctx);
        assert_eq!(score.computation, Some(40.0));
        assert_eq!(score.deadline, None);
        assert_relative_eq!(score.total, 40.0 * 0.2);
    }

    #[test]
    fn test_absent_terms_keep_their_weight_by_default() {
        let (_, root) = make_root(100.0);
        let task = make_task(None);
        let mut config = BalancerConfig::default();
        let mut counter = 25;

        // cpu and recency saturated, deadline and model absent: 100*0.4 + 100*0.1
        let ctx = DecisionContext {
            task: &task,
            root: &root,
            config: &config,
            edge_counter: &mut counter,
        };
        assert_relative_eq!(WeightedStrategy::score(&ctx).total, 50.0);

        config.renormalize_absent_weights = true;
        let ctx = DecisionContext {
            task: &task,
            root: &root,
            config: &config,
            edge_counter: &mut counter,
        };
        assert_relative_eq!(WeightedStrategy::score(&ctx).total, 100.0);
    }

    #[test]
    fn test_deadline_score_domain() {
        let domain = DeadlineDomain::default();
        assert_relative_eq!(deadline_score(0.5, &domain), 100.0);
        assert_relative_eq!(deadline_score(5.25, &domain), 50.0);
        assert_relative_eq!(deadline_score(10.0, &domain), 0.0);
        assert_relative_eq!(deadline_score(0.1, &domain), 100.0);
        assert_relative_eq!(deadline_score(30.0, &domain), 0.0);

        let custom = DeadlineDomain {
            min_secs: 0.0,
            max_secs: 2.0,
        };
        assert_relative_eq!(deadline_score(1.0, &custom), 50.0);
    }

    #[test]
    fn test_recency_score() {
        assert_relative_eq!(recency_score(0, 25), 0.0);
        assert_relative_eq!(recency_score(10, 25), 40.0);
        assert_relative_eq!(recency_score(40, 25), 100.0);
        assert_relative_eq!(recency_score(0, 0), 100.0);
    }
}
