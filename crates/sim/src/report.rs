use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::system::ExperimentResult;

/// Print a human-readable summary of one run.
pub fn print_summary(result: &ExperimentResult) {
    let stats = &result.vertical_balancer_stats;
    let quality = &result.decision_quality;
    let system = &result.system_stats;

    println!();
    println!("=== {} ({} tasks) ===", result.mode, result.num_tasks);
    println!(
        "Placement:  edge {} ({:.1}%)  cloud {} ({:.1}%)  skip {} ({:.1}%)",
        stats.edge.count,
        stats.edge.percentage,
        stats.cloud.count,
        stats.cloud.percentage,
        stats.skip.count,
        stats.skip.percentage
    );
    println!(
        "Exec time:  edge {:.3}s  cloud {:.3}s  overall {:.3}s",
        system.execution_time.edge, system.execution_time.cloud, system.execution_time.overall
    );
    println!(
        "Deadlines:  {} missed of {} executed ({:.1}%), {} failed",
        system.deadline_performance.missed_deadlines,
        system.deadline_performance.total_tasks,
        system.deadline_performance.miss_rate,
        system.deadline_performance.failed_tasks
    );
    println!(
        "Quality:    edge miss {:.1}%  cloud miss {:.1}%",
        quality.edge.miss_rate(),
        quality.cloud.miss_rate()
    );
    println!(
        "Root CPU:   before {:.1}%  after {:.1}%",
        system.cpu_usage.before_task, system.cpu_usage.after_task
    );
    if !result.layer_distribution.is_empty() {
        let layers: Vec<String> = result
            .layer_distribution
            .iter()
            .map(|a| format!("{}={}", a.device_id, a.layers.len()))
            .collect();
        println!("Layers:     {}", layers.join("  "));
    }
}

/// Write all runs as a JSON object keyed by mode.
pub fn save_results(results: &[ExperimentResult], path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let by_mode: BTreeMap<&str, &ExperimentResult> =
        results.iter().map(|r| (r.mode.as_str(), r)).collect();

    let json = serde_json::to_string_pretty(&by_mode)?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    info!("Saved {} results to {}", results.len(), path.display());
    Ok(())
}
