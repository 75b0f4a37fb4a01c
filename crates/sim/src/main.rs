mod executor;
mod monitor;
mod report;
mod sampler;
mod system;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use tiered_core::config::{self, DecisionMode};
use tiered_core::model;
use tiered_core::sampler::LoadSampler;
use sampler::{SyntheticLoadSampler, SystemLoadSampler};
use system::TieredSystem;

#[derive(Parser)]
#[command(name = "tiered-sim", about = "Edge/cloud task placement simulator")]
struct Cli {
    /// Path to a TOML config file (defaults are used if missing)
    #[arg(short, long, default_value = "tiered.toml")]
    config: String,

    /// Number of tasks per run (overrides the config)
    #[arg(short = 'n', long)]
    tasks: Option<usize>,

    /// Decision mode to run, or "all" for every configured mode
    #[arg(short, long, default_value = "all")]
    mode: String,

    /// Model assigned to the root device (overrides the config)
    #[arg(long)]
    model: Option<String>,

    /// Run without a model on the root device
    #[arg(long)]
    no_model: bool,

    #[arg(long, default_value = "42")]
    seed: u64,

    /// Where to write results JSON (overrides the config)
    #[arg(short, long)]
    output: Option<String>,

    /// Sample this host's real CPU load instead of a synthetic walk
    #[arg(long)]
    system_load: bool,

    /// Sleep for simulated execution times
    #[arg(long)]
    realtime: bool,

    /// Print the effective config as TOML and exit
    #[arg(long)]
    print_config: bool,

    /// Write the effective config to this path and exit
    #[arg(long, value_name = "PATH")]
    write_config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new("tiered_sim=info,tiered_scheduler=info,tiered_core=info")
            }),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut cfg = config::load_config(&cli.config);
    if let Some(tasks) = cli.tasks {
        cfg.experiment.num_tasks = tasks;
    }
    if let Some(model) = &cli.model {
        cfg.experiment.model = model.clone();
    }
    if let Some(output) = &cli.output {
        cfg.experiment.results_file = output.clone();
        cfg.experiment.save_results = true;
    }

    if cli.print_config {
        print!("{}", toml::to_string_pretty(&cfg)?);
        return Ok(());
    }
    if let Some(path) = &cli.write_config {
        config::save_config(&cfg, path)?;
        eprintln!("[tiered-sim] config written to {}", path);
        return Ok(());
    }

    let modes: Vec<String> = if cli.mode.eq_ignore_ascii_case("all") {
        cfg.experiment.modes.iter().map(|m| m.name().to_string()).collect()
    } else {
        if cli.mode.parse::<DecisionMode>().is_err() {
            warn!("Unknown mode '{}': every task will run at the edge", cli.mode);
        }
        vec![cli.mode.clone()]
    };

    eprintln!(
        "[tiered-sim] tasks={} modes={} model={}",
        cfg.experiment.num_tasks,
        modes.join(","),
        if cli.no_model { "none" } else { cfg.experiment.model.as_str() }
    );

    let mut results = Vec::with_capacity(modes.len());
    for mode in &modes {
        let sampler: Arc<dyn LoadSampler> = if cli.system_load {
            Arc::new(SystemLoadSampler::new())
        } else {
            Arc::new(SyntheticLoadSampler::new(cli.seed))
        };
        let model = if cli.no_model {
            None
        } else {
            Some(model::model_by_name(&cfg.experiment.model)?)
        };

        let mut system = TieredSystem::new(cfg.clone(), sampler, model, cli.seed, cli.realtime)?;
        let result = system.run_experiment(cfg.experiment.num_tasks, mode).await?;
        report::print_summary(&result);
        results.push(result);
    }

    if cfg.experiment.save_results {
        report::save_results(&results, &cfg.experiment.results_file)?;
        eprintln!("[tiered-sim] results written to {}", cfg.experiment.results_file);
    }

    info!("Done: {} runs", results.len());
    Ok(())
}
