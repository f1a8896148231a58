//! Headless runner for the organism simulation.

mod persistence;
mod telemetry;

use anyhow::{Context, Result};
use cellsim_core::SimulationConfig;
use cellsim_world::{catalog, CompletionStats, Simulation, SimulationResult};
use chrono::{DateTime, Utc};
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "cellsim-runner")]
#[command(author, version, about = "Run an organism simulation headless", long_about = None)]
struct Args {
    /// Simulation config file (JSON); defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Key/value store file holding templates and completion records
    #[arg(short, long, default_value = "cellsim-store.bin")]
    store: PathBuf,

    /// Simulated seconds, overrides the config
    #[arg(long)]
    duration: Option<f32>,

    /// Random seed, overrides the config
    #[arg(long)]
    seed: Option<u64>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

#[derive(Debug, Serialize)]
struct RunReport {
    environment: String,
    seed: u64,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    result: SimulationResult,
    record: CompletionStats,
}

fn load_config(args: &Args) -> Result<SimulationConfig> {
    let mut config = match &args.config {
        Some(path) => SimulationConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => SimulationConfig::default(),
    };
    if let Some(duration) = args.duration {
        config.duration = duration;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    Ok(config)
}

fn main() -> Result<()> {
    let args = Args::parse();
    telemetry::init_telemetry(args.json_logs)?;

    let config = load_config(&args)?;
    let environment = config.field.name.clone();
    info!(environment = %environment, seed = config.seed, duration = config.duration, "Starting cellsim runner");

    let mut store = persistence::load_store(&args.store)?;
    let registry = Arc::new(catalog::default_registry()?);
    let templates = persistence::load_templates(&mut store, &registry, catalog::default_templates(&registry)?);

    let mut simulation = Simulation::new(config.clone(), registry);
    for (name, template) in &templates {
        if let Err(e) = simulation.add_template(name, template) {
            warn!(template = %template.id, "Skipping template {}: {}", name, e);
        }
    }

    let started_at = Utc::now();
    let result = simulation.run()?;
    let finished_at = Utc::now();

    let mut record = CompletionStats::load(&store, &environment);
    record.record_run(result.total_population(), result.longest_survival_seconds);
    record.save(&mut store, &environment);
    persistence::save_store(&store, &args.store)?;

    info!(
        runs = record.runs,
        best_population = record.best_population,
        longest_survival_ms = record.longest_survival_ms,
        "Completion record updated"
    );

    let report = RunReport {
        environment,
        seed: config.seed,
        started_at,
        finished_at,
        result,
        record,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
