#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs Colony Defence nights headlessly.

mod navigation;
mod scenario;
mod simulation;
mod terrain;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use colony_defence_core::WELCOME_BANNER;
use tracing_subscriber::EnvFilter;

use scenario::Scenario;
use simulation::Simulation;

/// Headless driver that precomputes paths and releases hostile waves.
#[derive(Debug, Parser)]
#[command(name = "colony-defence", about = "Simulate hostile waves around a colony")]
struct Cli {
    /// Scenario file to load; the built-in colony is used when omitted.
    #[arg(short, long)]
    scenario: Option<PathBuf>,
    /// Number of nights to simulate.
    #[arg(short, long, default_value_t = 1)]
    nights: u32,
    /// Overrides the scenario's spawn seed.
    #[arg(long)]
    seed: Option<u64>,
    /// Overrides the per-slice scheduler budget in milliseconds.
    #[arg(long)]
    slice_budget_ms: Option<u64>,
    /// Log filter directive; falls back to `RUST_LOG`, then `info`.
    #[arg(long)]
    log: Option<String>,
}

/// Entry point for the Colony Defence command-line interface.
fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log.as_deref());

    let mut scenario = match &cli.scenario {
        Some(path) => scenario::load(path)?,
        None => Scenario::default(),
    };
    if let Some(seed) = cli.seed {
        scenario.spawner.seed = seed;
    }
    if let Some(budget) = cli.slice_budget_ms {
        scenario.scheduler.slice_budget_ms = budget;
    }

    let mut simulation = Simulation::new(scenario)?;
    println!("{WELCOME_BANNER}");
    let report = simulation.run(cli.nights);
    println!("{report}");
    Ok(())
}

fn init_tracing(directive: Option<&str>) {
    let filter = match directive {
        Some(directive) => EnvFilter::new(directive),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
