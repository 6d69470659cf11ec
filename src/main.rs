use anyhow::Result;
use clap::Parser;
use log::{debug, error, info};
use offlattice_engine::output::save_outputs;
use offlattice_engine::Simulation;
use rayon::prelude::*;
use simulation_common::SimulationConfig;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(author, version, about = "Off-lattice Monte Carlo cell population simulator")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Override the random seed from the configuration
    #[arg(long)]
    seed: Option<u64>,

    /// Override the number of replicates from the configuration
    #[arg(long)]
    replicates: Option<u32>,
}

/// Runs one replicate end to end and returns its final population size.
fn run_replicate(config: &SimulationConfig, replicate: u32) -> Result<usize> {
    let mut sim = Simulation::for_replicate(config.clone(), replicate, || false)?;
    info!(
        "Replicate {} seeded with {} cells (seed {}).",
        replicate,
        sim.population().len(),
        config.replicate_seed(replicate)
    );
    sim.run()?;
    save_outputs(
        &config.output,
        replicate,
        config.population.replicates,
        sim.snapshots(),
    )?;
    Ok(sim.population().len())
}

fn main() -> Result<()> {
    // Initialize the logger
    env_logger::init();
    let args = Args::parse();

    info!("Starting off-lattice cell simulation...");

    // --- Load Configuration ---
    let mut config = SimulationConfig::load(&args.config)?;
    if let Some(seed) = args.seed {
        config.population.seed = seed;
    }
    if let Some(replicates) = args.replicates {
        config.population.replicates = replicates;
    }
    config.validate()?;
    debug!("Configuration: {:#?}", config);

    let replicates = config.population.replicates;
    info!(
        "Running {} replicate(s) on {} Rayon threads.",
        replicates,
        rayon::current_num_threads()
    );

    let start_time = Instant::now();
    let results: Vec<(u32, Result<usize>)> = (0..replicates)
        .into_par_iter()
        .map(|replicate| (replicate, run_replicate(&config, replicate)))
        .collect();

    let mut failures = 0;
    for (replicate, result) in results {
        match result {
            Ok(size) => info!("Replicate {} ended with {} cells.", replicate, size),
            Err(e) => {
                error!("Replicate {} failed: {:#}", replicate, e);
                failures += 1;
            }
        }
    }

    info!(
        "Simulation finished in {:.3} seconds.",
        start_time.elapsed().as_secs_f64()
    );
    if failures > 0 {
        anyhow::bail!("{} of {} replicates failed.", failures, replicates);
    }
    info!("Simulation Complete.");
    Ok(())
}
