use crate::model::DrasdoHohmeModel;
use crate::parameters::Parameters;
use crate::population::CellPopulation;
use crate::random::SeededRandom;
use anyhow::{Context, Result};
use log::{debug, info, trace, warn};
use simulation_common::{Snapshot, SimulationConfig};
use std::sync::Arc;
use std::time::Instant;

/// Seconds between progress lines while stepping.
const PRINT_INTERVAL_SECS: f64 = 5.0;

/// Drives one replicate of a configured run: seeding, stepping, drug schedule and recording.
pub struct Simulation {
    config: SimulationConfig,
    replicate: u32,
    population: CellPopulation<SeededRandom, DrasdoHohmeModel>,
}

impl Simulation {
    /// Seeds replicate 0 of `config`.
    pub fn new(config: SimulationConfig) -> Result<Self> {
        Self::for_replicate(config, 0, || false)
    }

    /// Seeds the given replicate. Its random source starts from `config.replicate_seed(replicate)`.
    pub fn for_replicate<F>(config: SimulationConfig, replicate: u32, should_stop: F) -> Result<Self>
    where
        F: FnMut() -> bool,
    {
        config.validate()?;
        let params = Arc::new(Parameters::from_config(&config).context("Invalid simulation parameters")?);
        debug!("Simulation parameters: {:#?}", params.sim());

        let seed = config.replicate_seed(replicate);
        let population = CellPopulation::seed(
            params,
            SeededRandom::new(seed),
            DrasdoHohmeModel,
            config.population.initial_num as usize,
            config.population.density,
            should_stop,
        )
        .with_context(|| format!("Failed to seed replicate {} (seed {})", replicate, seed))?;

        if config.drug.time.is_some() && config.drug.effects.is_empty() {
            warn!("A drug time is set but the effect table is empty; the drug will not change growth rates.");
        }

        let mut sim = Simulation { config, replicate, population };
        if sim.config.drug.time == Some(0) {
            sim.population.add_drug();
        }
        Ok(sim)
    }

    /// Advances one time step, applying the drug first if it is scheduled now.
    pub fn step(&mut self) -> Result<()> {
        let now = self.population.time_step();
        if self.config.drug.time == Some(now) && !self.population.drug_added() {
            self.population.add_drug();
        }
        self.population
            .one_time_step()
            .with_context(|| format!("Time step {} failed", now))?;
        Ok(())
    }

    /// Runs `run_time` steps, recording at t = 0, every `out_increment` steps and at the end.
    pub fn run(&mut self) -> Result<()> {
        let total_steps = self.config.timing.run_time;
        let out_increment = self.config.timing.out_increment.max(1);
        info!(
            "Replicate {}: running {} steps from {} cells, recording every {} steps.",
            self.replicate,
            total_steps,
            self.population.len(),
            out_increment
        );

        self.population.record_population();

        let start_time = Instant::now();
        let mut previous_print_time = start_time;
        for step in 0..total_steps {
            let step_start_time = Instant::now();
            self.step()?;
            let step_duration = step_start_time.elapsed();

            let is_record_step = (step + 1) % out_increment == 0;
            let is_last_step = step + 1 == total_steps;
            if is_record_step || is_last_step {
                self.population.record_population();
            }

            let should_print_status = previous_print_time.elapsed().as_secs_f64() >= PRINT_INTERVAL_SECS;
            if should_print_status || is_last_step {
                info!(
                    "Replicate {} step [{}/{}] | Cells: {} | Step Time: {:6.2} ms | Elapsed: {:.2} s",
                    self.replicate,
                    step + 1,
                    total_steps,
                    self.population.len(),
                    step_duration.as_secs_f64() * 1000.0,
                    start_time.elapsed().as_secs_f64()
                );
                previous_print_time = Instant::now();
            } else {
                trace!(
                    "Step [{}/{}] completed in {:.2} ms",
                    step + 1,
                    total_steps,
                    step_duration.as_secs_f64() * 1000.0
                );
            }
        }

        let stats = self.population.stats();
        info!(
            "Replicate {} finished in {:.3} s with {} cells ({} divisions, {} of {} trials kept).",
            self.replicate,
            start_time.elapsed().as_secs_f64(),
            self.population.len(),
            stats.divisions,
            stats.grown + stats.accepted,
            stats.attempts
        );
        Ok(())
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn replicate(&self) -> u32 {
        self.replicate
    }

    pub fn population(&self) -> &CellPopulation<SeededRandom, DrasdoHohmeModel> {
        &self.population
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        self.population.snapshots()
    }
}
