use serde::{Deserialize, Serialize};
use anyhow::Result;
use crate::sim_params::{MoveWeights, SimParams};
use std::path::Path;

// Initial population and world settings
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct PopulationConfig {
    pub initial_num: u32,
    pub density: f64,
    #[serde(default)]
    pub boundary: f64, // 0 = unbounded
    pub seed: u64,
    #[serde(default = "default_replicates")]
    pub replicates: u32,
    #[serde(default = "default_max_placement_attempts")]
    pub max_placement_attempts: u32,
}

// Configuration for timing, in Monte Carlo time steps
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct TimingConfig {
    pub run_time: u32,
    #[serde(default = "default_out_increment")]
    pub out_increment: u32,
}

// Parameters for cell shape and growth
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct CellConfig {
    #[serde(default = "default_max_radius")]
    pub max_radius: f64,
    pub growth_mean: f64,
    #[serde(default)]
    pub growth_variance: f64,
    /// Empirical growth rates; when non-empty they replace the normal distribution.
    #[serde(default)]
    pub growth_values: Vec<f64>,
    #[serde(default)]
    pub inherit_growth: bool,
    #[serde(default = "default_hash_resolution")]
    pub hash_resolution: f64,
}

// Trial move magnitudes and relative frequencies
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct MovesConfig {
    pub max_translation: f64,
    pub max_deform: f64,
    pub max_rotate: f64,
    #[serde(default = "default_weight")]
    pub growth_weight: f64,
    #[serde(default = "default_weight")]
    pub translation_weight: f64,
    #[serde(default = "default_weight")]
    pub deformation_weight: f64,
    #[serde(default = "default_weight")]
    pub rotation_weight: f64,
}

// Interaction potential coefficients
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct EnergyConfig {
    pub epsilon: f64,
    pub delta: f64,
}

// Drug schedule and dose-response table
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct DrugConfig {
    /// Time step before which the drug is applied. None = never.
    #[serde(default)]
    pub time: Option<u32>,
    /// (growth rate, suppression factor) pairs.
    #[serde(default)]
    pub effects: Vec<[f64; 2]>,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Json,
    Bincode,
    Messagepack,
}

// Configuration for output settings
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct OutputConfig {
    pub base_filename: String,
    #[serde(default = "default_format")]
    pub format: OutputFormat,
    #[serde(default = "default_true")]
    pub save_snapshots: bool,
    #[serde(default = "default_true")]
    pub save_table: bool, // CSV table, one row per cell per recorded step
}

// Main simulation configuration structure, loaded from config.toml.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct SimulationConfig {
    pub population: PopulationConfig,
    pub timing: TimingConfig,
    pub cell: CellConfig,
    pub moves: MovesConfig,
    pub energy: EnergyConfig,
    #[serde(default)]
    pub drug: DrugConfig,
    pub output: OutputConfig,
}

fn default_replicates() -> u32 {
    1
}

fn default_max_placement_attempts() -> u32 {
    10_000
}

fn default_out_increment() -> u32 {
    1
}

fn default_max_radius() -> f64 {
    std::f64::consts::SQRT_2
}

fn default_hash_resolution() -> f64 {
    1.0
}

fn default_weight() -> f64 {
    1.0
}

fn default_format() -> OutputFormat {
    OutputFormat::Json
}

fn default_true() -> bool {
    true
}

impl SimulationConfig {
    /// Loads the simulation configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();

        let config_str = std::fs::read_to_string(path_ref)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path_ref.display(), e))?;
        Self::from_toml_str(&config_str)
            .map_err(|e| anyhow::anyhow!("Invalid config '{}': {}", path_ref.display(), e))
    }

    /// Parses and validates a configuration from TOML text.
    pub fn from_toml_str(config_str: &str) -> Result<Self> {
        let config: SimulationConfig = toml::from_str(config_str)
            .map_err(|e| anyhow::anyhow!("Failed to parse TOML: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values the engine cannot run with. The boundary is not checked here:
    /// non-positive or too small boundaries are auto-corrected at population construction.
    pub fn validate(&self) -> Result<()> {
        if self.population.initial_num == 0 {
            anyhow::bail!("initial_num must be greater than 0.");
        }
        if !(self.population.density > 0.0) || !self.population.density.is_finite() {
            anyhow::bail!("density must be positive, got {}.", self.population.density);
        }
        if self.population.replicates == 0 {
            anyhow::bail!("replicates must be greater than 0.");
        }
        if self.population.max_placement_attempts == 0 {
            anyhow::bail!("max_placement_attempts must be greater than 0.");
        }
        if self.timing.out_increment == 0 {
            anyhow::bail!("out_increment must be at least 1.");
        }
        if !(self.cell.max_radius > 0.0) {
            anyhow::bail!("max_radius must be positive.");
        }
        if !(self.cell.hash_resolution > 0.0) || !self.cell.hash_resolution.is_finite() {
            anyhow::bail!("hash_resolution must be positive.");
        }
        if self.cell.growth_values.is_empty() && !(self.cell.growth_mean > 0.0) {
            anyhow::bail!("growth_mean must be positive.");
        }
        if self.cell.growth_variance < 0.0 {
            anyhow::bail!("growth_variance must not be negative.");
        }
        if self.cell.growth_values.iter().any(|g| *g < 0.0 || !g.is_finite()) {
            anyhow::bail!("growth_values must be finite and non-negative.");
        }
        for (name, value) in [
            ("max_translation", self.moves.max_translation),
            ("max_deform", self.moves.max_deform),
            ("max_rotate", self.moves.max_rotate),
            ("growth_weight", self.moves.growth_weight),
            ("translation_weight", self.moves.translation_weight),
            ("deformation_weight", self.moves.deformation_weight),
            ("rotation_weight", self.moves.rotation_weight),
        ] {
            if value < 0.0 || !value.is_finite() {
                anyhow::bail!("{} must be finite and non-negative, got {}.", name, value);
            }
        }
        if !(self.energy.delta > 0.0) {
            anyhow::bail!("delta must be positive.");
        }
        Ok(())
    }

    /// Converts the configuration into simulation parameters used at runtime.
    pub fn get_sim_params(&self) -> SimParams {
        SimParams {
            max_translation: self.moves.max_translation,
            max_deform: self.moves.max_deform,
            max_rotate: self.moves.max_rotate,
            move_weights: MoveWeights {
                growth: self.moves.growth_weight,
                translation: self.moves.translation_weight,
                deformation: self.moves.deformation_weight,
                rotation: self.moves.rotation_weight,
            },
            epsilon: self.energy.epsilon,
            delta: self.energy.delta,
            max_radius: self.cell.max_radius,
            inherit_growth: self.cell.inherit_growth,
            boundary: self.population.boundary,
            hash_resolution: self.cell.hash_resolution,
            max_placement_attempts: self.population.max_placement_attempts,
        }
    }

    /// Seed used by replicate `index`.
    pub fn replicate_seed(&self, index: u32) -> u64 {
        self.population.seed.wrapping_add(u64::from(index))
    }
}
