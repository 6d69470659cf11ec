pub mod config;
pub mod sim_params;
pub mod snapshot;
pub mod vecmath;

// Re-export key types for easier use by dependent crates
pub use config::{SimulationConfig, PopulationConfig, TimingConfig, CellConfig, MovesConfig, EnergyConfig, DrugConfig, OutputConfig, OutputFormat};
pub use sim_params::{MoveWeights, SimParams};
pub use snapshot::{CellRecord, Snapshot, FIELDS_PER_CELL};
pub use vecmath::{Point, angle_to_vec, wrap_angle, clamp};
