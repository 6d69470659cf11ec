use serde::{Deserialize, Serialize};

/// Relative frequencies of the trial move kinds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MoveWeights {
    pub growth: f64,
    pub translation: f64,
    pub deformation: f64,
    pub rotation: f64,
}

impl Default for MoveWeights {
    fn default() -> Self {
        MoveWeights { growth: 1.0, translation: 1.0, deformation: 1.0, rotation: 1.0 }
    }
}

/// Simulation coefficients derived from the configuration, used frequently during simulation steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimParams {
    // Trial move magnitudes
    pub max_translation: f64,
    pub max_deform: f64,
    pub max_rotate: f64,
    pub move_weights: MoveWeights,

    // Interaction potential
    pub epsilon: f64, // Resistance strength
    pub delta: f64,   // Compression interaction radius

    // Cell Properties
    pub max_radius: f64, // Maximum interphase radius
    pub inherit_growth: bool,

    // World
    pub boundary: f64, // Requested boundary radius, 0 = unbounded
    pub hash_resolution: f64,
    pub max_placement_attempts: u32,
}

impl Default for SimParams {
    fn default() -> Self {
        SimParams {
            max_translation: 0.1,
            max_deform: 0.1,
            max_rotate: 0.3,
            move_weights: MoveWeights::default(),
            epsilon: 10.0,
            delta: 0.2,
            max_radius: std::f64::consts::SQRT_2,
            inherit_growth: false,
            boundary: 0.0,
            hash_resolution: 1.0,
            max_placement_attempts: 10_000,
        }
    }
}
