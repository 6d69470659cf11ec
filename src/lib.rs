//! Off-lattice Monte Carlo simulation of a growing 2D cell population.
//!
//! Cells are two-lobed shapes that grow, move, deform, rotate and divide. Every update
//! proposes a trial move for one random cell, rejects it if it overlaps a neighbor or leaves
//! the boundary, and otherwise keeps it according to a pairwise interaction energy.

pub mod cell;
pub mod model;
pub mod output;
pub mod parameters;
pub mod population;
pub mod random;
pub mod simulation;
pub mod spatial_hash;

pub use cell::{Cell, CellPhase, Trial, TrialKind};
pub use model::{DrasdoHohmeModel, InteractionModel};
pub use parameters::{DrugEffectTable, GrowthDistribution, ParameterError, Parameters, RadiusSolver};
pub use population::{CellPopulation, PopulationError, TrialOutcome, UpdateStats};
pub use random::{CountingRandom, RandomError, RandomSource, SeededRandom};
pub use simulation::Simulation;
pub use spatial_hash::{Handle, SpatialHash, SpatialHashError};
