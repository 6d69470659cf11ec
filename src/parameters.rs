use crate::random::{RandomError, RandomSource};
use log::warn;
use simulation_common::{MoveWeights, SimParams, SimulationConfig};
use std::f64::consts::{PI, SQRT_2};
use thiserror::Error;

/// Number of intervals in the precomputed radius table.
const RADIUS_TABLE_INTERVALS: usize = 2000;
/// Bisection iterations per table entry.
const BISECTION_STEPS: usize = 100;
/// Redraws of a non-positive normal growth rate before falling back to the mean.
const MAX_GROWTH_REDRAWS: usize = 100;

#[derive(Debug, Error, PartialEq)]
pub enum ParameterError {
    #[error("max_radius must be finite and positive, got {0}")]
    InvalidMaxRadius(f64),
    #[error("delta must be finite and positive, got {0}")]
    InvalidDelta(f64),
    #[error("growth distribution has no values")]
    EmptyGrowthValues,
    #[error("growth mean must be positive, got {0}")]
    InvalidGrowthMean(f64),
}

/// Area of the union of two disks of radius `r` whose centers are `d` apart (0 <= d <= 2r).
pub fn lobe_union_area(r: f64, d: f64) -> f64 {
    let d = d.clamp(0.0, 2.0 * r);
    let lens = 2.0 * r * r * (d / (2.0 * r)).acos() - 0.5 * d * (4.0 * r * r - d * d).max(0.0).sqrt();
    2.0 * PI * r * r - lens
}

/// Maps a mitotic axis length to the lobe radius that conserves the cell's area.
///
/// During mitosis a cell of maximum radius R stretches from one disk (axis 2R) into two
/// touching disks of radius R/√2 (axis 2√2·R) while its area stays πR². The relation between
/// axis length and lobe radius has no closed form, so it is solved once into a table.
#[derive(Debug, Clone)]
pub struct RadiusSolver {
    max_radius: f64,
    min_axis: f64,
    max_axis: f64,
    table: Vec<f64>,
}

impl RadiusSolver {
    pub fn new(max_radius: f64) -> Self {
        let min_axis = 2.0 * max_radius;
        let max_axis = 2.0 * SQRT_2 * max_radius;
        let target = PI * max_radius * max_radius;
        let step = (max_axis - min_axis) / RADIUS_TABLE_INTERVALS as f64;

        let table = (0..=RADIUS_TABLE_INTERVALS)
            .map(|i| {
                let axis = min_axis + step * i as f64;
                let (mut lo, mut hi) = (max_radius / SQRT_2, max_radius);
                for _ in 0..BISECTION_STEPS {
                    let mid = 0.5 * (lo + hi);
                    if lobe_union_area(mid, axis - 2.0 * mid) < target {
                        lo = mid;
                    } else {
                        hi = mid;
                    }
                }
                0.5 * (lo + hi)
            })
            .collect();

        RadiusSolver { max_radius, min_axis, max_axis, table }
    }

    /// Lobe radius for a given axis length.
    pub fn radius(&self, axis_length: f64) -> f64 {
        if axis_length <= self.min_axis {
            return 0.5 * axis_length;
        }
        if axis_length >= self.max_axis {
            return self.max_radius / SQRT_2;
        }
        let pos = (axis_length - self.min_axis) / (self.max_axis - self.min_axis) * RADIUS_TABLE_INTERVALS as f64;
        let idx = (pos.floor() as usize).min(RADIUS_TABLE_INTERVALS - 1);
        let frac = pos - idx as f64;
        self.table[idx] + frac * (self.table[idx + 1] - self.table[idx])
    }

    /// Axis length at which a mitotic cell is ready to divide.
    pub fn terminal_axis_length(&self) -> f64 {
        self.max_axis
    }
}

/// Distribution growth rates are drawn from.
#[derive(Debug, Clone)]
pub enum GrowthDistribution {
    /// Normal draw truncated to positive values.
    Normal { mean: f64, variance: f64 },
    /// Uniform choice among observed rates.
    Empirical(Vec<f64>),
}

impl GrowthDistribution {
    pub fn sample<R: RandomSource + ?Sized>(&self, rng: &mut R) -> Result<f64, RandomError> {
        match self {
            GrowthDistribution::Normal { mean, variance } => {
                for _ in 0..MAX_GROWTH_REDRAWS {
                    let rate = rng.normal(*mean, *variance)?;
                    if rate > 0.0 {
                        return Ok(rate);
                    }
                }
                Ok(*mean)
            }
            GrowthDistribution::Empirical(values) => {
                let idx = ((rng.unit() * values.len() as f64) as usize).min(values.len() - 1);
                Ok(values[idx])
            }
        }
    }
}

/// Growth-rate dependent drug suppression, linearly interpolated between table points.
#[derive(Debug, Clone, Default)]
pub struct DrugEffectTable {
    points: Vec<(f64, f64)>,
}

impl DrugEffectTable {
    pub fn new(mut points: Vec<(f64, f64)>) -> Self {
        points.retain(|(rate, factor)| rate.is_finite() && factor.is_finite());
        points.sort_by(|a, b| a.0.total_cmp(&b.0));
        DrugEffectTable { points }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Multiplicative factor for `growth_rate`; 1.0 for an empty table, end values outside it.
    pub fn effect(&self, growth_rate: f64) -> f64 {
        let (first, last) = match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => return 1.0,
        };
        if growth_rate <= first.0 {
            return first.1;
        }
        if growth_rate >= last.0 {
            return last.1;
        }
        let upper = self.points.partition_point(|(rate, _)| *rate <= growth_rate);
        let (r0, f0) = self.points[upper - 1];
        let (r1, f1) = self.points[upper];
        if r1 == r0 {
            return f1;
        }
        f0 + (growth_rate - r0) / (r1 - r0) * (f1 - f0)
    }
}

/// Immutable configuration of one simulation run together with its derived models.
#[derive(Debug, Clone)]
pub struct Parameters {
    sim: SimParams,
    solver: RadiusSolver,
    growth: GrowthDistribution,
    drug: DrugEffectTable,
}

impl Parameters {
    pub fn new(sim: SimParams, growth: GrowthDistribution, drug: DrugEffectTable) -> Result<Self, ParameterError> {
        if !(sim.max_radius > 0.0) || !sim.max_radius.is_finite() {
            return Err(ParameterError::InvalidMaxRadius(sim.max_radius));
        }
        if !(sim.delta > 0.0) || !sim.delta.is_finite() {
            return Err(ParameterError::InvalidDelta(sim.delta));
        }
        match &growth {
            GrowthDistribution::Empirical(values) if values.is_empty() => {
                return Err(ParameterError::EmptyGrowthValues)
            }
            GrowthDistribution::Normal { mean, .. } if !(*mean > 0.0) => {
                return Err(ParameterError::InvalidGrowthMean(*mean))
            }
            _ => {}
        }
        let solver = RadiusSolver::new(sim.max_radius);
        Ok(Parameters { sim, solver, growth, drug })
    }

    pub fn from_config(config: &SimulationConfig) -> Result<Self, ParameterError> {
        let growth = if config.cell.growth_values.is_empty() {
            GrowthDistribution::Normal {
                mean: config.cell.growth_mean,
                variance: config.cell.growth_variance,
            }
        } else {
            GrowthDistribution::Empirical(config.cell.growth_values.clone())
        };
        let drug = DrugEffectTable::new(config.drug.effects.iter().map(|[r, f]| (*r, *f)).collect());
        Self::new(config.get_sim_params(), growth, drug)
    }

    pub fn sim(&self) -> &SimParams {
        &self.sim
    }

    pub fn max_translation(&self) -> f64 {
        self.sim.max_translation
    }

    pub fn max_deform(&self) -> f64 {
        self.sim.max_deform
    }

    pub fn max_rotate(&self) -> f64 {
        self.sim.max_rotate
    }

    pub fn epsilon(&self) -> f64 {
        self.sim.epsilon
    }

    pub fn delta(&self) -> f64 {
        self.sim.delta
    }

    pub fn max_radius(&self) -> f64 {
        self.sim.max_radius
    }

    /// Radius of a newborn daughter cell.
    pub fn min_radius(&self) -> f64 {
        self.sim.max_radius / SQRT_2
    }

    pub fn inherit_growth(&self) -> bool {
        self.sim.inherit_growth
    }

    pub fn move_weights(&self) -> &MoveWeights {
        &self.sim.move_weights
    }

    pub fn hash_resolution(&self) -> f64 {
        self.sim.hash_resolution
    }

    pub fn max_placement_attempts(&self) -> u32 {
        self.sim.max_placement_attempts
    }

    pub fn growth_distribution(&self) -> &GrowthDistribution {
        &self.growth
    }

    pub fn random_growth_rate<R: RandomSource + ?Sized>(&self, rng: &mut R) -> Result<f64, RandomError> {
        self.growth.sample(rng)
    }

    pub fn drug_effect(&self, growth_rate: f64) -> f64 {
        self.drug.effect(growth_rate)
    }

    pub fn radius(&self, axis_length: f64) -> f64 {
        self.solver.radius(axis_length)
    }

    pub fn terminal_axis_length(&self) -> f64 {
        self.solver.terminal_axis_length()
    }

    /// Search radius around a cell's pre-move center that reaches every cell
    /// the moved cell could overlap.
    pub fn overlap_search_radius(&self) -> f64 {
        self.sim.max_translation + self.terminal_axis_length()
    }

    /// Search radius that reaches every cell within `delta` of a cell's footprint.
    pub fn interaction_search_radius(&self) -> f64 {
        self.sim.delta + self.terminal_axis_length()
    }

    /// Effective boundary for a population seeded in a disk of `disk_radius`.
    ///
    /// A requested boundary of 0 means unbounded and maps to `f64::MAX`. Any other value below
    /// `disk_radius + 2` (negative values included) is raised to that minimum.
    pub fn resolve_boundary(&self, disk_radius: f64) -> f64 {
        let requested = self.sim.boundary;
        let minimum = disk_radius + 2.0;
        if requested == 0.0 {
            f64::MAX
        } else if !(requested >= minimum) {
            warn!(
                "Boundary {} is smaller than the seeding radius + 2; using {:.4} instead.",
                requested, minimum
            );
            minimum
        } else {
            requested
        }
    }
}
