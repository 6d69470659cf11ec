use crate::cell::{Cell, Trial, TrialKind};
use crate::model::{DrasdoHohmeModel, InteractionModel};
use crate::parameters::Parameters;
use crate::random::{RandomError, RandomSource};
use crate::spatial_hash::{Handle, SpatialHash, SpatialHashError};
use log::{debug, info, trace};
use simulation_common::{Point, Snapshot};
use std::f64::consts::TAU;
use std::sync::Arc;
use thiserror::Error;

/// Probability that a seeded cell starts in interphase rather than mitosis.
const INTERPHASE_FRACTION: f64 = 0.75;

#[derive(Debug, Error)]
pub enum PopulationError {
    #[error(transparent)]
    Random(#[from] RandomError),
    #[error(transparent)]
    Index(#[from] SpatialHashError),
    #[error("density must be finite and positive, got {0}")]
    InvalidDensity(f64),
    #[error("could not place cell {placed} of {requested} after {attempts} attempts (density too high for the available space)")]
    SeedingExhausted { placed: usize, requested: usize, attempts: u32 },
    #[error("seeding cancelled after {placed} cells")]
    Cancelled { placed: usize },
}

/// How a single trial move was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialOutcome {
    /// Growth trial kept without an energy test.
    Grown,
    Accepted,
    RejectedOverlap,
    RejectedBoundary,
    RejectedEnergy,
}

/// Running counters over every update attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateStats {
    pub attempts: u64,
    pub grown: u64,
    pub accepted: u64,
    pub rejected_overlap: u64,
    pub rejected_boundary: u64,
    pub rejected_energy: u64,
    pub divisions: u64,
}

impl UpdateStats {
    fn count(&mut self, outcome: TrialOutcome) {
        match outcome {
            TrialOutcome::Grown => self.grown += 1,
            TrialOutcome::Accepted => self.accepted += 1,
            TrialOutcome::RejectedOverlap => self.rejected_overlap += 1,
            TrialOutcome::RejectedBoundary => self.rejected_boundary += 1,
            TrialOutcome::RejectedEnergy => self.rejected_energy += 1,
        }
    }
}

/// A population of cells evolved by off-lattice Monte Carlo updates.
pub struct CellPopulation<R, M = DrasdoHohmeModel> {
    params: Arc<Parameters>,
    model: M,
    rng: R,
    cells: SpatialHash<Cell>,
    /// Effective boundary radius after auto-correction.
    boundary: f64,
    drug_added: bool,
    time_step: u32,
    stats: UpdateStats,
    records: Vec<Snapshot>,
}

impl<R: RandomSource, M: InteractionModel> CellPopulation<R, M> {
    fn empty(params: Arc<Parameters>, rng: R, model: M, boundary: f64) -> Result<Self, PopulationError> {
        let cells = SpatialHash::new(params.hash_resolution())?;
        Ok(CellPopulation {
            params,
            model,
            rng,
            cells,
            boundary,
            drug_added: false,
            time_step: 0,
            stats: UpdateStats::default(),
            records: Vec::new(),
        })
    }

    /// Seeds `size` cells uniformly over a disk of radius √(size/density).
    ///
    /// `should_stop` is consulted once before each cell is created; returning true aborts
    /// seeding with [`PopulationError::Cancelled`].
    pub fn seed<F>(
        params: Arc<Parameters>,
        rng: R,
        model: M,
        size: usize,
        density: f64,
        mut should_stop: F,
    ) -> Result<Self, PopulationError>
    where
        F: FnMut() -> bool,
    {
        if !(density > 0.0) || !density.is_finite() {
            return Err(PopulationError::InvalidDensity(density));
        }
        let disk_radius = (size as f64 / density).sqrt();
        let boundary = params.resolve_boundary(disk_radius);
        let mut population = Self::empty(params, rng, model, boundary)?;

        info!(
            "Seeding {} cells in a disk of radius {:.3} (boundary {:.3e}).",
            size, disk_radius, boundary
        );
        for placed in 0..size {
            if should_stop() {
                return Err(PopulationError::Cancelled { placed });
            }
            let cell = population.new_seed_cell()?;
            population.place_randomly(cell, disk_radius, placed, size)?;
        }
        debug!("Seeding finished with {} cells.", population.len());
        Ok(population)
    }

    /// Builds a population from explicit cells. The boundary is resolved against the
    /// farthest cell coordinate from the origin.
    pub fn with_cells(
        params: Arc<Parameters>,
        rng: R,
        model: M,
        cells: Vec<Cell>,
    ) -> Result<Self, PopulationError> {
        let disk_radius = cells.iter().map(|c| c.coord().norm()).fold(0.0, f64::max);
        let boundary = params.resolve_boundary(disk_radius);
        let mut population = Self::empty(params, rng, model, boundary)?;
        for cell in cells {
            population.cells.insert(cell.coord(), cell);
        }
        Ok(population)
    }

    /// A cell with a fresh growth rate, seeded in interphase or at a random point of mitosis.
    fn new_seed_cell(&mut self) -> Result<Cell, PopulationError> {
        let params = &self.params;
        let mut cell = Cell::new(Point::origin(), params);
        cell.set_growth_rate(params.random_growth_rate(&mut self.rng)?);

        if self.rng.unit() < INTERPHASE_FRACTION {
            let radius = self.rng.uniform(params.min_radius(), params.max_radius())?;
            cell.set_interphase_radius(radius);
        } else {
            cell.enter_random_point_of_mitosis(self.rng.unit(), params);
            cell.set_axis_angle(self.rng.uniform(0.0, TAU)?);
        }
        Ok(cell)
    }

    /// Rejection-samples a location in the seeding disk where `cell` overlaps nothing.
    fn place_randomly(
        &mut self,
        mut cell: Cell,
        disk_radius: f64,
        placed: usize,
        requested: usize,
    ) -> Result<Handle, PopulationError> {
        let attempts = self.params.max_placement_attempts();
        for _ in 0..attempts {
            let dist = self.rng.unit().sqrt() * disk_radius;
            let angle = self.rng.uniform(0.0, TAU)?;
            let coord = Point::origin().offset(angle, dist);
            cell.set_coord(coord);

            let search = self.params.terminal_axis_length();
            if cell.within_boundary(self.boundary) && !self.overlaps_any(&cell, None, coord, search) {
                return Ok(self.cells.insert(coord, cell));
            }
        }
        Err(PopulationError::SeedingExhausted { placed, requested, attempts })
    }

    /// True when `cell` overlaps any stored cell other than `own`, searching around `center`.
    fn overlaps_any(&self, cell: &Cell, own: Option<Handle>, center: Point, radius: f64) -> bool {
        self.cells
            .neighborhood(center, radius)
            .any(|(h, other)| Some(h) != own && cell.cell_distance(other) < 0.0)
    }

    /// One unit of simulated time: as many update attempts as there were cells when the step
    /// began. Daughters born during the step do not add attempts to it.
    pub fn one_time_step(&mut self) -> Result<(), PopulationError> {
        let size = self.cells.len();
        for _ in 0..size {
            self.update()?;
        }
        self.time_step += 1;
        debug!(
            "Time step {} done: {} cells, {} divisions so far.",
            self.time_step,
            self.cells.len(),
            self.stats.divisions
        );
        Ok(())
    }

    /// Picks a random cell, attempts one trial on it and divides it if it is ready.
    pub fn update(&mut self) -> Result<Option<TrialOutcome>, PopulationError> {
        let Some(handle) = self.cells.pick_random(&mut self.rng) else {
            return Ok(None);
        };
        self.stats.attempts += 1;
        let outcome = self.attempt_trial(handle)?;
        self.check_mitosis(handle)?;
        Ok(Some(outcome))
    }

    /// Lets the model draw a trial for the cell at `handle` and resolves it.
    pub fn attempt_trial(&mut self, handle: Handle) -> Result<TrialOutcome, PopulationError> {
        let cell = stored(&self.cells, handle)?;
        let trial = self.model.propose_trial(cell, &self.params, &mut self.rng)?;
        self.try_trial(handle, &trial)
    }

    /// Resolves a given trial on the cell at `handle`: overlap and boundary rejection,
    /// unconditional growth, energy acceptance for every other move.
    pub fn try_trial(&mut self, handle: Handle, trial: &Trial) -> Result<TrialOutcome, PopulationError> {
        let original = self.cell(handle)?.clone();
        let prev_energy = self.model.calculate_energy(&original, handle, &self.cells, &self.params);
        let prev_neighbors = self.model.num_neighbors(&original, handle, &self.cells, &self.params);

        let mut candidate = original.clone();
        candidate.apply(trial, &self.params);

        let outcome = if self.overlaps_any(&candidate, Some(handle), original.coord(), self.params.overlap_search_radius()) {
            TrialOutcome::RejectedOverlap
        } else if !candidate.within_boundary(self.boundary) {
            TrialOutcome::RejectedBoundary
        } else if trial.kind() == TrialKind::Growth {
            self.commit(handle, candidate)?;
            TrialOutcome::Grown
        } else {
            self.commit(handle, candidate)?;
            let moved = self.cell(handle)?;
            let new_energy = self.model.calculate_energy(moved, handle, &self.cells, &self.params);
            let new_neighbors = self.model.num_neighbors(moved, handle, &self.cells, &self.params);
            if self.model.accept_trial(prev_energy, new_energy, prev_neighbors, new_neighbors, &mut self.rng)? {
                TrialOutcome::Accepted
            } else {
                self.commit(handle, original)?;
                TrialOutcome::RejectedEnergy
            }
        };

        trace!("Trial {:?} on cell {}: {:?}", trial, handle.index(), outcome);
        self.stats.count(outcome);
        Ok(outcome)
    }

    /// Stores `cell` at `handle` and moves its key to the cell's coordinate.
    fn commit(&mut self, handle: Handle, cell: Cell) -> Result<(), PopulationError> {
        let coord = cell.coord();
        let slot = self
            .cells
            .get_mut(handle)
            .ok_or(SpatialHashError::UnknownHandle(handle.index()))?;
        *slot = cell;
        self.cells.relocate(handle, coord)?;
        Ok(())
    }

    /// Divides the cell at `handle` if it finished mitosis. Returns true when it divided.
    pub fn check_mitosis(&mut self, handle: Handle) -> Result<bool, PopulationError> {
        let parent = self.cell(handle)?;
        if !parent.ready_to_divide(&self.params) {
            return Ok(false);
        }
        let parent_rate = parent.growth_rate();

        let growth_rate = if self.params.inherit_growth() {
            parent_rate
        } else {
            let rate = self.params.random_growth_rate(&mut self.rng)?;
            if self.drug_added {
                rate * self.params.drug_effect(rate)
            } else {
                rate
            }
        };

        let parent = self
            .cells
            .get_mut(handle)
            .ok_or(SpatialHashError::UnknownHandle(handle.index()))?;
        let mut daughter = parent.divide(&self.params);
        let parent_key = parent.coord();
        daughter.set_growth_rate(growth_rate);

        let daughter_key = daughter.coord();
        let daughter_handle = self.cells.insert(daughter_key, daughter);
        self.cells.relocate(handle, parent_key)?;
        self.stats.divisions += 1;
        trace!(
            "Cell {} divided; daughter {} at ({:.3}, {:.3}).",
            handle.index(),
            daughter_handle.index(),
            daughter_key.x,
            daughter_key.y
        );
        Ok(true)
    }

    /// Multiplies every growth rate by its drug effect. Each call compounds on the last.
    pub fn add_drug(&mut self) {
        let params = &self.params;
        for (_, cell) in self.cells.iter_mut() {
            let rate = cell.growth_rate();
            cell.set_growth_rate(rate * params.drug_effect(rate));
        }
        self.drug_added = true;
        info!("Drug applied to {} cells at time step {}.", self.cells.len(), self.time_step);
    }

    /// Appends a snapshot of every live cell to the recorded series.
    pub fn record_population(&mut self) -> &Snapshot {
        let snapshot = Snapshot {
            time_step: self.time_step,
            cells: self.cells.iter().map(|(_, c)| c.record()).collect(),
        };
        self.records.push(snapshot);
        &self.records[self.records.len() - 1]
    }

    pub fn cell(&self, handle: Handle) -> Result<&Cell, PopulationError> {
        stored(&self.cells, handle)
    }
}

fn stored(cells: &SpatialHash<Cell>, handle: Handle) -> Result<&Cell, PopulationError> {
    cells
        .get(handle)
        .ok_or(PopulationError::Index(SpatialHashError::UnknownHandle(handle.index())))
}

impl<R, M> CellPopulation<R, M> {
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cells(&self) -> &SpatialHash<Cell> {
        &self.cells
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn params(&self) -> &Arc<Parameters> {
        &self.params
    }

    pub fn boundary(&self) -> f64 {
        self.boundary
    }

    pub fn drug_added(&self) -> bool {
        self.drug_added
    }

    pub fn time_step(&self) -> u32 {
        self.time_step
    }

    pub fn stats(&self) -> &UpdateStats {
        &self.stats
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        &self.records
    }

    pub fn rng(&self) -> &R {
        &self.rng
    }
}
