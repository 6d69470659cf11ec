//! Physical model plugged into the Monte Carlo loop: which trial a cell attempts, the energy
//! of a configuration, and the rule deciding whether a trial is kept.

use crate::cell::{Cell, CellPhase, Trial, TrialKind};
use crate::parameters::Parameters;
use crate::random::{RandomError, RandomSource};
use crate::spatial_hash::{Handle, SpatialHash};
use std::f64::consts::TAU;

pub trait InteractionModel {
    /// Draws the next trial move for `cell`.
    fn propose_trial(
        &self,
        cell: &Cell,
        params: &Parameters,
        rng: &mut dyn RandomSource,
    ) -> Result<Trial, RandomError>;

    /// Decides whether a trial that passed the overlap and boundary checks is kept.
    fn accept_trial(
        &self,
        prev_energy: f64,
        new_energy: f64,
        prev_neighbors: usize,
        new_neighbors: usize,
        rng: &mut dyn RandomSource,
    ) -> Result<bool, RandomError>;

    /// Interaction energy of `cell` with every other stored cell. `own` is skipped.
    fn calculate_energy(&self, cell: &Cell, own: Handle, cells: &SpatialHash<Cell>, params: &Parameters) -> f64;

    /// Number of other cells interacting with `cell`. `own` is skipped.
    fn num_neighbors(&self, cell: &Cell, own: Handle, cells: &SpatialHash<Cell>, params: &Parameters) -> usize;
}

/// Drasdo–Höhme style compression model.
///
/// Cells within `delta` of each other interact through ε((2d/δ − 1)² − 1), which is zero at
/// contact and at δ and has its minimum −ε at δ/2. Trials that lose neighbors are never kept.
#[derive(Debug, Clone, Copy, Default)]
pub struct DrasdoHohmeModel;

impl DrasdoHohmeModel {
    fn pick_kind(&self, cell: &Cell, params: &Parameters, rng: &mut dyn RandomSource) -> TrialKind {
        let w = params.move_weights();
        let deformation = match cell.phase() {
            CellPhase::Interphase => 0.0,
            CellPhase::Mitosis => w.deformation,
        };
        let options = [
            (TrialKind::Growth, w.growth),
            (TrialKind::Translation, w.translation),
            (TrialKind::Deformation, deformation),
            (TrialKind::Rotation, w.rotation),
        ];
        let total: f64 = options.iter().map(|(_, weight)| weight).sum();
        if !(total > 0.0) {
            return TrialKind::Growth;
        }

        let mut target = rng.unit() * total;
        for (kind, weight) in options {
            if weight > 0.0 && target < weight {
                return kind;
            }
            target -= weight;
        }
        // rounding left us past the last bucket
        options
            .iter()
            .rev()
            .find(|(_, weight)| *weight > 0.0)
            .map_or(TrialKind::Growth, |(kind, _)| *kind)
    }

    fn pair_energy(&self, distance: f64, params: &Parameters) -> f64 {
        if distance > params.delta() {
            return 0.0;
        }
        let part = (2.0 * distance / params.delta() - 1.0).powi(2);
        params.epsilon() * (part - 1.0)
    }
}

impl InteractionModel for DrasdoHohmeModel {
    fn propose_trial(
        &self,
        cell: &Cell,
        params: &Parameters,
        rng: &mut dyn RandomSource,
    ) -> Result<Trial, RandomError> {
        let trial = match self.pick_kind(cell, params, rng) {
            TrialKind::Growth => match cell.phase() {
                CellPhase::Interphase => Trial::Growth {
                    increment: rng.uniform(0.0, cell.growth_rate().max(0.0))?,
                    mitosis_entry: rng.unit(),
                },
                CellPhase::Mitosis => Trial::Growth {
                    increment: rng.uniform(0.0, params.max_deform())?,
                    mitosis_entry: 0.0,
                },
            },
            TrialKind::Translation => {
                let length = rng.uniform(0.0, params.max_translation())?;
                let angle = rng.uniform(0.0, TAU)?;
                Trial::Translation { dx: length * angle.cos(), dy: length * angle.sin() }
            }
            TrialKind::Deformation => Trial::Deformation {
                delta: rng.uniform(-params.max_deform(), params.max_deform())?,
            },
            TrialKind::Rotation => Trial::Rotation {
                delta: rng.uniform(-params.max_rotate(), params.max_rotate())?,
            },
        };
        Ok(trial)
    }

    fn accept_trial(
        &self,
        prev_energy: f64,
        new_energy: f64,
        prev_neighbors: usize,
        new_neighbors: usize,
        rng: &mut dyn RandomSource,
    ) -> Result<bool, RandomError> {
        if new_neighbors < prev_neighbors {
            return Ok(false);
        }
        let delta_energy = new_energy - prev_energy;
        if delta_energy <= 0.0 {
            return Ok(true);
        }
        Ok(rng.uniform(0.0, 1.0)? < (-delta_energy).exp())
    }

    fn calculate_energy(&self, cell: &Cell, own: Handle, cells: &SpatialHash<Cell>, params: &Parameters) -> f64 {
        cells
            .neighborhood(cell.coord(), params.interaction_search_radius())
            .filter(|(h, _)| *h != own)
            .map(|(_, other)| self.pair_energy(cell.cell_distance(other), params))
            .sum()
    }

    fn num_neighbors(&self, cell: &Cell, own: Handle, cells: &SpatialHash<Cell>, params: &Parameters) -> usize {
        cells
            .neighborhood(cell.coord(), params.interaction_search_radius())
            .filter(|(h, other)| *h != own && cell.cell_distance(other) <= params.delta())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::{DrugEffectTable, GrowthDistribution};
    use crate::random::{CountingRandom, SeededRandom};
    use simulation_common::{MoveWeights, Point, SimParams};

    fn params_with(sim: SimParams) -> Parameters {
        Parameters::new(
            sim,
            GrowthDistribution::Normal { mean: 0.05, variance: 0.0 },
            DrugEffectTable::default(),
        )
        .unwrap()
    }

    fn params() -> Parameters {
        let mut sim = SimParams::default();
        sim.epsilon = 2.0;
        sim.delta = 0.4;
        params_with(sim)
    }

    #[test]
    fn pair_energy_shape() {
        let p = params();
        let model = DrasdoHohmeModel;
        assert!(model.pair_energy(0.0, &p).abs() < 1e-12);
        assert!((model.pair_energy(0.2, &p) + 2.0).abs() < 1e-12);
        assert!(model.pair_energy(0.4, &p).abs() < 1e-12);
        assert_eq!(model.pair_energy(0.41, &p), 0.0);
    }

    #[test]
    fn energy_and_neighbors_skip_self_and_far_cells() {
        let p = params();
        let model = DrasdoHohmeModel;
        let mut cells = SpatialHash::new(1.0).unwrap();
        let focal = Cell::with_radius(Point::origin(), 1.0);
        let own = cells.insert(focal.coord(), focal.clone());
        // gap 0.2 -> energy -2
        let near = Cell::with_radius(Point::new(2.2, 0.0), 1.0);
        cells.insert(near.coord(), near);
        // gap 3.0 -> no interaction
        let far = Cell::with_radius(Point::new(0.0, 5.0), 1.0);
        cells.insert(far.coord(), far);

        assert_eq!(model.num_neighbors(&focal, own, &cells, &p), 1);
        assert!((model.calculate_energy(&focal, own, &cells, &p) + 2.0).abs() < 1e-9);
    }

    #[test]
    fn non_increasing_energy_is_accepted_without_drawing() {
        let model = DrasdoHohmeModel;
        let mut rng = CountingRandom::new(SeededRandom::new(1));
        assert!(model.accept_trial(1.0, 0.5, 2, 2, &mut rng).unwrap());
        assert!(model.accept_trial(1.0, 1.0, 2, 3, &mut rng).unwrap());
        assert_eq!(rng.draws(), 0);
    }

    #[test]
    fn losing_neighbors_is_always_rejected() {
        let model = DrasdoHohmeModel;
        let mut rng = CountingRandom::new(SeededRandom::new(1));
        assert!(!model.accept_trial(0.0, -100.0, 3, 0, &mut rng).unwrap());
        assert!(!model.accept_trial(5.0, 0.0, 1, 0, &mut rng).unwrap());
        assert_eq!(rng.draws(), 0);
    }

    #[test]
    fn energy_increase_is_accepted_with_boltzmann_probability() {
        let model = DrasdoHohmeModel;
        let mut rng = SeededRandom::new(8);
        let trials = 20_000;
        let accepted = (0..trials)
            .filter(|_| model.accept_trial(0.0, 1.0, 1, 1, &mut rng).unwrap())
            .count();
        let rate = accepted as f64 / trials as f64;
        assert!((rate - (-1.0f64).exp()).abs() < 0.02, "acceptance rate {}", rate);
        // an enormous increase is effectively never accepted
        assert!(!model.accept_trial(0.0, 1e6, 1, 1, &mut rng).unwrap());
    }

    #[test]
    fn interphase_cells_never_deform() {
        let mut sim = SimParams::default();
        sim.move_weights = MoveWeights { growth: 0.0, translation: 0.0, deformation: 1.0, rotation: 1.0 };
        let p = params_with(sim);
        let model = DrasdoHohmeModel;
        let mut rng = SeededRandom::new(3);
        let cell = Cell::new(Point::origin(), &p);
        for _ in 0..200 {
            let trial = model.propose_trial(&cell, &p, &mut rng).unwrap();
            assert_eq!(trial.kind(), TrialKind::Rotation);
        }
    }

    #[test]
    fn proposed_magnitudes_respect_limits() {
        let p = params();
        let model = DrasdoHohmeModel;
        let mut rng = SeededRandom::new(21);
        let mut cell = Cell::new(Point::origin(), &p);
        cell.set_growth_rate(0.05);
        cell.enter_random_point_of_mitosis(0.2, &p);
        for _ in 0..1000 {
            match model.propose_trial(&cell, &p, &mut rng).unwrap() {
                Trial::Growth { increment, .. } => assert!((0.0..=p.max_deform()).contains(&increment)),
                Trial::Translation { dx, dy } => assert!(dx.hypot(dy) <= p.max_translation() + 1e-12),
                Trial::Deformation { delta } => assert!(delta.abs() <= p.max_deform()),
                Trial::Rotation { delta } => assert!(delta.abs() <= p.max_rotate()),
            }
        }
    }
}
