use offlattice_engine::{
    Cell, CellPopulation, CountingRandom, DrasdoHohmeModel, DrugEffectTable, GrowthDistribution,
    Handle, InteractionModel, Parameters, PopulationError, RandomError, RandomSource, SeededRandom,
    SpatialHash, Trial, TrialOutcome,
};
use simulation_common::{MoveWeights, Point, SimParams, FIELDS_PER_CELL};
use std::sync::Arc;

/// Delegates to `DrasdoHohmeModel` and counts the trials it is asked to propose.
#[derive(Default)]
struct CountingModel {
    inner: DrasdoHohmeModel,
    proposals: std::cell::Cell<usize>,
}

impl InteractionModel for CountingModel {
    fn propose_trial(
        &self,
        cell: &Cell,
        params: &Parameters,
        rng: &mut dyn RandomSource,
    ) -> Result<Trial, RandomError> {
        self.proposals.set(self.proposals.get() + 1);
        self.inner.propose_trial(cell, params, rng)
    }

    fn accept_trial(
        &self,
        prev_energy: f64,
        new_energy: f64,
        prev_neighbors: usize,
        new_neighbors: usize,
        rng: &mut dyn RandomSource,
    ) -> Result<bool, RandomError> {
        self.inner.accept_trial(prev_energy, new_energy, prev_neighbors, new_neighbors, rng)
    }

    fn calculate_energy(&self, cell: &Cell, own: Handle, cells: &SpatialHash<Cell>, params: &Parameters) -> f64 {
        self.inner.calculate_energy(cell, own, cells, params)
    }

    fn num_neighbors(&self, cell: &Cell, own: Handle, cells: &SpatialHash<Cell>, params: &Parameters) -> usize {
        self.inner.num_neighbors(cell, own, cells, params)
    }
}

fn params_with(
    growth: GrowthDistribution,
    drug: DrugEffectTable,
    configure: impl FnOnce(&mut SimParams),
) -> Arc<Parameters> {
    let mut sim = SimParams::default();
    configure(&mut sim);
    Arc::new(Parameters::new(sim, growth, drug).unwrap())
}

fn params(configure: impl FnOnce(&mut SimParams)) -> Arc<Parameters> {
    params_with(
        GrowthDistribution::Normal { mean: 0.05, variance: 0.0001 },
        DrugEffectTable::default(),
        configure,
    )
}

fn seeded(params: Arc<Parameters>, size: usize, density: f64, seed: u64) -> CellPopulation<SeededRandom> {
    CellPopulation::seed(params, SeededRandom::new(seed), DrasdoHohmeModel, size, density, || false).unwrap()
}

fn assert_no_overlap(pop: &CellPopulation<SeededRandom>) {
    let cells: Vec<&Cell> = pop.cells().iter().map(|(_, c)| c).collect();
    for (i, a) in cells.iter().enumerate() {
        for b in &cells[i + 1..] {
            let gap = a.cell_distance(b);
            assert!(gap >= 0.0, "cells overlap by {}", -gap);
        }
    }
}

#[test]
fn seeding_places_cells_without_overlap() {
    let pop = seeded(params(|_| {}), 60, 0.05, 11);
    assert_eq!(pop.len(), 60);
    assert_eq!(pop.cells().iter().count(), 60);
    assert!(pop.cells().is_consistent());
    assert_no_overlap(&pop);
    assert_eq!(pop.boundary(), f64::MAX);
}

// Cells up to the default radius of sqrt(2) cover more than one unit of area each, so ten of
// them cannot be packed at density 1.0; a radius of 0.5 leaves room for random placement.
#[test]
fn ten_cells_at_unit_density_take_ten_attempts_per_step() {
    let p = params(|sim| sim.max_radius = 0.5);
    let mut pop = CellPopulation::seed(p, SeededRandom::new(2), CountingModel::default(), 10, 1.0, || false)
        .unwrap();

    pop.one_time_step().unwrap();

    assert_eq!(pop.model().proposals.get(), 10);
    assert_eq!(pop.stats().attempts, 10);
    assert_eq!(pop.time_step(), 1);
    assert!(pop.len() >= 10);
}

#[test]
fn each_rotation_update_takes_three_draws() {
    // pick the cell, pick the move kind, draw the angle; with no interaction energy the
    // acceptance test never draws and nothing grows or divides
    let p = params(|sim| {
        sim.max_radius = 0.5;
        sim.epsilon = 0.0;
        sim.move_weights = MoveWeights { growth: 0.0, translation: 0.0, deformation: 0.0, rotation: 1.0 };
    });
    let mut pop = CellPopulation::seed(
        p,
        CountingRandom::new(SeededRandom::new(2)),
        DrasdoHohmeModel,
        10,
        1.0,
        || false,
    )
    .unwrap();
    let draws_before = pop.rng().draws();

    pop.one_time_step().unwrap();

    assert_eq!(pop.stats().attempts, 10);
    assert_eq!(pop.rng().draws() - draws_before, 3 * 10);
    assert_eq!(pop.len(), 10);
}

#[test]
fn translation_out_of_the_boundary_is_rejected() {
    let p = params(|sim| sim.boundary = 1.0);
    let cell = Cell::new(Point::origin(), &p);
    let mut pop = CellPopulation::with_cells(p, SeededRandom::new(1), DrasdoHohmeModel, vec![cell]).unwrap();
    // a boundary below seeding radius + 2 is raised to it
    assert_eq!(pop.boundary(), 2.0);

    let handle = pop.cells().handles()[0];
    let outcome = pop.try_trial(handle, &Trial::Translation { dx: 5.0, dy: 0.0 }).unwrap();

    assert_eq!(outcome, TrialOutcome::RejectedBoundary);
    assert_eq!(pop.cell(handle).unwrap().coord(), Point::origin());
    assert_eq!(pop.cells().key(handle), Some(Point::origin()));
    assert_eq!(pop.stats().rejected_boundary, 1);
}

#[test]
fn overlapping_translation_is_rejected_and_reverted() {
    let p = params(|_| {});
    let a = Cell::new(Point::origin(), &p);
    let b = Cell::new(Point::new(2.5, 0.0), &p);
    let mut pop = CellPopulation::with_cells(p, SeededRandom::new(1), DrasdoHohmeModel, vec![a, b]).unwrap();

    let handle = pop.cells().handles()[0];
    let outcome = pop.try_trial(handle, &Trial::Translation { dx: 1.0, dy: 0.0 }).unwrap();

    assert_eq!(outcome, TrialOutcome::RejectedOverlap);
    assert_eq!(pop.cells().key(handle), Some(Point::origin()));
}

#[test]
fn growth_is_kept_without_an_energy_test() {
    let p = params(|_| {});
    let cell = Cell::new(Point::origin(), &p);
    let mut pop = CellPopulation::with_cells(p, SeededRandom::new(1), DrasdoHohmeModel, vec![cell]).unwrap();
    let handle = pop.cells().handles()[0];

    let outcome = pop
        .try_trial(handle, &Trial::Growth { increment: 0.1, mitosis_entry: 0.0 })
        .unwrap();

    assert_eq!(outcome, TrialOutcome::Grown);
    assert!((pop.cell(handle).unwrap().axis_length() - 2.1).abs() < 1e-12);
}

#[test]
fn division_adds_exactly_one_cell() {
    let p = params(|sim| sim.inherit_growth = true);
    let mut cell = Cell::new(Point::new(1.0, -1.0), &p);
    cell.set_growth_rate(0.07);
    cell.enter_random_point_of_mitosis(1.0, &p);
    let mut pop = CellPopulation::with_cells(p, SeededRandom::new(1), DrasdoHohmeModel, vec![cell]).unwrap();
    let handle = pop.cells().handles()[0];

    assert!(pop.check_mitosis(handle).unwrap());

    assert_eq!(pop.len(), 2);
    assert_eq!(pop.cells().iter().count(), 2);
    assert!(pop.cells().is_consistent());
    assert_eq!(pop.stats().divisions, 1);
    assert!(pop.cells().iter().all(|(_, c)| c.growth_rate() == 0.07));
    assert_no_overlap(&pop);
    // the parent is no longer ready
    assert!(!pop.check_mitosis(handle).unwrap());
}

#[test]
fn daughters_can_move_right_after_division() {
    let p = params(|_| {});
    for i in 0..100 {
        let angle = 0.0613 * i as f64;
        let mut cell = Cell::new(Point::new(3.0 * angle.cos(), 7.0 * angle.sin()), &p);
        cell.set_axis_angle(angle);
        cell.enter_random_point_of_mitosis(1.0, &p);
        let mut pop =
            CellPopulation::with_cells(p.clone(), SeededRandom::new(i), DrasdoHohmeModel, vec![cell]).unwrap();
        let handle = pop.cells().handles()[0];
        assert!(pop.check_mitosis(handle).unwrap());
        assert_no_overlap(&pop);

        for h in pop.cells().handles() {
            let rotated = pop.try_trial(h, &Trial::Rotation { delta: 0.1 }).unwrap();
            assert_eq!(rotated, TrialOutcome::Accepted, "rotation at angle {}", angle);
            let grown = pop
                .try_trial(h, &Trial::Growth { increment: 0.0, mitosis_entry: 0.0 })
                .unwrap();
            assert_eq!(grown, TrialOutcome::Grown, "growth at angle {}", angle);
        }
    }
}

#[test]
fn fresh_daughter_rates_are_attenuated_after_the_drug() {
    let p = params_with(
        GrowthDistribution::Empirical(vec![0.1]),
        DrugEffectTable::new(vec![(0.0, 0.5), (1.0, 0.5)]),
        |_| {},
    );
    let mut cell = Cell::new(Point::origin(), &p);
    cell.set_growth_rate(0.2);
    cell.enter_random_point_of_mitosis(1.0, &p);
    let mut pop = CellPopulation::with_cells(p, SeededRandom::new(1), DrasdoHohmeModel, vec![cell]).unwrap();
    pop.add_drug();

    let handle = pop.cells().handles()[0];
    assert!(pop.check_mitosis(handle).unwrap());

    let rates: Vec<f64> = pop.cells().iter().map(|(_, c)| c.growth_rate()).collect();
    assert_eq!(rates, vec![0.1, 0.05]);
}

#[test]
fn repeated_drug_compounds() {
    let p = params_with(
        GrowthDistribution::Normal { mean: 0.1, variance: 0.0 },
        DrugEffectTable::new(vec![(0.0, 0.5), (1.0, 0.5)]),
        |_| {},
    );
    let cells = (0..3)
        .map(|i| {
            let mut c = Cell::new(Point::new(5.0 * i as f64, 0.0), &p);
            c.set_growth_rate(0.1);
            c
        })
        .collect();
    let mut pop = CellPopulation::with_cells(p, SeededRandom::new(1), DrasdoHohmeModel, cells).unwrap();
    assert!(!pop.drug_added());

    pop.add_drug();
    pop.add_drug();

    assert!(pop.drug_added());
    for (_, c) in pop.cells().iter() {
        assert!((c.growth_rate() - 0.025).abs() < 1e-12);
    }
}

#[test]
fn committed_moves_keep_cells_apart_and_inside() {
    let p = params_with(
        GrowthDistribution::Normal { mean: 0.2, variance: 0.0 },
        DrugEffectTable::default(),
        |sim| {
            sim.max_radius = 1.0;
            sim.max_translation = 0.3;
            sim.max_deform = 0.3;
            sim.boundary = 1.0;
        },
    );
    let mut pop = seeded(p, 40, 0.1, 99);
    assert!(pop.boundary() < f64::MAX);

    for _ in 0..30 {
        pop.one_time_step().unwrap();
        assert_no_overlap(&pop);
        assert!(pop.cells().iter().all(|(_, c)| c.within_boundary(pop.boundary())));
        assert!(pop.cells().is_consistent());
        assert_eq!(pop.cells().iter().count(), pop.len());
    }
    assert!(pop.stats().divisions > 0);
    assert!(pop.len() > 40);
}

#[test]
fn same_seed_gives_the_same_run() {
    let run = |seed| {
        let mut pop = seeded(params(|_| {}), 20, 0.05, seed);
        for _ in 0..3 {
            pop.one_time_step().unwrap();
        }
        pop.record_population().flatten()
    };
    assert_eq!(run(5), run(5));
    assert_ne!(run(5), run(6));
}

#[test]
fn recording_appends_flat_snapshots() {
    let mut pop = seeded(params(|_| {}), 15, 0.05, 3);
    let flat = pop.record_population().flatten();
    assert_eq!(flat.len(), 15 * FIELDS_PER_CELL);
    pop.one_time_step().unwrap();
    pop.record_population();

    let steps: Vec<u32> = pop.snapshots().iter().map(|s| s.time_step).collect();
    assert_eq!(steps, vec![0, 1]);
    assert_eq!(pop.snapshots()[1].population_size(), pop.len());
}

#[test]
fn seeding_can_be_cancelled() {
    let mut calls = 0;
    let result = CellPopulation::seed(
        params(|_| {}),
        SeededRandom::new(1),
        DrasdoHohmeModel,
        10,
        0.05,
        || {
            calls += 1;
            calls > 2
        },
    );
    assert!(matches!(result, Err(PopulationError::Cancelled { placed: 2 })));
}

#[test]
fn overcrowded_seeding_gives_up() {
    let p = params(|sim| sim.max_placement_attempts = 20);
    let result = CellPopulation::seed(p, SeededRandom::new(1), DrasdoHohmeModel, 50, 50.0, || false);
    match result {
        Err(PopulationError::SeedingExhausted { placed, requested, attempts }) => {
            assert!(placed >= 1 && placed < 50);
            assert_eq!(requested, 50);
            assert_eq!(attempts, 20);
        }
        other => panic!("expected SeedingExhausted, got {:?}", other.map(|p| p.len())),
    }
}

#[test]
fn non_positive_density_is_rejected() {
    let result = CellPopulation::seed(params(|_| {}), SeededRandom::new(1), DrasdoHohmeModel, 5, 0.0, || false);
    assert!(matches!(result, Err(PopulationError::InvalidDensity(_))));
}
