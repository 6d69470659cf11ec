use crate::parameters::Parameters;
use simulation_common::{clamp, wrap_angle, CellRecord, Point};

/// Slack allowed when comparing a mitotic axis against the division length.
const AXIS_EPS: f64 = 1e-12;
/// Initial clearance between two daughters; doubled until rounding leaves a non-negative gap.
const DIVISION_GAP: f64 = 1e-12;
/// Upper limit for the doubling of `DIVISION_GAP`.
const MAX_DIVISION_GAP: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellPhase {
    Interphase,
    Mitosis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrialKind {
    Growth,
    Translation,
    Deformation,
    Rotation,
}

/// A fully drawn trial move. Applying the same trial to the same cell always gives the same result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Trial {
    /// Interphase: axis grows by `increment`; on reaching 2R the cell enters mitosis
    /// `mitosis_entry` (in [0, 1)) of the way along the division trajectory.
    /// Mitosis: axis progresses by `increment` towards the division length.
    Growth { increment: f64, mitosis_entry: f64 },
    Translation { dx: f64, dy: f64 },
    Deformation { delta: f64 },
    Rotation { delta: f64 },
}

impl Trial {
    pub fn kind(&self) -> TrialKind {
        match self {
            Trial::Growth { .. } => TrialKind::Growth,
            Trial::Translation { .. } => TrialKind::Translation,
            Trial::Deformation { .. } => TrialKind::Deformation,
            Trial::Rotation { .. } => TrialKind::Rotation,
        }
    }
}

/// One cell: two disks ("lobes") of `radius` whose centers sit at `coord` ± (axis/2 − radius)
/// along `axis_angle`. In interphase both lobes coincide and the cell is a plain disk.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    coord: Point,
    radius: f64,
    axis_length: f64,
    axis_angle: f64,
    growth_rate: f64,
    phase: CellPhase,
    cell_type: u32,
}

impl Cell {
    /// A newborn interphase cell at `coord`.
    pub fn new(coord: Point, params: &Parameters) -> Self {
        Self::with_radius(coord, params.min_radius())
    }

    /// An interphase cell with the given radius.
    pub fn with_radius(coord: Point, radius: f64) -> Self {
        Cell {
            coord,
            radius,
            axis_length: 2.0 * radius,
            axis_angle: 0.0,
            growth_rate: 0.0,
            phase: CellPhase::Interphase,
            cell_type: 0,
        }
    }

    pub fn coord(&self) -> Point {
        self.coord
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn axis_length(&self) -> f64 {
        self.axis_length
    }

    pub fn axis_angle(&self) -> f64 {
        self.axis_angle
    }

    pub fn growth_rate(&self) -> f64 {
        self.growth_rate
    }

    pub fn phase(&self) -> CellPhase {
        self.phase
    }

    pub fn cell_type(&self) -> u32 {
        self.cell_type
    }

    pub fn set_coord(&mut self, coord: Point) {
        self.coord = coord;
    }

    pub fn set_growth_rate(&mut self, growth_rate: f64) {
        self.growth_rate = growth_rate;
    }

    pub fn set_axis_angle(&mut self, angle: f64) {
        self.axis_angle = wrap_angle(angle);
    }

    pub fn set_cell_type(&mut self, cell_type: u32) {
        self.cell_type = cell_type;
    }

    /// Puts the cell in interphase with the given radius.
    pub fn set_interphase_radius(&mut self, radius: f64) {
        self.phase = CellPhase::Interphase;
        self.radius = radius;
        self.axis_length = 2.0 * radius;
    }

    /// Puts the cell in mitosis, `fraction` (clamped to [0, 1]) of the way from the
    /// round shape to the division shape.
    pub fn enter_random_point_of_mitosis(&mut self, fraction: f64, params: &Parameters) {
        let start = 2.0 * params.max_radius();
        let end = params.terminal_axis_length();
        self.phase = CellPhase::Mitosis;
        self.axis_length = start + clamp(fraction, 0.0, 1.0) * (end - start);
        self.radius = params.radius(self.axis_length);
    }

    /// Centers of the two lobes.
    pub fn foci(&self) -> (Point, Point) {
        let half = 0.5 * self.axis_length - self.radius;
        (
            self.coord.offset(self.axis_angle, half),
            self.coord.offset(self.axis_angle, -half),
        )
    }

    /// Gap between the two cell boundaries; negative by the overlap depth when they overlap.
    pub fn cell_distance(&self, other: &Cell) -> f64 {
        let (a1, a2) = self.foci();
        let (b1, b2) = other.foci();
        let centers = a1
            .distance(b1)
            .min(a1.distance(b2))
            .min(a2.distance(b1))
            .min(a2.distance(b2));
        // summed first so that a.cell_distance(b) == b.cell_distance(a) exactly
        centers - (self.radius + other.radius)
    }

    /// True when both lobes lie inside the disk of radius `boundary` around the origin.
    pub fn within_boundary(&self, boundary: f64) -> bool {
        let (f1, f2) = self.foci();
        f1.norm() + self.radius <= boundary && f2.norm() + self.radius <= boundary
    }

    /// Applies a trial move in place.
    pub fn apply(&mut self, trial: &Trial, params: &Parameters) {
        match *trial {
            Trial::Growth { increment, mitosis_entry } => match self.phase {
                CellPhase::Interphase => {
                    let axis = self.axis_length + increment.max(0.0);
                    if axis >= 2.0 * params.max_radius() {
                        self.enter_random_point_of_mitosis(mitosis_entry, params);
                    } else {
                        self.axis_length = axis;
                        self.radius = params.radius(axis);
                    }
                }
                CellPhase::Mitosis => {
                    self.axis_length = (self.axis_length + increment.max(0.0)).min(params.terminal_axis_length());
                    self.radius = params.radius(self.axis_length);
                }
            },
            Trial::Translation { dx, dy } => {
                self.coord = self.coord + Point::new(dx, dy);
            }
            Trial::Deformation { delta } => {
                // round interphase cells have no axis to stretch
                if self.phase == CellPhase::Mitosis {
                    self.axis_length = clamp(
                        self.axis_length + delta,
                        2.0 * params.max_radius(),
                        params.terminal_axis_length(),
                    );
                    self.radius = params.radius(self.axis_length);
                }
            }
            Trial::Rotation { delta } => {
                self.axis_angle = wrap_angle(self.axis_angle + delta);
            }
        }
    }

    pub fn ready_to_divide(&self, params: &Parameters) -> bool {
        self.phase == CellPhase::Mitosis && self.axis_length >= params.terminal_axis_length() - AXIS_EPS
    }

    /// Splits the cell along its axis. `self` becomes the daughter on the positive side of the
    /// axis and the returned cell the one on the negative side. Both are newborn interphase
    /// cells keeping the parent's angle, type and growth rate, centered where the parent's
    /// lobes were and separated by a clearance of at least `DIVISION_GAP`, so their gap
    /// is never negative.
    pub fn divide(&mut self, params: &Parameters) -> Cell {
        let center = self.coord;
        let radius = params.min_radius();
        let mut daughter = self.clone();
        self.set_interphase_radius(radius);
        daughter.set_interphase_radius(radius);

        let mut clearance = DIVISION_GAP;
        loop {
            let reach = radius + 0.5 * clearance;
            self.coord = center.offset(self.axis_angle, reach);
            daughter.coord = center.offset(self.axis_angle, -reach);
            if self.cell_distance(&daughter) >= 0.0 || clearance >= MAX_DIVISION_GAP {
                break;
            }
            clearance *= 2.0;
        }
        daughter
    }

    pub fn record(&self) -> CellRecord {
        CellRecord {
            x: self.coord.x,
            y: self.coord.y,
            radius: self.radius,
            axis_length: self.axis_length,
            axis_angle: self.axis_angle,
            growth_rate: self.growth_rate,
            cell_type: self.cell_type,
        }
    }
}
