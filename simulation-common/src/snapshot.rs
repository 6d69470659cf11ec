use serde::{Deserialize, Serialize};

/// Number of values each cell contributes to a flattened snapshot.
pub const FIELDS_PER_CELL: usize = 7;

/// The recorded state of a single cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CellRecord {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    pub axis_length: f64,
    pub axis_angle: f64,
    pub growth_rate: f64,
    pub cell_type: u32,
}

/// A snapshot of every live cell at a specific time step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// The Monte Carlo time step at which the snapshot was taken.
    pub time_step: u32,
    pub cells: Vec<CellRecord>,
}

impl Snapshot {
    pub fn population_size(&self) -> usize {
        self.cells.len()
    }

    /// Flat array of `FIELDS_PER_CELL` values per cell:
    /// x, y, radius, axis length, axis angle, growth rate, type.
    pub fn flatten(&self) -> Vec<f64> {
        let mut flat = Vec::with_capacity(self.cells.len() * FIELDS_PER_CELL);
        for c in &self.cells {
            flat.extend_from_slice(&[
                c.x,
                c.y,
                c.radius,
                c.axis_length,
                c.axis_angle,
                c.growth_rate,
                f64::from(c.cell_type),
            ]);
        }
        flat
    }
}
