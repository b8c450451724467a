use thiserror::Error;

/// Errors raised while building or stepping a simulation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SoilError {
    #[error("{name} should be greater than zero, got {value}")]
    NonPositive { name: &'static str, value: f64 },

    #[error("cell_size_z ({cell_size_z}) should be lower than or equal to cell_size_xy ({cell_size_xy})")]
    VerticalCellTooLarge { cell_size_z: f64, cell_size_xy: f64 },

    #[error("{cell_name} ({cell}) should be lower than or equal to {grid_name} ({grid})")]
    CellLargerThanGrid {
        cell_name: &'static str,
        cell: f64,
        grid_name: &'static str,
        grid: f64,
    },

    #[error("{0} should not be equal to {1}")]
    CoincidentLandmarks(&'static str, &'static str),

    #[error("repose_angle should be between 0 and pi/2, got {0}")]
    ReposeAngle(f64),

    #[error("cell_buffer should be greater or equal to 2, got {0}")]
    CellBuffer(usize),

    /// A rasterized body cell fell outside the grid.
    #[error("cell ({x}, {y}, {z}) lies outside the grid")]
    OutsideGrid { x: i64, y: i64, z: i64 },

    /// Both body layers of a column are disjoint from a new interval and the
    /// merge policy forbids repairing it.
    #[error("body interval [{min}, {max}] at ({ii}, {jj}) is disjoint from both layers")]
    DisjointLayers {
        ii: usize,
        jj: usize,
        min: f64,
        max: f64,
    },

    /// Terrain trapped under the body found no column to go to.
    #[error("no room for {height} m of soil displaced from ({ii}, {jj})")]
    NoSpaceForSoil { ii: usize, jj: usize, height: f64 },
}
