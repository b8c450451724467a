use soil_geom::Vec3;

use crate::error::SoilError;

/// Regular voxel lattice centred on the origin.
///
/// Lateral cells are square (`cell_size_xy`); vertical cells may be finer.
/// `vect_x[ii]`/`vect_y[jj]` give the world coordinate of column `ii`/`jj`
/// and `vect_z[kk]` the top of vertical cell `kk`.
#[derive(Clone, Debug, PartialEq)]
pub struct Grid {
    pub half_length_x: usize,
    pub half_length_y: usize,
    pub half_length_z: usize,
    pub cell_size_xy: f64,
    pub cell_size_z: f64,
    pub cell_area: f64,
    pub cell_volume: f64,
    pub vect_x: Vec<f64>,
    pub vect_y: Vec<f64>,
    pub vect_z: Vec<f64>,
}

fn positive(name: &'static str, value: f64) -> Result<(), SoilError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(SoilError::NonPositive { name, value })
    }
}

fn fits(
    cell_name: &'static str,
    cell: f64,
    grid_name: &'static str,
    grid: f64,
) -> Result<(), SoilError> {
    if grid < cell {
        Err(SoilError::CellLargerThanGrid {
            cell_name,
            cell,
            grid_name,
            grid,
        })
    } else {
        Ok(())
    }
}

impl Grid {
    pub fn new(
        grid_size_x: f64,
        grid_size_y: f64,
        grid_size_z: f64,
        cell_size_xy: f64,
        cell_size_z: f64,
    ) -> Result<Self, SoilError> {
        positive("cell_size_z", cell_size_z)?;
        positive("cell_size_xy", cell_size_xy)?;
        positive("grid_size_x", grid_size_x)?;
        positive("grid_size_y", grid_size_y)?;
        positive("grid_size_z", grid_size_z)?;
        if cell_size_z > cell_size_xy {
            return Err(SoilError::VerticalCellTooLarge {
                cell_size_z,
                cell_size_xy,
            });
        }
        fits("cell_size_xy", cell_size_xy, "grid_size_x", grid_size_x)?;
        fits("cell_size_xy", cell_size_xy, "grid_size_y", grid_size_y)?;
        fits("cell_size_z", cell_size_z, "grid_size_z", grid_size_z)?;

        let half_length_x = (grid_size_x / cell_size_xy).round() as usize;
        let half_length_y = (grid_size_y / cell_size_xy).round() as usize;
        let half_length_z = (grid_size_z / cell_size_z).round() as usize;
        let cell_area = cell_size_xy * cell_size_xy;

        let axis = |start: f64, step: f64, half: usize| -> Vec<f64> {
            (0..=2 * half).map(|ii| start + ii as f64 * step).collect()
        };

        Ok(Self {
            half_length_x,
            half_length_y,
            half_length_z,
            cell_size_xy,
            cell_size_z,
            cell_area,
            cell_volume: cell_area * cell_size_z,
            vect_x: axis(-grid_size_x, cell_size_xy, half_length_x),
            vect_y: axis(-grid_size_y, cell_size_xy, half_length_y),
            vect_z: axis(-grid_size_z + cell_size_z, cell_size_z, half_length_z),
        })
    }

    #[inline]
    pub fn size_x(&self) -> usize {
        2 * self.half_length_x + 1
    }

    #[inline]
    pub fn size_y(&self) -> usize {
        2 * self.half_length_y + 1
    }

    #[inline]
    pub fn size_z(&self) -> usize {
        2 * self.half_length_z + 1
    }

    /// Continuous index-space coordinates of a world position.
    ///
    /// Lateral indices are cell centres; the vertical index is offset by one
    /// so that `vect_z[ceil(k)]` is the top of the cell containing `p.z`.
    #[inline]
    pub fn index_space(&self, p: Vec3) -> Vec3 {
        Vec3::new(
            p.x / self.cell_size_xy + self.half_length_x as f64,
            p.y / self.cell_size_xy + self.half_length_y as f64,
            p.z / self.cell_size_z + self.half_length_z as f64 - 1.0,
        )
    }

    /// Column containing the lateral world position, if it lies on the grid.
    pub fn column(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        let ii = (x / self.cell_size_xy + self.half_length_x as f64).round() as i64;
        let jj = (y / self.cell_size_xy + self.half_length_y as f64).round() as i64;
        self.checked_column(ii, jj)
    }

    /// Validates signed column indices against the lateral extent.
    #[inline]
    pub fn checked_column(&self, ii: i64, jj: i64) -> Option<(usize, usize)> {
        if ii >= 0 && jj >= 0 && (ii as usize) < self.size_x() && (jj as usize) < self.size_y() {
            Some((ii as usize, jj as usize))
        } else {
            None
        }
    }

    /// Column `(ii + dx, jj + dy)`, if it lies on the grid.
    #[inline]
    pub fn offset(&self, ii: usize, jj: usize, dx: i64, dy: i64) -> Option<(usize, usize)> {
        self.checked_column(ii as i64 + dx, jj as i64 + dy)
    }

    /// Largest height at or below `h` that is a whole number of vertical cells.
    #[inline]
    pub fn floor_z(&self, h: f64, tol: f64) -> f64 {
        self.cell_size_z * ((h + tol) / self.cell_size_z).floor()
    }

    /// `h` rounded to the nearest whole number of vertical cells.
    #[inline]
    pub fn round_z(&self, h: f64) -> f64 {
        self.cell_size_z * (h / self.cell_size_z).round()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinate_vectors() {
        let grid = Grid::new(1.0, 1.0, 1.0, 0.1, 0.1).unwrap();
        assert_eq!(grid.half_length_x, 10);
        assert_eq!(grid.size_x(), 21);
        assert!((grid.vect_x[0] + 1.0).abs() < 1e-12);
        assert!(grid.vect_x[10].abs() < 1e-12);
        assert!((grid.vect_z[0] + 0.9).abs() < 1e-12);
        assert!((grid.vect_z[9]).abs() < 1e-12);
        assert!((grid.cell_volume - 1e-3).abs() < 1e-15);
    }

    #[test]
    fn rejects_invalid_sizes() {
        assert!(matches!(
            Grid::new(1.0, 1.0, 1.0, 0.1, 0.0),
            Err(SoilError::NonPositive { name: "cell_size_z", .. })
        ));
        assert!(matches!(
            Grid::new(1.0, 1.0, 1.0, 0.05, 0.1),
            Err(SoilError::VerticalCellTooLarge { .. })
        ));
        assert!(matches!(
            Grid::new(0.04, 1.0, 1.0, 0.05, 0.01),
            Err(SoilError::CellLargerThanGrid { grid_name: "grid_size_x", .. })
        ));
        assert!(matches!(
            Grid::new(1.0, 1.0, 0.005, 0.05, 0.01),
            Err(SoilError::CellLargerThanGrid { grid_name: "grid_size_z", .. })
        ));
    }

    #[test]
    fn index_space_offsets_vertical_by_one() {
        let grid = Grid::new(1.0, 1.0, 1.0, 0.1, 0.1).unwrap();
        let p = grid.index_space(Vec3::new(0.0, 0.0, 0.0));
        assert!((p.x - 10.0).abs() < 1e-12);
        assert!((p.z - 9.0).abs() < 1e-12);
    }

    #[test]
    fn floor_and_round_to_cells() {
        let grid = Grid::new(1.0, 1.0, 1.0, 0.1, 0.05).unwrap();
        assert!((grid.floor_z(0.65, 1e-5) - 0.65).abs() < 1e-12);
        assert!((grid.floor_z(0.649, 1e-5) - 0.6).abs() < 1e-12);
        assert!((grid.round_z(0.126) - 0.15).abs() < 1e-12);
        assert_eq!(grid.offset(0, 0, -1, 0), None);
        assert_eq!(grid.offset(0, 0, 1, 1), Some((1, 1)));
    }
}
