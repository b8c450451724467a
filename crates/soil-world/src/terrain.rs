use fastnoise_lite::{FastNoiseLite, NoiseType};

use crate::field::Field2;
use crate::grid::Grid;

const OCTAVES: [(f64, f64); 4] = [(1.0, 0.5), (2.0, 0.25), (4.0, 0.125), (8.0, 0.0625)];

/// Fills `terrain` with four octaves of OpenSimplex2 noise.
///
/// Column coordinates are rescaled to `[0, 1]` before sampling, so the
/// pattern does not depend on the grid resolution. Heights are rounded to
/// whole vertical cells and stay within `[-amplitude, amplitude]`.
pub fn noise_terrain(terrain: &mut Field2<f64>, grid: &Grid, seed: i32, amplitude: f64) {
    let mut noise = FastNoiseLite::with_seed(seed);
    noise.set_noise_type(Some(NoiseType::OpenSimplex2));
    noise.set_frequency(Some(1.0));

    let x0 = grid.vect_x[0];
    let y0 = grid.vect_y[0];
    for ii in 0..terrain.nx() {
        let x = (x0 - grid.vect_x[ii]) / (2.0 * x0);
        for jj in 0..terrain.ny() {
            let y = (y0 - grid.vect_y[jj]) / (2.0 * y0);
            let h: f64 = OCTAVES
                .iter()
                .map(|&(freq, weight)| {
                    weight * noise.get_noise_2d((freq * x) as f32, (freq * y) as f32) as f64
                })
                .sum();
            terrain[(ii, jj)] = grid.round_z(amplitude * h);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heights_are_bounded_and_whole_cells() {
        let grid = Grid::new(1.0, 1.0, 1.0, 0.1, 0.01).unwrap();
        let mut terrain = Field2::new(grid.size_x(), grid.size_y());
        noise_terrain(&mut terrain, &grid, 42, 0.4);
        for &h in terrain.iter() {
            assert!(h.abs() <= 0.4 + 1e-9, "{h}");
            let cells = h / grid.cell_size_z;
            assert!((cells - cells.round()).abs() < 1e-6, "{h}");
        }
    }

    #[test]
    fn same_seed_same_terrain() {
        let grid = Grid::new(1.0, 1.0, 1.0, 0.1, 0.01).unwrap();
        let mut a = Field2::new(grid.size_x(), grid.size_y());
        let mut b = Field2::new(grid.size_x(), grid.size_y());
        noise_terrain(&mut a, &grid, 7, 0.3);
        noise_terrain(&mut b, &grid, 7, 0.3);
        assert_eq!(a, b);
    }
}
