use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use soil_dynamics::{locate_unstable_terrain_cell, relax_terrain};
use soil_geom::Vec3;
use soil_world::{Area, Body, Field2, Grid, SimOut, SimParam};

const TOL: f64 = 1e-5;

fn grid() -> Grid {
    Grid::new(0.5, 0.5, 0.5, 0.05, 0.01).unwrap()
}

fn arb_terrain() -> impl Strategy<Value = Vec<i32>> {
    let n = 21 * 21;
    prop::collection::vec(-20i32..=20, n)
}

fn state(heights: &[i32], grid: &Grid) -> SimOut {
    let mut out = SimOut::new(grid);
    let mut terrain = Field2::new(grid.size_x(), grid.size_y());
    for ii in 0..grid.size_x() {
        for jj in 0..grid.size_y() {
            terrain[(ii, jj)] = heights[ii * grid.size_y() + jj] as f64 * grid.cell_size_z;
        }
    }
    out.terrain = terrain;
    out
}

fn far_body() -> Body {
    Body::bucket(
        Vec3::ZERO,
        Vec3::ZERO,
        Vec3::new(0.0, 0.0, -0.1),
        Vec3::new(0.1, 0.0, -0.1),
        0.1,
    )
    .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    // Without a body, relaxation only moves soil between columns and
    // flattens extremes.
    #[test]
    fn relaxation_conserves_and_flattens(heights in arb_terrain(), seed in any::<u64>()) {
        let grid = grid();
        let param = SimParam::default();
        let body = far_body();
        let mut out = state(&heights, &grid);
        let mut rng = StdRng::seed_from_u64(seed);

        let volume = out.soil_volume(&grid);
        let max = out.terrain.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let min = out.terrain.iter().cloned().fold(f64::INFINITY, f64::min);

        for _ in 0..5 {
            out.impact_area = out.body_area.union(out.relax_area);
            relax_terrain(&mut out, &grid, &body, &param, &mut rng, TOL);
        }

        prop_assert!((out.soil_volume(&grid) - volume).abs() < 1e-9);
        for &h in out.terrain.iter() {
            prop_assert!(h <= max + 1e-9 && h >= min - 1e-9);
            let cells = h / grid.cell_size_z;
            prop_assert!((cells - cells.round()).abs() < 1e-6);
        }
    }

    // Every avalanche moves soil from a column to a lower one and leaves the
    // pair closer to its mean, so the sum of squared heights drops until no
    // column is unstable.
    #[test]
    fn relaxation_settles(heights in prop::collection::vec(0i32..=10, 21 * 21), seed in any::<u64>()) {
        let grid = grid();
        // One vertical cell of slope per column.
        let param = SimParam::new(0.2f64.atan(), 3, 4).unwrap();
        let dh_max = param.dh_max(&grid);
        prop_assert!((dh_max - grid.cell_size_z).abs() < 1e-9);
        let body = far_body();
        let mut out = state(&heights, &grid);
        let mut rng = StdRng::seed_from_u64(seed);

        let energy = |out: &SimOut| -> i64 {
            out.terrain
                .iter()
                .map(|&h| {
                    let c = (h / grid.cell_size_z).round() as i64;
                    c * c
                })
                .sum()
        };

        let mut last = energy(&out);
        let mut settled = false;
        for _ in 0..5000 {
            out.impact_area = Area::interior(&grid);
            if locate_unstable_terrain_cell(&out, &grid, dh_max, TOL).is_empty() {
                settled = true;
                break;
            }
            relax_terrain(&mut out, &grid, &body, &param, &mut rng, TOL);
            prop_assert!(!out.equilibrium);
            let e = energy(&out);
            prop_assert!(e < last, "energy went from {} to {}", last, e);
            last = e;
        }
        prop_assert!(settled);
    }
}
