use proptest::prelude::*;
use soil_geom::Vec3;
use soil_world::{Area, Grid};

fn grid() -> Grid {
    Grid::new(1.0, 1.0, 1.0, 0.05, 0.01).unwrap()
}

fn arb_area() -> impl Strategy<Value = Area> {
    (0usize..30, 0usize..10, 0usize..30, 0usize..10).prop_map(|(x, lx, y, ly)| Area {
        min_x: x,
        max_x: x + lx,
        min_y: y,
        max_y: y + ly,
    })
}

proptest! {
    #[test]
    fn union_contains_both(a in arb_area(), b in arb_area()) {
        let u = a.union(b);
        for (ii, jj) in a.cells().chain(b.cells()) {
            prop_assert!(u.contains(ii, jj));
        }
    }

    #[test]
    fn cells_match_contains(a in arb_area()) {
        let n = a.cells().count();
        prop_assert_eq!(n, (a.max_x - a.min_x) * (a.max_y - a.min_y));
        prop_assert!(a.cells().all(|(ii, jj)| a.contains(ii, jj)));
    }

    // Heights snap to whole vertical cells.
    #[test]
    fn floor_and_round_snap(h in -0.9f64..0.9) {
        let grid = grid();
        let f = grid.floor_z(h, 1e-5);
        let r = grid.round_z(h);
        prop_assert!(f <= h + 1e-5 && f > h - grid.cell_size_z);
        prop_assert!((r - h).abs() <= 0.5 * grid.cell_size_z + 1e-12);
        let cells = r / grid.cell_size_z;
        prop_assert!((cells - cells.round()).abs() < 1e-9);
    }

    // Points on the grid map back to the column whose centre is nearest.
    #[test]
    fn column_of_point(x in -0.97f64..0.97, y in -0.97f64..0.97) {
        let grid = grid();
        let (ii, jj) = grid.column(x, y).unwrap();
        prop_assert!((grid.vect_x[ii] - x).abs() <= 0.5 * grid.cell_size_xy + 1e-9);
        prop_assert!((grid.vect_y[jj] - y).abs() <= 0.5 * grid.cell_size_xy + 1e-9);
        let p = grid.index_space(Vec3::new(x, y, 0.0));
        prop_assert_eq!((p.x.round() as usize, p.y.round() as usize), (ii, jj));
    }
}
