//! Consistency checks run between steps.

use log::warn;
use soil_world::{Body, Field2, Grid, Layer, Pose, SimOut, Span};

/// Whether the body moved enough since the last update to affect the soil.
///
/// Movement below half the smallest cell size is ignored. Movement above
/// twice that size is accepted with a warning, as the update may then miss
/// cells.
pub fn check_body_movement(pose: &Pose, grid: &Grid, body: &Body) -> bool {
    let Some(old) = body.pose else {
        return true;
    };
    let max_disp = body.corners(pose).max_displacement(&body.corners(&old));
    let min_cell = grid.cell_size_xy.min(grid.cell_size_z);
    if max_disp < 0.5 * min_cell {
        return false;
    }
    if max_disp > 2.0 * min_cell {
        warn!(
            "body moved by {max_disp:.4} m in one step, more than two cells: the soil update may be inaccurate"
        );
    }
    true
}

/// Checks that the journal agrees with the body soil columns and that the
/// total soil volume is within half a cell of `init_volume`.
pub fn check_volume(sim_out: &SimOut, init_volume: f64, grid: &Grid, tol: f64) -> bool {
    let (nx, ny) = (sim_out.terrain.nx(), sim_out.terrain.ny());
    let mut journal = [Field2::<f64>::new(nx, ny), Field2::<f64>::new(nx, ny)];
    for e in &sim_out.body_soil_pos {
        journal[e.layer.index()][(e.ii, e.jj)] += e.h_soil;
    }
    for layer in Layer::ALL {
        for ((ii, jj), &h) in journal[layer.index()].indexed_iter() {
            let column = sim_out.body_soil[(layer, ii, jj)].map_or(0.0, Span::height);
            if (column - h).abs() > tol {
                warn!(
                    "body soil journal holds {h:.4} m at ({ii}, {jj}) on the {layer:?} layer, the column holds {column:.4} m"
                );
                return false;
            }
        }
    }

    let volume = sim_out.soil_volume(grid);
    if (volume - init_volume).abs() > 0.5 * grid.cell_volume {
        warn!("soil volume is not conserved: initial {init_volume:.6} m3, current {volume:.6} m3");
        return false;
    }
    true
}

/// Checks the ordering of terrain, body and body soil in every column of
/// `body_area`. Logs the first inconsistency found.
pub fn check_soil(sim_out: &SimOut, tol: f64) -> bool {
    for (ii, jj) in sim_out.body_area.cells() {
        let terrain = sim_out.terrain[(ii, jj)];
        let body = |l: Layer| sim_out.body[(l, ii, jj)];
        let soil = |l: Layer| sim_out.body_soil[(l, ii, jj)];

        for l in Layer::ALL {
            if let Some(b) = body(l) {
                if terrain > b.min + tol {
                    warn!("terrain at ({ii}, {jj}) is above the body: {terrain:.4} > {:.4}", b.min);
                    return false;
                }
                if b.min > b.max - tol {
                    warn!("body at ({ii}, {jj}) has its min above its max: {b:?}");
                    return false;
                }
            }
        }

        if let (Some(a), Some(b)) = (body(Layer::First), body(Layer::Second)) {
            if a.max + tol > b.min && b.max + tol > a.min {
                warn!("body layers intersect at ({ii}, {jj}): {a:?} and {b:?}");
                return false;
            }
        }

        for l in Layer::ALL {
            if let (Some(b), Some(s)) = (body(l), soil(l.other())) {
                if b.max - tol > s.min && s.max - tol > b.min {
                    warn!("body and body soil intersect at ({ii}, {jj}): {b:?} and {s:?}");
                    return false;
                }
            }
        }

        for l in Layer::ALL {
            let Some(s) = soil(l) else {
                continue;
            };
            if s.min > s.max + tol {
                warn!("body soil at ({ii}, {jj}) has its min above its max: {s:?}");
                return false;
            }
            let Some(b) = body(l) else {
                warn!("body soil at ({ii}, {jj}) rests on no body: {s:?}");
                return false;
            };
            if b.max > s.min + tol {
                warn!("body soil at ({ii}, {jj}) starts inside the body: {s:?} on {b:?}");
                return false;
            }
            if (s.min - b.max).abs() > tol {
                warn!("body soil at ({ii}, {jj}) floats above the body: {s:?} on {b:?}");
                return false;
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use soil_geom::{Quat, Vec3};
    use soil_world::BodySoil;

    const TOL: f64 = 1e-5;

    fn setup() -> (Grid, SimOut) {
        let grid = Grid::new(1.0, 1.0, 1.0, 0.1, 0.1).unwrap();
        let out = SimOut::new(&grid);
        (grid, out)
    }

    fn body() -> Body {
        Body::bucket(
            Vec3::ZERO,
            Vec3::new(0.0, 0.0, 0.5),
            Vec3::ZERO,
            Vec3::new(0.5, 0.0, 0.0),
            0.5,
        )
        .unwrap()
    }

    #[test]
    fn first_pose_always_moves() {
        let (grid, _) = setup();
        assert!(check_body_movement(&Pose::default(), &grid, &body()));
    }

    #[test]
    fn small_moves_are_ignored() {
        let (grid, _) = setup();
        let mut b = body();
        b.pose = Some(Pose::default());
        let nudge = Pose::new(Vec3::new(0.04, 0.0, 0.0), Quat::IDENTITY);
        assert!(!check_body_movement(&nudge, &grid, &b));
        let step = Pose::new(Vec3::new(0.06, 0.0, 0.0), Quat::IDENTITY);
        assert!(check_body_movement(&step, &grid, &b));
        let jump = Pose::new(Vec3::new(0.5, 0.0, 0.0), Quat::IDENTITY);
        assert!(check_body_movement(&jump, &grid, &b));
    }

    #[test]
    fn rotation_counts_as_movement() {
        let (grid, _) = setup();
        let mut b = body();
        b.pose = Some(Pose::default());
        let turned = Pose::new(Vec3::ZERO, Quat::from_euler_zyx([0.0, 0.0, 0.3]));
        assert!(check_body_movement(&turned, &grid, &b));
    }

    #[test]
    fn volume_check() {
        let (grid, mut out) = setup();
        out.terrain[(3, 3)] = 0.2;
        out.body[(Layer::First, 5, 5)] = Some(Span::new(-0.1, 0.0));
        out.body_soil[(Layer::First, 5, 5)] = Some(Span::new(0.0, 0.3));
        out.body_soil_pos.push(BodySoil {
            layer: Layer::First,
            ii: 5,
            jj: 5,
            pos: Vec3::ZERO,
            h_soil: 0.1,
        });
        // Journal short of 0.2 m.
        let init = out.soil_volume(&grid);
        assert!(!check_volume(&out, init, &grid, TOL));
        out.body_soil_pos[0].h_soil = 0.3;
        assert!(check_volume(&out, init, &grid, TOL));
        // Half a cell of slack.
        assert!(check_volume(&out, init + 0.4 * grid.cell_volume, &grid, TOL));
        assert!(!check_volume(&out, init + 0.6 * grid.cell_volume, &grid, TOL));
    }

    #[test]
    fn soil_check_accepts_consistent_columns() {
        let (_, mut out) = setup();
        out.terrain[(5, 5)] = -0.2;
        out.body[(Layer::First, 5, 5)] = Some(Span::new(-0.1, 0.0));
        out.body_soil[(Layer::First, 5, 5)] = Some(Span::new(0.0, 0.1));
        out.body[(Layer::Second, 5, 5)] = Some(Span::new(0.3, 0.4));
        out.body_soil[(Layer::Second, 5, 5)] = Some(Span::new(0.4, 0.6));
        assert!(check_soil(&out, TOL));
    }

    #[test]
    fn soil_check_flags_each_defect() {
        let defects: [fn(&mut SimOut); 8] = [
            |o| o.terrain[(5, 5)] = 0.5,
            |o| o.body[(Layer::First, 5, 5)] = Some(Span::new(0.0, -0.1)),
            |o| o.body[(Layer::Second, 5, 5)] = Some(Span::new(-0.05, 0.35)),
            |o| o.body_soil[(Layer::Second, 5, 5)] = Some(Span::new(-0.05, 0.05)),
            |o| o.body_soil[(Layer::First, 5, 5)] = Some(Span::new(0.1, 0.0)),
            |o| o.body_soil[(Layer::First, 6, 6)] = Some(Span::new(0.0, 0.1)),
            |o| o.body_soil[(Layer::First, 5, 5)] = Some(Span::new(-0.05, 0.1)),
            |o| o.body_soil[(Layer::First, 5, 5)] = Some(Span::new(0.05, 0.1)),
        ];
        for (n, defect) in defects.iter().enumerate() {
            let (_, mut out) = setup();
            out.terrain[(5, 5)] = -0.2;
            out.body[(Layer::First, 5, 5)] = Some(Span::new(-0.1, 0.0));
            out.body_soil[(Layer::First, 5, 5)] = Some(Span::new(0.0, 0.1));
            out.body[(Layer::Second, 5, 5)] = Some(Span::new(0.3, 0.4));
            assert!(check_soil(&out, TOL), "baseline for defect {n}");
            defect(&mut out);
            assert!(!check_soil(&out, TOL), "defect {n} not detected");
        }
    }
}
