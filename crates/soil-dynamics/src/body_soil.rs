use log::warn;
use soil_world::{Body, BodySoil, Grid, Layer, Pose, SimOut, Span};

/// Moves every soil parcel resting on the body along with the body.
///
/// Each journal entry is detached from its column, carried from the current
/// pose to `pose` in the body frame, and re-attached on top of whichever body
/// layer is found within one vertical cell of its new position. Neighbouring
/// columns are tried first in the direction of motion. Parcels that find no
/// body fall back to the closest layer and, failing that, onto the terrain.
///
/// Records `pose` as the body's current pose.
pub fn update_body_soil(sim_out: &mut SimOut, pose: &Pose, grid: &Grid, body: &mut Body, tol: f64) {
    let old_pose = body.current_pose();
    let journal = std::mem::take(&mut sim_out.body_soil_pos);

    for e in &journal {
        sim_out.body_soil[(e.layer, e.ii, e.jj)] = None;
    }

    let mut moved = Vec::with_capacity(journal.len());
    for e in journal {
        if e.h_soil < 0.9 * grid.cell_size_z {
            continue;
        }
        let h_soil = grid.round_z(e.h_soil);

        let new_pos = body.world_pos(pose, e.pos);
        let old_pos = body.world_pos(&old_pose, e.pos);
        let (dx, dy) = (new_pos.x - old_pos.x, new_pos.y - old_pos.y);
        let (sx, sy) = (sign(dx), sign(dy));

        let directions = if dx.abs() > dy.abs() {
            [
                (0, 0),
                (sx, 0),
                (sx, sy),
                (0, sy),
                (sx, -sy),
                (0, -sy),
                (-sx, sy),
                (-sx, 0),
                (-sx, -sy),
            ]
        } else {
            [
                (0, 0),
                (0, sy),
                (sx, sy),
                (sx, 0),
                (-sx, sy),
                (-sx, 0),
                (sx, -sy),
                (0, -sy),
                (-sx, -sy),
            ]
        };

        let ii_n = (new_pos.x / grid.cell_size_xy + grid.half_length_x as f64).round() as i64;
        let jj_n = (new_pos.y / grid.cell_size_xy + grid.half_length_y as f64).round() as i64;

        let mut placed = false;
        let mut closest: Option<(Layer, usize, usize)> = None;
        let mut dist_min = 2.0 * grid.half_length_z as f64;
        'search: for (di, dj) in directions {
            let Some((ii_t, jj_t)) = grid.checked_column(ii_n + di, jj_n + dj) else {
                continue;
            };
            for layer in Layer::ALL {
                let Some(b) = sim_out.body[(layer, ii_t, jj_t)] else {
                    continue;
                };
                let dist = (new_pos.z - b.max).abs();
                if dist < grid.cell_size_z + tol {
                    attach(sim_out, layer, ii_t, jj_t, e, h_soil, &mut moved);
                    placed = true;
                    break 'search;
                }
                if dist < dist_min {
                    dist_min = dist;
                    closest = Some((layer, ii_t, jj_t));
                }
            }
        }
        if placed {
            continue;
        }

        match closest {
            Some((layer, ii_t, jj_t)) => attach(sim_out, layer, ii_t, jj_t, e, h_soil, &mut moved),
            None => {
                // Soil carried past the edge lands on the nearest border column.
                let ii = ii_n.clamp(0, grid.size_x() as i64 - 1) as usize;
                let jj = jj_n.clamp(0, grid.size_y() as i64 - 1) as usize;
                if (ii as i64, jj as i64) != (ii_n, jj_n) {
                    warn!(
                        "body soil at ({:.3}, {:.3}, {:.3}) left the grid, {h_soil} m moved to the terrain of ({ii}, {jj})",
                        new_pos.x, new_pos.y, new_pos.z
                    );
                } else {
                    warn!(
                        "body soil at ({:.3}, {:.3}, {:.3}) could not be re-attached, moved to the terrain",
                        new_pos.x, new_pos.y, new_pos.z
                    );
                }
                sim_out.terrain[(ii, jj)] += h_soil;
            }
        }
    }

    sim_out.body_soil_pos = moved;
    body.pose = Some(*pose);
}

/// Stacks `h_soil` on top of the body layer, above any soil already there.
fn attach(
    sim_out: &mut SimOut,
    layer: Layer,
    ii: usize,
    jj: usize,
    e: BodySoil,
    h_soil: f64,
    moved: &mut Vec<BodySoil>,
) {
    let Some(b) = sim_out.body[(layer, ii, jj)] else {
        return;
    };
    let existing = sim_out.body_soil[(layer, ii, jj)].map_or(0.0, Span::height);
    sim_out.body_soil[(layer, ii, jj)] = Some(Span::new(b.max, b.max + existing + h_soil));
    moved.push(BodySoil {
        layer,
        ii,
        jj,
        pos: e.pos,
        h_soil,
    });
}

/// Direction of travel along one axis. A still axis counts as positive so
/// that the nine search columns stay distinct.
#[inline]
fn sign(v: f64) -> i64 {
    1f64.copysign(v) as i64
}
