use log::trace;
use soil_geom::Vec3;
use soil_world::{Area, Body, Grid, Layer, MergePolicy, Pose, SimOut, SimParam, SoilError, Span};

use crate::raster::{Cell, calc_rectangle_pos, calc_triangle_pos};

/// Updates the body footprint in `sim_out` for the body placed at `pose`.
///
/// The previous footprint is cleared over the previous `body_area`, then the
/// four body walls are rasterized and merged column by column into the two
/// body layers. `body_area` is reset to the new footprint's bounding box
/// padded by `cell_buffer` columns.
pub fn calc_body_pos(
    sim_out: &mut SimOut,
    pose: &Pose,
    grid: &Grid,
    body: &Body,
    sim_param: &SimParam,
    tol: f64,
) -> Result<(), SoilError> {
    sim_out.body.clear_area(sim_out.body_area);

    let c = body.corners(pose);
    // Pull every corner slightly inside the body so that walls lying exactly
    // on a cell boundary land on a single side.
    let nudge = |p: Vec3, n: [Vec3; 3]| p + (n[0] - p + n[1] - p + n[2] - p) * tol;
    let j_r = nudge(c.j_r, [c.j_l, c.b_r, c.t_r]);
    let j_l = nudge(c.j_l, [c.j_r, c.b_l, c.t_l]);
    let b_r = nudge(c.b_r, [c.b_l, c.j_r, c.t_r]);
    let b_l = nudge(c.b_l, [c.b_r, c.j_l, c.t_l]);
    let t_r = nudge(c.t_r, [c.t_l, c.j_r, c.b_r]);
    let t_l = nudge(c.t_l, [c.t_r, c.j_l, c.b_l]);

    sim_out.body_area = footprint_area(&[j_r, j_l, b_r, b_l, t_r, t_l], grid, sim_param.cell_buffer);

    let surfaces = [
        calc_rectangle_pos(b_r, b_l, t_l, t_r, grid, tol),
        calc_rectangle_pos(b_r, b_l, j_l, j_r, grid, tol),
        calc_triangle_pos(j_r, b_r, t_r, grid, tol),
        calc_triangle_pos(j_l, b_l, t_l, grid, tol),
    ];
    for mut cells in surfaces {
        cells.sort_unstable();
        update_body(&cells, sim_out, grid, sim_param.merge_policy, tol)?;
    }
    Ok(())
}

/// Bounding box of the corners, padded by `buffer` columns and clamped to
/// the grid interior.
fn footprint_area(points: &[Vec3], grid: &Grid, buffer: usize) -> Area {
    let (mut lo_x, mut hi_x) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut lo_y, mut hi_y) = (f64::INFINITY, f64::NEG_INFINITY);
    for p in points {
        lo_x = lo_x.min(p.x);
        hi_x = hi_x.max(p.x);
        lo_y = lo_y.min(p.y);
        hi_y = hi_y.max(p.y);
    }
    let buf = buffer as f64;
    let clamp = |v: f64, hl: usize| (v.round() as i64).clamp(1, 2 * hl as i64) as usize;
    let (hl_x, hl_y) = (grid.half_length_x, grid.half_length_y);
    let cxy = grid.cell_size_xy;
    Area {
        min_x: clamp(lo_x / cxy + hl_x as f64 - buf, hl_x),
        max_x: clamp(hi_x / cxy + hl_x as f64 + buf, hl_x),
        min_y: clamp(lo_y / cxy + hl_y as f64 - buf, hl_y),
        max_y: clamp(hi_y / cxy + hl_y as f64 + buf, hl_y),
    }
}

/// Merges a sorted run of rasterized cells into the body layers.
///
/// Cells sharing a column are grouped; the group spans from the bottom of
/// its lowest cell to the top of its highest one.
pub fn update_body(
    cells: &[Cell],
    sim_out: &mut SimOut,
    grid: &Grid,
    policy: MergePolicy,
    tol: f64,
) -> Result<(), SoilError> {
    for column in cells.chunk_by(|a, b| a.x == b.x && a.y == b.y) {
        let (first, last) = match (column.first(), column.last()) {
            (Some(f), Some(l)) => (f, l),
            _ => continue,
        };
        let (ii, jj) = grid.checked_column(first.x, first.y).ok_or(SoilError::OutsideGrid {
            x: first.x,
            y: first.y,
            z: first.z,
        })?;
        let z_index = |cell: &Cell| {
            usize::try_from(cell.z)
                .ok()
                .filter(|&kk| kk < grid.size_z())
                .ok_or(SoilError::OutsideGrid {
                    x: cell.x,
                    y: cell.y,
                    z: cell.z,
                })
        };
        let min_h = grid.vect_z[z_index(first)?] - grid.cell_size_z;
        let max_h = grid.vect_z[z_index(last)?];
        include_new_body_pos(sim_out, ii, jj, min_h, max_h, policy, tol)?;
    }
    Ok(())
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Fit {
    Absent,
    Overlap,
    Disjoint,
}

/// Adds the interval `[min_h, max_h]` to the body layers of column `(ii, jj)`.
///
/// An interval already contained in a layer is a no-op. One overlapping a
/// layer extends it; one overlapping both layers fuses them into the first.
/// Otherwise it fills the first empty layer. When both layers are taken and
/// neither overlaps, `policy` decides between stretching the closest layer
/// boundary and failing.
pub fn include_new_body_pos(
    sim_out: &mut SimOut,
    ii: usize,
    jj: usize,
    min_h: f64,
    max_h: f64,
    policy: MergePolicy,
    tol: f64,
) -> Result<(), SoilError> {
    let mut fit = [Fit::Absent; 2];
    for layer in Layer::ALL {
        let Some(s) = sim_out.body[(layer, ii, jj)] else {
            continue;
        };
        let crosses_min = min_h - tol < s.min && max_h + tol > s.min;
        let crosses_max = min_h - tol < s.max && max_h + tol > s.max;
        if crosses_min || crosses_max {
            fit[layer.index()] = Fit::Overlap;
        } else if min_h + tol > s.min && max_h - tol < s.max {
            return Ok(());
        } else {
            fit[layer.index()] = Fit::Disjoint;
        }
    }

    let body = &mut sim_out.body;
    let extend = |s: Span| Span::new(s.min.min(min_h), s.max.max(max_h));
    match fit {
        [Fit::Overlap, Fit::Overlap] => {
            let (Some(a), Some(b)) = (body[(Layer::First, ii, jj)], body[(Layer::Second, ii, jj)])
            else {
                return Ok(());
            };
            let merged = Span::new(a.min.min(b.min).min(min_h), a.max.max(b.max).max(max_h));
            trace!("body layers fused at ({ii}, {jj})");
            body[(Layer::First, ii, jj)] = Some(merged);
            body[(Layer::Second, ii, jj)] = None;
        }
        [Fit::Overlap, _] => {
            body[(Layer::First, ii, jj)] = body[(Layer::First, ii, jj)].map(extend);
        }
        [_, Fit::Overlap] => {
            body[(Layer::Second, ii, jj)] = body[(Layer::Second, ii, jj)].map(extend);
        }
        [Fit::Absent, _] => {
            body[(Layer::First, ii, jj)] = Some(Span::new(min_h, max_h));
        }
        [_, Fit::Absent] => {
            body[(Layer::Second, ii, jj)] = Some(Span::new(min_h, max_h));
        }
        [Fit::Disjoint, Fit::Disjoint] => match policy {
            MergePolicy::Reject => {
                return Err(SoilError::DisjointLayers {
                    ii,
                    jj,
                    min: min_h,
                    max: max_h,
                });
            }
            MergePolicy::Repair => {
                let (Some(a), Some(b)) =
                    (body[(Layer::First, ii, jj)], body[(Layer::Second, ii, jj)])
                else {
                    return Ok(());
                };
                let gap = |s: Span| ((s.min - max_h).abs(), (min_h - s.max).abs());
                let (below_a, above_a) = gap(a);
                let (below_b, above_b) = gap(b);
                let (layer, s, below, above) = if below_a.min(above_a) < below_b.min(above_b) {
                    (Layer::First, a, below_a, above_a)
                } else {
                    (Layer::Second, b, below_b, above_b)
                };
                let repaired = if below < above {
                    Span::new(min_h, s.max)
                } else {
                    Span::new(s.min, max_h)
                };
                trace!("disjoint body interval at ({ii}, {jj}) stretched {layer:?}");
                body[(layer, ii, jj)] = Some(repaired);
            }
        },
    }
    Ok(())
}
