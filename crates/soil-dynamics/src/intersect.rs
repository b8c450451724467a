//! Resolution of soil overlapping the body after it moved.

use log::{trace, warn};
use rand::Rng;
use rand::seq::SliceRandom;
use soil_world::{Body, BodySoil, Grid, Layer, SimOut, SoilError, Span};

const NEIGHBOURS_8: [(i64, i64); 8] = [
    (1, 0),
    (-1, 0),
    (0, 1),
    (0, -1),
    (1, 1),
    (1, -1),
    (-1, 1),
    (-1, -1),
];

/// Moves body soil and then terrain out of the space now taken by the body.
pub fn move_intersecting_cells<R: Rng + ?Sized>(
    sim_out: &mut SimOut,
    grid: &Grid,
    body: &Body,
    rng: &mut R,
    tol: f64,
) -> Result<(), SoilError> {
    move_intersecting_body_soil(sim_out, grid, body, rng, tol);
    move_intersecting_body(sim_out, grid, rng, tol)
}

/// Soil in transit between two columns.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SoilMove {
    /// Layer of the last column soil was taken from or stacked onto.
    pub layer: Layer,
    pub ii: usize,
    pub jj: usize,
    /// Height still to be placed.
    pub h_soil: f64,
    /// Set once the soil hit a body wall and cannot go further.
    pub wall: bool,
}

/// Pushes out soil resting on a lower body layer that now crosses the upper
/// layer of the same column.
///
/// The excess is walked outwards in each of the eight lateral directions,
/// in random order, until it has all been placed. Entries appended while
/// walking are visited too. Whatever cannot be placed is dropped with a
/// warning.
pub fn move_intersecting_body_soil<R: Rng + ?Sized>(
    sim_out: &mut SimOut,
    grid: &Grid,
    body: &Body,
    rng: &mut R,
    tol: f64,
) {
    let mut directions = NEIGHBOURS_8;
    let mut nn = 0;
    while nn < sim_out.body_soil_pos.len() {
        let BodySoil {
            layer, ii, jj, h_soil, ..
        } = sim_out.body_soil_pos[nn];
        nn += 1;

        let other = layer.other();
        let (Some(b_other), Some(b_this), Some(soil)) = (
            sim_out.body[(other, ii, jj)],
            sim_out.body[(layer, ii, jj)],
            sim_out.body_soil[(layer, ii, jj)],
        ) else {
            continue;
        };
        if b_other.min < b_this.min || soil.max - tol < b_other.min {
            continue;
        }

        let mut h = (soil.max - b_other.min).min(h_soil);
        sim_out.body_soil_pos[nn - 1].h_soil -= h;
        sim_out.body_soil[(layer, ii, jj)] = Some(Span::new(soil.min, soil.max - h));
        trace!("{h:.3} m of body soil intersecting the body at ({ii}, {jj})");

        directions.shuffle(rng);
        for (di, dj) in directions {
            let mut from = SoilMove {
                layer,
                ii,
                jj,
                h_soil: h,
                wall: false,
            };
            let mut max_h = b_other.min;
            let mut pp = 0;
            while !from.wall && from.h_soil > tol {
                pp += 1;
                let Some((ii_n, jj_n)) = grid.offset(ii, jj, pp * di, pp * dj) else {
                    break;
                };
                from = move_body_soil(sim_out, from, max_h, ii_n, jj_n, grid, body, tol);
                // Only used when the next column holds two layers.
                max_h = Layer::ALL
                    .iter()
                    .filter_map(|&l| sim_out.body[(l, from.ii, from.jj)])
                    .map(|s| s.min)
                    .fold(f64::NEG_INFINITY, f64::max);
            }
            h = from.h_soil;
            if h < tol {
                break;
            }
        }
        if h > tol {
            warn!("{h:.3} m of body soil dropped at ({ii}, {jj}): no room left");
        }
    }
}

/// Moves the soil of `from` to column `(ii_n, jj_n)`.
///
/// Soil falls to the terrain when the column is free of body, or when its
/// only body layer starts above the source body. It is stacked on a single
/// layer whose top stays below `max_h`, and otherwise stops at a wall. In a
/// column with two layers it fills the gap between them and carries on with
/// whatever did not fit.
#[allow(clippy::too_many_arguments)]
pub fn move_body_soil(
    sim_out: &mut SimOut,
    from: SoilMove,
    max_h: f64,
    ii_n: usize,
    jj_n: usize,
    grid: &Grid,
    body: &Body,
    tol: f64,
) -> SoilMove {
    let h = from.h_soil;
    let first = sim_out.body[(Layer::First, ii_n, jj_n)];
    let second = sim_out.body[(Layer::Second, ii_n, jj_n)];
    let done = SoilMove { h_soil: 0.0, ..from };

    match (first, second) {
        (None, None) => {
            sim_out.terrain[(ii_n, jj_n)] += h;
            done
        }
        (Some(s), None) | (None, Some(s)) => {
            let l = if first.is_some() { Layer::First } else { Layer::Second };
            let source_top = sim_out.body[(from.layer, from.ii, from.jj)].map_or(f64::NEG_INFINITY, |b| b.max);
            if s.min - tol > source_top {
                sim_out.terrain[(ii_n, jj_n)] += h;
                return done;
            }
            if s.max + tol > max_h {
                return SoilMove { wall: true, ..from };
            }
            sim_out.body_soil[(l, ii_n, jj_n)] = Some(match sim_out.body_soil[(l, ii_n, jj_n)] {
                Some(soil) => Span::new(soil.min, soil.max + h),
                None => Span::new(s.max, s.max + h),
            });
            push_entry(sim_out, l, ii_n, jj_n, grid, body, h, tol);
            done
        }
        (Some(a), Some(b)) => {
            let (bot, top_layer) = if a.min < b.min {
                (Layer::First, b)
            } else {
                (Layer::Second, a)
            };
            let (Some(bot_body), soil_bot) = (
                sim_out.body[(bot, ii_n, jj_n)],
                sim_out.body_soil[(bot, ii_n, jj_n)],
            ) else {
                return from;
            };
            if let Some(soil) = soil_bot {
                if soil.max + tol > top_layer.min {
                    // Gap already full, carry on through it.
                    return SoilMove {
                        layer: bot,
                        ii: ii_n,
                        jj: jj_n,
                        ..from
                    };
                }
            }
            let base = soil_bot.map_or(bot_body.max, |s| s.max);
            let start = soil_bot.map_or(bot_body.max, |s| s.min);
            let delta = top_layer.min - base;
            if delta < h {
                sim_out.body_soil[(bot, ii_n, jj_n)] = Some(Span::new(start, top_layer.min));
                push_entry(sim_out, bot, ii_n, jj_n, grid, body, delta, tol);
                SoilMove {
                    layer: bot,
                    ii: ii_n,
                    jj: jj_n,
                    h_soil: h - delta,
                    wall: from.wall,
                }
            } else {
                sim_out.body_soil[(bot, ii_n, jj_n)] = Some(Span::new(start, base + h));
                push_entry(sim_out, bot, ii_n, jj_n, grid, body, h, tol);
                done
            }
        }
    }
}

/// Journals `h_soil` moved onto `layer`; heights within `tol` are not recorded.
#[allow(clippy::too_many_arguments)]
fn push_entry(
    sim_out: &mut SimOut,
    layer: Layer,
    ii: usize,
    jj: usize,
    grid: &Grid,
    body: &Body,
    h_soil: f64,
    tol: f64,
) {
    if h_soil <= tol {
        return;
    }
    let Some(b) = sim_out.body[(layer, ii, jj)] else {
        return;
    };
    sim_out.body_soil_pos.push(BodySoil {
        layer,
        ii,
        jj,
        pos: body.frame_pos(grid, ii, jj, b.max),
        h_soil,
    });
}

/// Columns inside `body_area` where the terrain rises above the bottom of a
/// body layer.
pub fn locate_intersecting_cells(sim_out: &SimOut, tol: f64) -> Vec<(Layer, usize, usize)> {
    let mut cells = Vec::new();
    for (ii, jj) in sim_out.body_area.cells() {
        let t = sim_out.terrain[(ii, jj)];
        for layer in Layer::ALL {
            if let Some(s) = sim_out.body[(layer, ii, jj)] {
                if t - tol > s.min {
                    cells.push((layer, ii, jj));
                }
            }
        }
    }
    cells
}

/// Moves terrain trapped under the body to the nearest columns with room.
///
/// Rings of growing radius are searched around each intersecting column, in
/// a random direction order. Soil goes to the first column free of body, or
/// fills the space under the lowest body layer of the columns it meets. Fails
/// if no column within twice the larger lateral half-length has room.
pub fn move_intersecting_body<R: Rng + ?Sized>(
    sim_out: &mut SimOut,
    grid: &Grid,
    rng: &mut R,
    tol: f64,
) -> Result<(), SoilError> {
    let mut directions = NEIGHBOURS_8;
    let max_ring = 2 * grid.half_length_x.max(grid.half_length_y) as i64;

    for (layer, ii, jj) in locate_intersecting_cells(sim_out, tol) {
        let Some(span) = sim_out.body[(layer, ii, jj)] else {
            continue;
        };
        let t = sim_out.terrain[(ii, jj)];
        if t - tol < span.min {
            // Already handled through the other layer.
            continue;
        }
        directions.shuffle(rng);
        let mut h = t - span.min;
        trace!("{h:.3} m of terrain under the body at ({ii}, {jj})");

        let mut pp = 0;
        'rings: while h > tol {
            pp += 1;
            if pp > max_ring {
                return Err(SoilError::NoSpaceForSoil { ii, jj, height: h });
            }
            for &(di, dj) in &directions {
                let Some((ii_n, jj_n)) = grid.offset(ii, jj, pp * di, pp * dj) else {
                    continue;
                };
                let t_n = sim_out.terrain[(ii_n, jj_n)];
                let bot = Layer::ALL
                    .iter()
                    .filter_map(|&l| sim_out.body[(l, ii_n, jj_n)])
                    .map(|s| s.min)
                    .reduce(f64::min);
                match bot {
                    None => {
                        sim_out.terrain[(ii_n, jj_n)] += h;
                        h = 0.0;
                        break 'rings;
                    }
                    Some(bot) if t_n + tol < bot => {
                        let room = bot - t_n;
                        if room < h {
                            sim_out.terrain[(ii_n, jj_n)] = bot;
                            h -= room;
                        } else {
                            sim_out.terrain[(ii_n, jj_n)] += h;
                            h = 0.0;
                            break 'rings;
                        }
                    }
                    Some(_) => {}
                }
            }
        }
        sim_out.terrain[(ii, jj)] = span.min;
    }
    Ok(())
}
