//! Avalanching of terrain and body soil down to the repose angle.

use log::trace;
use rand::Rng;
use rand::seq::SliceRandom;
use soil_world::{Area, Body, BodySoil, Grid, Layer, SimOut, SimParam, Span};

const NEIGHBOURS_4: [(i64, i64); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

/// Body layers present in a neighbouring column.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Occupancy {
    FirstOnly,
    SecondOnly,
    Both,
    Empty,
}

/// Where soil from an unstable column should go.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Target {
    Terrain,
    /// On top of the soil already resting on this layer.
    Soil(Layer),
    /// Directly on this body layer.
    Body(Layer),
}

/// Outcome of a stability check on a neighbouring column.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Status {
    pub neighbor: Occupancy,
    pub target: Target,
}

impl Status {
    #[inline]
    pub const fn new(neighbor: Occupancy, target: Target) -> Self {
        Self { neighbor, target }
    }

    /// Two-digit code: tens for the occupancy (1 first layer, 2 second,
    /// 3 both, 4 none), units for the target (0 terrain, 1 second-layer
    /// soil, 2 second layer, 3 first-layer soil, 4 first layer).
    pub fn code(self) -> u8 {
        let tens = match self.neighbor {
            Occupancy::FirstOnly => 1,
            Occupancy::SecondOnly => 2,
            Occupancy::Both => 3,
            Occupancy::Empty => 4,
        };
        let units = match self.target {
            Target::Terrain => 0,
            Target::Soil(Layer::Second) => 1,
            Target::Body(Layer::Second) => 2,
            Target::Soil(Layer::First) => 3,
            Target::Body(Layer::First) => 4,
        };
        10 * tens + units
    }
}

#[derive(Clone, Copy, Debug)]
enum Column {
    Empty,
    Single(Layer, Span),
    Double {
        bot: (Layer, Span),
        top: (Layer, Span),
    },
}

impl Column {
    fn read(sim_out: &SimOut, ii: usize, jj: usize) -> Self {
        match (
            sim_out.body[(Layer::First, ii, jj)],
            sim_out.body[(Layer::Second, ii, jj)],
        ) {
            (None, None) => Column::Empty,
            (Some(a), None) => Column::Single(Layer::First, a),
            (None, Some(b)) => Column::Single(Layer::Second, b),
            (Some(a), Some(b)) if a.min < b.min => Column::Double {
                bot: (Layer::First, a),
                top: (Layer::Second, b),
            },
            (Some(a), Some(b)) => Column::Double {
                bot: (Layer::Second, b),
                top: (Layer::First, a),
            },
        }
    }

    fn occupancy(self) -> Occupancy {
        match self {
            Column::Empty => Occupancy::Empty,
            Column::Single(Layer::First, _) => Occupancy::FirstOnly,
            Column::Single(Layer::Second, _) => Occupancy::SecondOnly,
            Column::Double { .. } => Occupancy::Both,
        }
    }
}

/// Top of whatever rests on `layer`: its soil if any, else the body itself.
fn layer_top(sim_out: &SimOut, layer: Layer, span: Span, ii: usize, jj: usize) -> (Target, f64) {
    match sim_out.body_soil[(layer, ii, jj)] {
        Some(s) => (Target::Soil(layer), s.max),
        None => (Target::Body(layer), span.max),
    }
}

fn lowest_body(sim_out: &SimOut, ii: usize, jj: usize) -> Option<f64> {
    Layer::ALL
        .iter()
        .filter_map(|&l| sim_out.body[(l, ii, jj)])
        .map(|s| s.min)
        .reduce(f64::min)
}

/// Relaxes every unstable terrain column of `impact_area`.
///
/// Sets `equilibrium` when nothing moved and shrinks `relax_area` around the
/// columns that were found unstable.
pub fn relax_terrain<R: Rng + ?Sized>(
    sim_out: &mut SimOut,
    grid: &Grid,
    body: &Body,
    sim_param: &SimParam,
    rng: &mut R,
    tol: f64,
) {
    sim_out.equilibrium = true;
    let dh_max = sim_param.dh_max(grid);

    let mut unstable = locate_unstable_terrain_cell(sim_out, grid, dh_max, tol);
    if unstable.is_empty() {
        return;
    }
    unstable.shuffle(rng);

    let mut directions = NEIGHBOURS_4;
    let (mut min_x, mut max_x) = (2 * grid.half_length_x, 0);
    let (mut min_y, mut max_y) = (2 * grid.half_length_y, 0);
    for (ii, jj) in unstable {
        min_x = min_x.min(ii);
        max_x = max_x.max(ii);
        min_y = min_y.min(jj);
        max_y = max_y.max(jj);

        directions.shuffle(rng);
        for (di, dj) in directions {
            let Some((ic, jc)) = grid.offset(ii, jj, di, dj) else {
                continue;
            };
            let h_min = sim_out.terrain[(ii, jj)] - dh_max;
            if let Some(status) = check_unstable_terrain_cell(sim_out, ic, jc, h_min, tol) {
                sim_out.equilibrium = false;
                relax_unstable_terrain_cell(sim_out, status, dh_max, ii, jj, ic, jc, grid, body, tol);
            }
        }
    }

    let buf = sim_param.cell_buffer;
    sim_out.relax_area = Area {
        min_x: min_x.saturating_sub(buf).max(2),
        max_x: (max_x + buf).min(2 * grid.half_length_x),
        min_y: min_y.saturating_sub(buf).max(2),
        max_y: (max_y + buf).min(2 * grid.half_length_y),
    };
    trace!("relax area {:?}", sim_out.relax_area);
}

/// Columns of `impact_area` with a lateral neighbour more than `dh_max`
/// below them.
///
/// This is a first pass only: the body or soil resting on it may still hold
/// the column up.
pub fn locate_unstable_terrain_cell(
    sim_out: &SimOut,
    grid: &Grid,
    dh_max: f64,
    tol: f64,
) -> Vec<(usize, usize)> {
    let mut cells = Vec::new();
    for (ii, jj) in sim_out.impact_area.cells() {
        let h_min = sim_out.terrain[(ii, jj)] - dh_max - tol;
        let unstable = NEIGHBOURS_4.iter().any(|&(di, dj)| {
            grid.offset(ii, jj, di, dj)
                .is_some_and(|(ic, jc)| sim_out.terrain[(ic, jc)] < h_min)
        });
        if unstable {
            cells.push((ii, jj));
        }
    }
    cells
}

/// Checks whether terrain can avalanche into column `(ic, jc)`, whose top
/// must stay below `h_min`.
pub fn check_unstable_terrain_cell(
    sim_out: &SimOut,
    ic: usize,
    jc: usize,
    h_min: f64,
    tol: f64,
) -> Option<Status> {
    let t_c = sim_out.terrain[(ic, jc)];
    if t_c + tol >= h_min {
        return None;
    }
    let column = Column::read(sim_out, ic, jc);
    let neighbor = column.occupancy();
    let (target, top) = match column {
        Column::Empty => return Some(Status::new(neighbor, Target::Terrain)),
        Column::Single(l, b) => {
            if t_c + tol < b.min {
                return Some(Status::new(neighbor, Target::Terrain));
            }
            layer_top(sim_out, l, b, ic, jc)
        }
        Column::Double { bot, top } => {
            if t_c + tol < bot.1.min {
                return Some(Status::new(neighbor, Target::Terrain));
            }
            match sim_out.body_soil[(bot.0, ic, jc)] {
                // Gap between the layers is full, soil may land on top.
                Some(s) if s.max + tol > top.1.min => layer_top(sim_out, top.0, top.1, ic, jc),
                Some(s) => (Target::Soil(bot.0), s.max),
                None => (Target::Body(bot.0), bot.1.max),
            }
        }
    };
    (top + tol < h_min).then_some(Status::new(neighbor, target))
}

/// Moves terrain from `(ii, jj)` to `(ic, jc)` according to `status`.
///
/// Both columns end as close to `dh_max` apart as whole vertical cells
/// allow, unless the body in the way caps the move.
#[allow(clippy::too_many_arguments)]
pub fn relax_unstable_terrain_cell(
    sim_out: &mut SimOut,
    status: Status,
    dh_max: f64,
    ii: usize,
    jj: usize,
    ic: usize,
    jc: usize,
    grid: &Grid,
    body: &Body,
    tol: f64,
) {
    let t = sim_out.terrain[(ii, jj)];
    match status.target {
        Target::Terrain => {
            let t_c = sim_out.terrain[(ic, jc)];
            let h_new = grid.floor_z(0.5 * (dh_max + t + t_c), tol);
            let h_new_c = t + t_c - h_new;
            match lowest_body(sim_out, ic, jc) {
                Some(bot) if h_new_c >= bot => {
                    // Only the space under the body can be filled.
                    sim_out.terrain[(ii, jj)] = t + t_c - bot;
                    sim_out.terrain[(ic, jc)] = bot;
                }
                _ => {
                    sim_out.terrain[(ii, jj)] = h_new;
                    sim_out.terrain[(ic, jc)] = h_new_c;
                }
            }
        }
        Target::Soil(l) | Target::Body(l) => {
            let Some(b) = sim_out.body[(l, ic, jc)] else {
                return;
            };
            let dest = sim_out.body_soil[(l, ic, jc)];
            let base = dest.map_or(b.max, |s| s.max);
            let start = dest.map_or(b.max, |s| s.min);

            let mut h_new = grid.floor_z(0.5 * (dh_max + t + base), tol);
            let mut h_soil = t - h_new;
            let mut h_new_c = base + h_soil;
            if let Some(o) = sim_out.body[(l.other(), ic, jc)] {
                if b.max < o.min && h_new_c - tol > o.min {
                    h_soil = o.min - base;
                    h_new_c = o.min;
                    h_new = t - h_soil;
                }
            }

            if h_soil <= tol {
                return;
            }

            sim_out.terrain[(ii, jj)] = h_new;
            sim_out.body_soil[(l, ic, jc)] = Some(Span::new(start, h_new_c));
            sim_out.body_soil_pos.push(BodySoil {
                layer: l,
                ii: ic,
                jj: jc,
                pos: body.frame_pos(grid, ic, jc, b.max),
                h_soil,
            });
        }
    }
}

/// Relaxes the soil resting on the body, entry by entry.
///
/// Entries created while relaxing are appended once every existing entry has
/// been visited.
pub fn relax_body_soil<R: Rng + ?Sized>(
    sim_out: &mut SimOut,
    grid: &Grid,
    body: &Body,
    sim_param: &SimParam,
    rng: &mut R,
    tol: f64,
) {
    let dh_max = sim_param.dh_max(grid);
    let mut directions = NEIGHBOURS_4;
    let mut new_entries = Vec::new();

    for nn in 0..sim_out.body_soil_pos.len() {
        let BodySoil {
            layer, ii, jj, h_soil, ..
        } = sim_out.body_soil_pos[nn];
        if h_soil < tol {
            continue;
        }

        directions.shuffle(rng);
        for (di, dj) in directions {
            let Some(src) = sim_out.body_soil[(layer, ii, jj)] else {
                break;
            };
            let Some((ic, jc)) = grid.offset(ii, jj, di, dj) else {
                continue;
            };
            let h_min = src.max - dh_max;
            let Some(status) = check_unstable_body_cell(sim_out, ii, jj, layer, ic, jc, h_min, tol)
            else {
                continue;
            };
            sim_out.equilibrium = false;
            let src = SoilSource { layer, ii, jj, nn };
            relax_unstable_body_cell(
                sim_out,
                status,
                &mut new_entries,
                dh_max,
                src,
                ic,
                jc,
                grid,
                body,
                tol,
            );
        }
    }

    sim_out.body_soil_pos.append(&mut new_entries);
}

/// Checks whether soil on `layer` at `(ii, jj)` can avalanche into the
/// neighbouring column `(ic, jc)`, whose top must stay below `h_min`.
#[allow(clippy::too_many_arguments)]
pub fn check_unstable_body_cell(
    sim_out: &SimOut,
    ii: usize,
    jj: usize,
    layer: Layer,
    ic: usize,
    jc: usize,
    h_min: f64,
    tol: f64,
) -> Option<Status> {
    let src_top = sim_out.body[(layer, ii, jj)]?.max;
    let t_c = sim_out.terrain[(ic, jc)];
    let column = Column::read(sim_out, ic, jc);
    let neighbor = column.occupancy();

    let (target, top) = match column {
        Column::Empty => (Target::Terrain, t_c),
        Column::Single(l, b) => {
            if src_top + tol < b.min {
                // The source sits lower than the neighbouring body.
                (Target::Terrain, t_c)
            } else {
                layer_top(sim_out, l, b, ic, jc)
            }
        }
        Column::Double { bot, top } => {
            let mut pick = None;
            if src_top + tol < top.1.min {
                match sim_out.body_soil[(bot.0, ic, jc)] {
                    Some(s) if s.max + tol < top.1.min => pick = Some((Target::Soil(bot.0), s.max)),
                    Some(_) => {}
                    None => pick = Some((Target::Body(bot.0), bot.1.max)),
                }
            }
            match pick {
                Some(p) => p,
                None => layer_top(sim_out, top.0, top.1, ic, jc),
            }
        }
    };
    (top + tol < h_min).then_some(Status::new(neighbor, target))
}

/// Journal entry whose soil is being relaxed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SoilSource {
    pub layer: Layer,
    pub ii: usize,
    pub jj: usize,
    /// Index of the entry in `body_soil_pos`.
    pub nn: usize,
}

/// Moves body soil from `src` to `(ic, jc)` according to `status`.
///
/// No more than the entry holds is moved. New entries for soil landing on
/// the body go to `new_entries`.
#[allow(clippy::too_many_arguments)]
pub fn relax_unstable_body_cell(
    sim_out: &mut SimOut,
    status: Status,
    new_entries: &mut Vec<BodySoil>,
    dh_max: f64,
    src: SoilSource,
    ic: usize,
    jc: usize,
    grid: &Grid,
    body: &Body,
    tol: f64,
) {
    let SoilSource { layer, ii, jj, nn } = src;
    let Some(soil) = sim_out.body_soil[(layer, ii, jj)] else {
        return;
    };
    let entry_h = sim_out.body_soil_pos[nn].h_soil;

    match status.target {
        Target::Terrain => {
            let t_c = sim_out.terrain[(ic, jc)];
            let h_new = grid.floor_z(0.5 * (dh_max + soil.max + t_c), tol);
            let mut h_soil = (soil.max - h_new).min(entry_h);
            let mut h_new_c = t_c + h_soil;

            let ceiling = match status.neighbor {
                Occupancy::FirstOnly => sim_out.body[(Layer::First, ic, jc)],
                Occupancy::SecondOnly => sim_out.body[(Layer::Second, ic, jc)],
                _ => None,
            };
            if let Some(b) = ceiling {
                if h_new_c - tol > b.min {
                    h_soil = b.min - t_c;
                    h_new_c = b.min;
                }
            }

            let h_new = soil.max - h_soil;
            if h_new - tol > soil.min {
                sim_out.terrain[(ic, jc)] = h_new_c;
                sim_out.body_soil[(layer, ii, jj)] = Some(Span::new(soil.min, h_new));
                sim_out.body_soil_pos[nn].h_soil -= h_soil;
            } else {
                sim_out.terrain[(ic, jc)] += h_soil;
                sim_out.body_soil[(layer, ii, jj)] = None;
                sim_out.body_soil_pos[nn].h_soil = 0.0;
            }
        }
        Target::Soil(l) | Target::Body(l) => {
            let Some(b) = sim_out.body[(l, ic, jc)] else {
                return;
            };
            let dest = sim_out.body_soil[(l, ic, jc)];
            let base = dest.map_or(b.max, |s| s.max);
            let start = dest.map_or(b.max, |s| s.min);

            let mut h_new = grid.floor_z(0.5 * (dh_max + soil.max + base), tol);
            let mut h_soil = soil.max - h_new;
            if h_soil > entry_h {
                h_soil = entry_h;
                h_new = soil.max - h_soil;
            }
            let h_new_c = base + h_soil;
            // Upper body layer closing the gap above the target.
            let ceiling = sim_out.body[(l.other(), ic, jc)]
                .filter(|o| o.min > b.min)
                .map(|o| o.min);

            let dest_top = if h_new - tol > soil.min {
                let top = match ceiling {
                    Some(c) if h_new_c - tol > c => {
                        h_soil = c - base;
                        sim_out.body_soil[(layer, ii, jj)] = Some(Span::new(soil.min, soil.max - h_soil));
                        c
                    }
                    _ => {
                        sim_out.body_soil[(layer, ii, jj)] = Some(Span::new(soil.min, h_new));
                        h_new_c
                    }
                };
                sim_out.body_soil_pos[nn].h_soil -= h_soil;
                top
            } else {
                sim_out.body_soil[(layer, ii, jj)] = None;
                sim_out.body_soil_pos[nn].h_soil = 0.0;
                h_new_c
            };

            sim_out.body_soil[(l, ic, jc)] = Some(Span::new(start, dest_top));
            if h_soil > tol {
                new_entries.push(BodySoil {
                    layer: l,
                    ii: ic,
                    jj: jc,
                    pos: body.frame_pos(grid, ic, jc, b.max),
                    h_soil,
                });
            }
        }
    }
}
