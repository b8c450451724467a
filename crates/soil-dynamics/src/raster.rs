//! Rasterization of body walls onto the column grid.
//!
//! Every function works in index space: lateral indices are cell centres,
//! the vertical index is `ceil` of [`Grid::index_space`]'s `z`, i.e. the
//! cell whose top lies at `vect_z[z]`.

use soil_geom::Vec3;
use soil_world::{Field2, Grid};

/// Grid cell reached by a rasterized surface. Ordered by `(x, y, z)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cell {
    pub x: i64,
    pub y: i64,
    pub z: i64,
}

impl Cell {
    #[inline]
    pub const fn new(x: i64, y: i64, z: i64) -> Self {
        Self { x, y, z }
    }
}

/// Bounding box of a polygon in index space, whole cells only.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndexBox {
    pub min_x: i64,
    pub min_y: i64,
    pub len_x: usize,
    pub len_y: usize,
}

impl IndexBox {
    fn around(points: &[Vec3]) -> Self {
        let (mut lo_x, mut hi_x) = (f64::INFINITY, f64::NEG_INFINITY);
        let (mut lo_y, mut hi_y) = (f64::INFINITY, f64::NEG_INFINITY);
        for p in points {
            lo_x = lo_x.min(p.x);
            hi_x = hi_x.max(p.x);
            lo_y = lo_y.min(p.y);
            hi_y = hi_y.max(p.y);
        }
        let (min_x, max_x) = (lo_x.floor() as i64, hi_x.ceil() as i64);
        let (min_y, max_y) = (lo_y.floor() as i64, hi_y.ceil() as i64);
        Self {
            min_x,
            min_y,
            len_x: (max_x - min_x).max(0) as usize,
            len_y: (max_y - min_y).max(0) as usize,
        }
    }
}

/// Affine coordinates of the top-right corner of every cell in a box,
/// relative to a polygon's two edge vectors.
#[derive(Clone, Debug)]
pub struct Decomposition {
    pub c_u: Field2<f64>,
    pub c_v: Field2<f64>,
    pub inside: Field2<bool>,
    pub n_inside: usize,
}

fn decompose<F>(u: Vec3, v: Vec3, a: Vec3, area: IndexBox, is_inside: F) -> Decomposition
where
    F: Fn(f64, f64) -> bool,
{
    let mut c_u = Field2::new(area.len_x, area.len_y);
    let mut c_v = Field2::new(area.len_x, area.len_y);
    let mut inside = Field2::new(area.len_x, area.len_y);
    let mut n_inside = 0;

    let det = u.x * v.y - u.y * v.x;
    // Degenerate polygons cover no interior cell.
    if det.abs() < 1e-10 || !det.is_finite() {
        return Decomposition {
            c_u,
            c_v,
            inside,
            n_inside,
        };
    }

    for ii_s in 0..area.len_x {
        let ii = area.min_x as f64 + 0.5 + ii_s as f64 - a.x;
        for jj_s in 0..area.len_y {
            let jj = area.min_y as f64 + 0.5 + jj_s as f64 - a.y;
            let cu = (v.y * ii - v.x * jj) / det;
            let cv = (-u.y * ii + u.x * jj) / det;
            c_u[(ii_s, jj_s)] = cu;
            c_v[(ii_s, jj_s)] = cv;
            if is_inside(cu, cv) {
                inside[(ii_s, jj_s)] = true;
                n_inside += 1;
            }
        }
    }
    Decomposition {
        c_u,
        c_v,
        inside,
        n_inside,
    }
}

/// Decomposes cell corners on the basis `(ab, ad)` of a parallelogram with
/// origin `a`. A corner is inside when both coordinates lie in
/// `(tol, 1 - tol)`.
pub fn decompose_rectangle(ab: Vec3, ad: Vec3, a: Vec3, area: IndexBox, tol: f64) -> Decomposition {
    decompose(ab, ad, a, area, |cu, cv| {
        cu > tol && cu < 1.0 - tol && cv > tol && cv < 1.0 - tol
    })
}

/// Decomposes cell corners on the basis `(ab, ac)` of a triangle with
/// origin `a`. A corner is inside when both coordinates exceed `tol` and
/// their sum is below `1 - tol`.
pub fn decompose_triangle(ab: Vec3, ac: Vec3, a: Vec3, area: IndexBox, tol: f64) -> Decomposition {
    decompose(ab, ac, a, area, |cu, cv| cu > tol && cv > tol && cu + cv < 1.0 - tol)
}

/// Emits the four cells sharing the top-right corner of every inside cell,
/// at the height of the polygon plane at that corner.
fn corner_cells(dec: &Decomposition, area: IndexBox, a: Vec3, u: Vec3, v: Vec3, out: &mut Vec<Cell>) {
    out.reserve(4 * dec.n_inside);
    for ((ii_s, jj_s), &inside) in dec.inside.indexed_iter() {
        if !inside {
            continue;
        }
        let ii = area.min_x + ii_s as i64;
        let jj = area.min_y + jj_s as i64;
        let z = a.z + dec.c_u[(ii_s, jj_s)] * u.z + dec.c_v[(ii_s, jj_s)] * v.z;
        let kk = z.ceil() as i64;
        out.extend_from_slice(&[
            Cell::new(ii, jj, kk),
            Cell::new(ii + 1, jj, kk),
            Cell::new(ii, jj + 1, kk),
            Cell::new(ii + 1, jj + 1, kk),
        ]);
    }
}

/// Cells covered by the quadrilateral `abcd`, edges included.
///
/// The result is unsorted and may hold duplicates.
pub fn calc_rectangle_pos(a: Vec3, b: Vec3, c: Vec3, d: Vec3, grid: &Grid, tol: f64) -> Vec<Cell> {
    let a_ind = grid.index_space(a);
    let b_ind = grid.index_space(b);
    let c_ind = grid.index_space(c);
    let d_ind = grid.index_space(d);
    let area = IndexBox::around(&[a_ind, b_ind, c_ind, d_ind]);

    let ab = b_ind - a_ind;
    let ad = d_ind - a_ind;
    let dec = decompose_rectangle(ab, ad, a_ind, area, tol);

    let mut cells = Vec::new();
    corner_cells(&dec, area, a_ind, ab, ad, &mut cells);
    for (p, q) in [(a, b), (b, c), (c, d), (d, a)] {
        cells.extend(calc_line_pos(p, q, grid));
    }
    cells
}

/// Cells covered by the triangle `abc`, edges included.
///
/// The result is unsorted and may hold duplicates.
pub fn calc_triangle_pos(a: Vec3, b: Vec3, c: Vec3, grid: &Grid, tol: f64) -> Vec<Cell> {
    let a_ind = grid.index_space(a);
    let b_ind = grid.index_space(b);
    let c_ind = grid.index_space(c);
    let area = IndexBox::around(&[a_ind, b_ind, c_ind]);

    let ab = b_ind - a_ind;
    let ac = c_ind - a_ind;
    let dec = decompose_triangle(ab, ac, a_ind, area, tol);

    let mut cells = Vec::new();
    corner_cells(&dec, area, a_ind, ab, ac, &mut cells);
    for (p, q) in [(a, b), (b, c), (c, a)] {
        cells.extend(calc_line_pos(p, q, grid));
    }
    cells
}

/// Cells crossed by the segment `ab`, in traversal order.
///
/// A 3D DDA walk: the axis whose next boundary is closest along the segment
/// advances first. Consecutive duplicates are possible and kept.
pub fn calc_line_pos(a: Vec3, b: Vec3, grid: &Grid) -> Vec<Cell> {
    let mut p = grid.index_space(a);
    let q = grid.index_space(b);

    let step_x = if p.x < q.x { 1.0 } else { -1.0 };
    let step_y = if p.y < q.y { 1.0 } else { -1.0 };
    let step_z = if p.z < q.z { 1.0 } else { -1.0 };

    let nudge = |d: f64| if d == 0.0 { 1e-10 } else { d };
    let dx = nudge(q.x - p.x);
    let dy = nudge(q.y - p.y);
    let dz = nudge(q.z - p.z);

    let t_delta_x = (1.0 + (dy * dy + dz * dz) / (dx * dx)).sqrt();
    let t_delta_y = (1.0 + (dx * dx + dz * dz) / (dy * dy)).sqrt();
    let t_delta_z = (1.0 + (dx * dx + dy * dy) / (dz * dz)).sqrt();

    // Lateral boundaries sit half a cell from the centres; vertical ones at
    // whole indices.
    let mut t_max_x = t_delta_x
        * if step_x > 0.0 {
            p.x.round() + 0.5 - p.x
        } else {
            p.x - p.x.round() + 0.5
        };
    let mut t_max_y = t_delta_y
        * if step_y > 0.0 {
            p.y.round() + 0.5 - p.y
        } else {
            p.y - p.y.round() + 0.5
        };
    let mut t_max_z = t_delta_z
        * if step_z > 0.0 {
            p.z.ceil() - p.z
        } else {
            p.z - p.z.floor()
        };

    let length = (dx * dx + dy * dy + dz * dz).sqrt();
    let cell = |p: Vec3| Cell::new(p.x.round() as i64, p.y.round() as i64, p.z.ceil() as i64);

    let mut cells = vec![cell(p)];
    while t_max_x < length || t_max_y < length || t_max_z < length {
        if t_max_x < t_max_y {
            if t_max_x < t_max_z {
                p.x += step_x;
                t_max_x += t_delta_x;
            } else {
                p.z += step_z;
                t_max_z += t_delta_z;
            }
        } else if t_max_y < t_max_z {
            p.y += step_y;
            t_max_y += t_delta_y;
        } else {
            p.z += step_z;
            t_max_z += t_delta_z;
        }
        cells.push(cell(p));
    }
    cells
}
