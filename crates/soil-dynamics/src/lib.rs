//! Soil displacement by a rigid body moving through a height-field terrain.
#![forbid(unsafe_code)]

pub mod body_pos;
pub mod body_soil;
pub mod check;
pub mod dynamics;
pub mod intersect;
pub mod raster;
pub mod relax;

pub use body_pos::{calc_body_pos, include_new_body_pos, update_body};
pub use body_soil::update_body_soil;
pub use check::{check_body_movement, check_soil, check_volume};
pub use dynamics::SoilDynamics;
pub use intersect::{
    SoilMove, locate_intersecting_cells, move_body_soil, move_intersecting_body,
    move_intersecting_body_soil, move_intersecting_cells,
};
pub use raster::{
    Cell, Decomposition, IndexBox, calc_line_pos, calc_rectangle_pos, calc_triangle_pos,
    decompose_rectangle, decompose_triangle,
};
pub use relax::{
    Occupancy, SoilSource, Status, Target, check_unstable_body_cell, check_unstable_terrain_cell,
    locate_unstable_terrain_cell, relax_body_soil, relax_terrain, relax_unstable_body_cell,
    relax_unstable_terrain_cell,
};
