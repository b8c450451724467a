//! Grid, tool bodies, simulation parameters, and the mutable soil state.
#![forbid(unsafe_code)]

pub mod body;
pub mod error;
pub mod field;
pub mod grid;
pub mod params;
pub mod state;
pub mod terrain;

pub use body::{Body, BodyKind, Corners, Pose};
pub use error::SoilError;
pub use field::Field2;
pub use grid::Grid;
pub use params::{MergePolicy, SimParam};
pub use state::{Area, BodySoil, Layer, LayerField, SimOut, Span};
pub use terrain::noise_terrain;
