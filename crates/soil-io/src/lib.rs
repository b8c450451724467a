//! Run configuration and CSV result files.
#![forbid(unsafe_code)]

pub mod config;
pub mod writer;

pub use config::{
    BodyConfig, BodyShape, GridConfig, OutputConfig, Parabola, SimConfig, SimSection,
    TerrainConfig, TrajectoryConfig, load_config_from_path,
};
pub use writer::{ResultsWriter, WriteError};
