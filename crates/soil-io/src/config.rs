use serde::Deserialize;
use soil_geom::Vec3;
use soil_world::{Body, BodyKind, Grid, MergePolicy, SimParam, SoilError};
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, Default, Deserialize)]
pub struct SimConfig {
    #[serde(default)]
    pub grid: GridConfig,
    #[serde(default)]
    pub sim: SimSection,
    #[serde(default)]
    pub body: BodyConfig,
    #[serde(default)]
    pub trajectory: TrajectoryConfig,
    #[serde(default)]
    pub terrain: TerrainConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Half extents of the grid and cell sizes, in metres.
#[derive(Clone, Debug, Deserialize)]
pub struct GridConfig {
    #[serde(default = "default_grid_size")]
    pub size_x: f64,
    #[serde(default = "default_grid_size")]
    pub size_y: f64,
    #[serde(default = "default_grid_size")]
    pub size_z: f64,
    #[serde(default = "default_cell_size_xy")]
    pub cell_size_xy: f64,
    #[serde(default = "default_cell_size_z")]
    pub cell_size_z: f64,
}
fn default_grid_size() -> f64 {
    4.0
}
fn default_cell_size_xy() -> f64 {
    0.05
}
fn default_cell_size_z() -> f64 {
    0.01
}
impl Default for GridConfig {
    fn default() -> Self {
        Self {
            size_x: default_grid_size(),
            size_y: default_grid_size(),
            size_z: default_grid_size(),
            cell_size_xy: default_cell_size_xy(),
            cell_size_z: default_cell_size_z(),
        }
    }
}
impl GridConfig {
    pub fn build(&self) -> Result<Grid, SoilError> {
        Grid::new(
            self.size_x,
            self.size_y,
            self.size_z,
            self.cell_size_xy,
            self.cell_size_z,
        )
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct SimSection {
    #[serde(default = "default_repose_angle")]
    pub repose_angle: f64,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    #[serde(default = "default_cell_buffer")]
    pub cell_buffer: usize,
    #[serde(default)]
    pub merge_policy: MergePolicy,
    #[serde(default)]
    pub compact_journal: bool,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
}
fn default_repose_angle() -> f64 {
    0.85
}
fn default_max_iterations() -> usize {
    3
}
fn default_cell_buffer() -> usize {
    4
}
fn default_seed() -> u64 {
    1234
}
fn default_tolerance() -> f64 {
    1e-5
}
impl Default for SimSection {
    fn default() -> Self {
        Self {
            repose_angle: default_repose_angle(),
            max_iterations: default_max_iterations(),
            cell_buffer: default_cell_buffer(),
            merge_policy: MergePolicy::default(),
            compact_journal: false,
            seed: default_seed(),
            tolerance: default_tolerance(),
        }
    }
}
impl SimSection {
    pub fn params(&self) -> Result<SimParam, SoilError> {
        Ok(
            SimParam::new(self.repose_angle, self.max_iterations, self.cell_buffer)?
                .with_merge_policy(self.merge_policy)
                .with_compact_journal(self.compact_journal),
        )
    }
}

/// Landmarks of a body in its reference pose.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct BodyShape {
    #[serde(default)]
    pub o: [f64; 3],
    pub j: [f64; 3],
    pub b: [f64; 3],
    pub t: [f64; 3],
    pub width: f64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct BodyConfig {
    #[serde(default = "default_body_kind")]
    pub kind: BodyKind,
    #[serde(default = "default_bucket")]
    pub bucket: BodyShape,
    #[serde(default = "default_blade")]
    pub blade: BodyShape,
}
fn default_body_kind() -> BodyKind {
    BodyKind::Bucket
}
fn default_bucket() -> BodyShape {
    BodyShape {
        o: [0.0, 0.0, 0.0],
        j: [0.0, 0.0, 0.0],
        b: [0.0, 0.0, -0.5],
        t: [0.7, 0.0, -0.5],
        width: 0.5,
    }
}
fn default_blade() -> BodyShape {
    BodyShape {
        o: [0.0, 0.0, 0.0],
        j: [0.9, 0.0, 0.2],
        b: [0.75, 0.0, 1.5],
        t: [1.6, 0.0, -0.4],
        width: 4.5,
    }
}
impl Default for BodyConfig {
    fn default() -> Self {
        Self {
            kind: default_body_kind(),
            bucket: default_bucket(),
            blade: default_blade(),
        }
    }
}
impl BodyConfig {
    /// Shape of the selected body kind.
    pub fn shape(&self) -> &BodyShape {
        match self.kind {
            BodyKind::Bucket => &self.bucket,
            BodyKind::Blade => &self.blade,
        }
    }

    pub fn build(&self) -> Result<Body, SoilError> {
        let s = self.shape();
        Body::new(
            self.kind,
            Vec3::from(s.o),
            Vec3::from(s.j),
            Vec3::from(s.b),
            Vec3::from(s.t),
            s.width,
        )
    }
}

/// Parabola `z = a x^2 + b x + c` through `(x_i, z_i)` with its minimum at
/// `(x_min, z_min)`.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
pub struct Parabola {
    pub x_i: f64,
    pub z_i: f64,
    pub x_min: f64,
    pub z_min: f64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct TrajectoryConfig {
    #[serde(default)]
    pub random: bool,
    #[serde(default = "default_samples")]
    pub samples: usize,
    #[serde(default = "default_duration")]
    pub duration: f64,
    #[serde(default = "default_max_dt")]
    pub max_dt: f64,
    #[serde(default = "default_bucket_path")]
    pub bucket: Parabola,
    #[serde(default = "default_blade_path")]
    pub blade: Parabola,
}
fn default_samples() -> usize {
    10000
}
fn default_duration() -> f64 {
    8.0
}
fn default_max_dt() -> f64 {
    0.2
}
fn default_bucket_path() -> Parabola {
    Parabola {
        x_i: -2.0,
        z_i: 1.5,
        x_min: 0.1,
        z_min: 0.25,
    }
}
fn default_blade_path() -> Parabola {
    Parabola {
        x_i: -2.0,
        z_i: 0.1,
        x_min: 0.1,
        z_min: 0.0,
    }
}
impl Default for TrajectoryConfig {
    fn default() -> Self {
        Self {
            random: false,
            samples: default_samples(),
            duration: default_duration(),
            max_dt: default_max_dt(),
            bucket: default_bucket_path(),
            blade: default_blade_path(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct TerrainConfig {
    /// Peak height of the initial noise, in metres.
    #[serde(default = "default_amplitude")]
    pub amplitude: f64,
}
fn default_amplitude() -> f64 {
    0.3
}
impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            amplitude: default_amplitude(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
    #[serde(default)]
    pub write: bool,
    #[serde(default)]
    pub check: bool,
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("results")
}
impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            write: false,
            check: false,
        }
    }
}

pub fn load_config_from_path(path: &Path) -> Result<SimConfig, Box<dyn Error>> {
    let s = fs::read_to_string(path)?;
    let cfg: SimConfig = toml::from_str(&s)?;
    Ok(cfg)
}
