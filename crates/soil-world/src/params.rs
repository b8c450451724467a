use core::f64::consts::FRAC_PI_2;

use serde::Deserialize;

use crate::error::SoilError;
use crate::grid::Grid;

/// What to do when a new body interval overlaps neither existing layer of a
/// column that already holds two layers.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MergePolicy {
    /// Stretch whichever layer boundary is closest to the new interval.
    #[default]
    Repair,
    /// Fail the update with [`SoilError::DisjointLayers`].
    Reject,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SimParam {
    pub repose_angle: f64,
    pub max_iterations: usize,
    pub cell_buffer: usize,
    pub merge_policy: MergePolicy,
    /// Drop emptied journal entries at the start of each step.
    pub compact_journal: bool,
}

impl SimParam {
    pub fn new(
        repose_angle: f64,
        max_iterations: usize,
        cell_buffer: usize,
    ) -> Result<Self, SoilError> {
        if !(0.0..=FRAC_PI_2).contains(&repose_angle) {
            return Err(SoilError::ReposeAngle(repose_angle));
        }
        if cell_buffer < 2 {
            return Err(SoilError::CellBuffer(cell_buffer));
        }
        Ok(Self {
            repose_angle,
            max_iterations,
            cell_buffer,
            merge_policy: MergePolicy::default(),
            compact_journal: false,
        })
    }

    pub fn with_merge_policy(mut self, policy: MergePolicy) -> Self {
        self.merge_policy = policy;
        self
    }

    pub fn with_compact_journal(mut self, compact: bool) -> Self {
        self.compact_journal = compact;
        self
    }

    /// Largest stable height difference between two adjacent columns,
    /// rounded to a whole number of vertical cells.
    pub fn dh_max(&self, grid: &Grid) -> f64 {
        grid.round_z(grid.cell_size_xy * self.repose_angle.tan())
    }
}

impl Default for SimParam {
    fn default() -> Self {
        Self {
            repose_angle: 0.85,
            max_iterations: 3,
            cell_buffer: 4,
            merge_policy: MergePolicy::Repair,
            compact_journal: false,
        }
    }
}
