use log::{debug, info};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use soil_world::{Body, Grid, Pose, SimOut, SimParam, SoilError, noise_terrain};

use crate::body_pos::calc_body_pos;
use crate::body_soil::update_body_soil;
use crate::check::{check_body_movement, check_soil, check_volume};
use crate::intersect::move_intersecting_cells;
use crate::relax::{relax_body_soil, relax_terrain};

/// Steps the soil state as a body moves through it.
///
/// Owns the random generator used to shuffle search directions, so runs
/// started from the same seed are reproducible.
pub struct SoilDynamics {
    rng: StdRng,
}

impl SoilDynamics {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Fills the terrain with noise of the given amplitude. The noise seed
    /// is drawn from the generator.
    pub fn init(&mut self, sim_out: &mut SimOut, grid: &Grid, amplitude: f64) {
        let seed: i32 = self.rng.random();
        debug!("terrain noise seed {seed}");
        noise_terrain(&mut sim_out.terrain, grid, seed, amplitude);
    }

    /// Moves the body to `pose` and lets the soil settle.
    ///
    /// Returns `Ok(false)` without touching the state when the body moved
    /// less than half a cell since the last update.
    pub fn step(
        &mut self,
        sim_out: &mut SimOut,
        pose: &Pose,
        grid: &Grid,
        body: &mut Body,
        sim_param: &SimParam,
        tol: f64,
    ) -> Result<bool, SoilError> {
        if !check_body_movement(pose, grid, body) {
            debug!(target: "step", "body movement below half a cell, skipping");
            return Ok(false);
        }

        if sim_param.compact_journal {
            let before = sim_out.body_soil_pos.len();
            sim_out.body_soil_pos.retain(|e| e.h_soil >= tol);
            debug!(
                "compacted body soil journal from {before} to {} entries",
                sim_out.body_soil_pos.len()
            );
        }

        calc_body_pos(sim_out, pose, grid, body, sim_param, tol)?;
        update_body_soil(sim_out, pose, grid, body, tol);
        move_intersecting_cells(sim_out, grid, body, &mut self.rng, tol)?;

        sim_out.equilibrium = false;
        let mut it = 0;
        while !sim_out.equilibrium && it < sim_param.max_iterations {
            it += 1;
            sim_out.impact_area = sim_out.body_area.union(sim_out.relax_area);
            relax_terrain(sim_out, grid, body, sim_param, &mut self.rng, tol);
            sim_out.body_soil_pos.shuffle(&mut self.rng);
            relax_body_soil(sim_out, grid, body, sim_param, &mut self.rng, tol);
        }
        debug!("relaxation ran {it} iterations, equilibrium {}", sim_out.equilibrium);

        info!(
            target: "step",
            "body at ({:.3}, {:.3}, {:.3}), {} body soil entries",
            pose.pos.x,
            pose.pos.y,
            pose.pos.z,
            sim_out.body_soil_pos.len()
        );
        Ok(true)
    }

    /// Runs the volume and structure checks. Both are always run so that
    /// every failure is logged.
    pub fn check(&self, sim_out: &SimOut, init_volume: f64, grid: &Grid, tol: f64) -> bool {
        let volume = check_volume(sim_out, init_volume, grid, tol);
        let soil = check_soil(sim_out, tol);
        volume && soil
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use soil_geom::{Quat, Vec3};
    use soil_world::Layer;

    const TOL: f64 = 1e-5;

    fn setup() -> (Grid, SimOut, Body, SimParam) {
        let grid = Grid::new(1.0, 1.0, 1.0, 0.05, 0.01).unwrap();
        let out = SimOut::new(&grid);
        let body = Body::bucket(
            Vec3::ZERO,
            Vec3::ZERO,
            Vec3::new(0.0, 0.0, -0.2),
            Vec3::new(0.3, 0.0, -0.2),
            0.2,
        )
        .unwrap();
        (grid, out, body, SimParam::default())
    }

    #[test]
    fn same_seed_same_terrain() {
        let (grid, mut a, _, _) = setup();
        let mut b = a.clone();
        SoilDynamics::new(7).init(&mut a, &grid, 0.2);
        SoilDynamics::new(7).init(&mut b, &grid, 0.2);
        assert_eq!(a.terrain, b.terrain);
        assert!(a.terrain.iter().any(|&h| h != 0.0));
    }

    #[test]
    fn step_above_terrain_only_tracks_body() {
        let (grid, mut out, mut body, param) = setup();
        let mut dynamics = SoilDynamics::new(1);
        let pose = Pose::new(Vec3::new(0.0, 0.0, 0.5), Quat::IDENTITY);
        assert!(dynamics.step(&mut out, &pose, &grid, &mut body, &param, TOL).unwrap());
        assert_eq!(body.pose, Some(pose));
        assert!(out.body[Layer::First].iter().any(Option::is_some));
        assert_eq!(out.soil_volume(&grid), 0.0);
        assert!(dynamics.check(&out, 0.0, &grid, TOL));

        // A nudge below half a cell is ignored.
        let nudge = Pose::new(Vec3::new(0.001, 0.0, 0.5), Quat::IDENTITY);
        assert!(!dynamics.step(&mut out, &nudge, &grid, &mut body, &param, TOL).unwrap());
        assert_eq!(body.pose, Some(pose));
    }

    #[test]
    fn digging_conserves_volume() {
        let (grid, mut out, mut body, param) = setup();
        let mut dynamics = SoilDynamics::new(3);
        let init_volume = out.soil_volume(&grid);

        for n in 0..6 {
            let x = -0.3 + 0.05 * n as f64;
            let pose = Pose::new(Vec3::new(x, 0.0, 0.1), Quat::IDENTITY);
            dynamics.step(&mut out, &pose, &grid, &mut body, &param, TOL).unwrap();
            assert!(dynamics.check(&out, init_volume, &grid, TOL), "step {n}");
        }
        assert!(out.terrain.iter().any(|&h| h > 0.0));
    }

    #[test]
    fn compaction_drops_empty_entries() {
        let (grid, mut out, mut body, param) = setup();
        let param = param.with_compact_journal(true);
        out.body_soil_pos.push(soil_world::BodySoil {
            layer: Layer::First,
            ii: 3,
            jj: 3,
            pos: Vec3::ZERO,
            h_soil: 0.0,
        });
        let mut dynamics = SoilDynamics::new(1);
        let pose = Pose::new(Vec3::new(0.0, 0.0, 0.5), Quat::IDENTITY);
        dynamics.step(&mut out, &pose, &grid, &mut body, &param, TOL).unwrap();
        assert!(out.body_soil_pos.is_empty());
    }
}
