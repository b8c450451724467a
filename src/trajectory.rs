//! Parabolic body trajectories for the command-line driver.

use rand::Rng;
use soil_geom::{Quat, Vec3};
use soil_io::{Parabola, TrajectoryConfig};
use soil_world::{Body, BodyKind, Grid, Pose};
use std::error::Error;

/// Body position and pitch at one point of the path.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sample {
    pub pos: Vec3,
    pub pitch: f64,
}

impl Sample {
    fn pose(self) -> Pose {
        Pose::new(self.pos, Quat::from_euler_zyx([0.0, self.pitch, 0.0]))
    }

    fn lerp(self, other: Sample, t: f64) -> Sample {
        Sample {
            pos: self.pos * (1.0 - t) + other.pos * t,
            pitch: self.pitch * (1.0 - t) + other.pitch * t,
        }
    }
}

/// Angle of the base in the XZ plane, so that a bucket starts with its
/// teeth pointing along the path. Blades keep their reference pitch.
pub fn origin_angle(body: &Body) -> f64 {
    match body.kind {
        BodyKind::Bucket => {
            let d = body.t_pos_init - body.b_pos_init;
            d.z.atan2(d.x)
        }
        BodyKind::Blade => 0.0,
    }
}

/// Draws a parabola within the range used for each body kind.
pub fn random_parabola<R: Rng + ?Sized>(kind: BodyKind, rng: &mut R) -> Parabola {
    let mut r = || rng.random::<f64>();
    match kind {
        BodyKind::Bucket => Parabola {
            x_i: -3.0 + 2.0 * r(),
            z_i: 0.5 + 1.5 * r(),
            x_min: -0.5 * r(),
            z_min: -0.25 + 0.5 * r(),
        },
        BodyKind::Blade => Parabola {
            x_i: -3.0 + 2.0 * r(),
            z_i: 0.1 + 0.1 * r(),
            x_min: -0.5 * r(),
            z_min: 0.1 + 0.1 * r(),
        },
    }
}

/// Samples `n` points of the parabola from `x_i` to its mirror image
/// `2 x_min - x_i`. The pitch follows the slope of the path.
pub fn parabola_samples(
    p: &Parabola,
    origin_angle: f64,
    n: usize,
) -> Result<Vec<Sample>, Box<dyn Error>> {
    if n < 2 {
        return Err(format!("a trajectory needs at least 2 samples, got {n}").into());
    }
    let span = p.x_i - p.x_min;
    if span.abs() < f64::EPSILON {
        return Err("x_i and x_min should differ".into());
    }
    let a = (p.z_i - p.z_min) / (span * span);
    let b = -2.0 * a * p.x_min;
    let c = a * p.x_min * p.x_min + p.z_min;

    let dx = -2.0 * span / (n - 1) as f64;
    Ok((0..n)
        .map(|ii| {
            let x = p.x_i + ii as f64 * dx;
            Sample {
                pos: Vec3::new(x, 0.0, a * x * x + b * x + c),
                pitch: -origin_angle + (2.0 * a * x + b).atan(),
            }
        })
        .collect())
}

/// Path position at time `t`, with the samples spread evenly over `duration`.
fn sample_at(samples: &[Sample], duration: f64, t: f64) -> Sample {
    let last = samples.len() - 1;
    let u = (t / duration).clamp(0.0, 1.0) * last as f64;
    let kk = (u.floor() as usize).min(last - 1);
    samples[kk].lerp(samples[kk + 1], u - kk as f64)
}

/// Resamples the path in time so that no body corner moves by more than one
/// cell per pose. Steps never exceed `max_dt`.
pub fn resample(
    samples: &[Sample],
    body: &Body,
    grid: &Grid,
    duration: f64,
    max_dt: f64,
) -> Vec<Pose> {
    let min_cell = grid.cell_size_xy.min(grid.cell_size_z);
    let mut poses = vec![samples[0].pose()];
    let mut dt = 0.1;
    let mut time = 0.1;
    while time + dt < duration {
        poses.push(sample_at(samples, duration, time).pose());

        let before = body.corners(&sample_at(samples, duration, time - 0.5 * dt).pose());
        let after = body.corners(&sample_at(samples, duration, time + 0.5 * dt).pose());
        let velocity = 1.25 * after.max_displacement(&before) / dt;
        dt = if velocity > 0.0 {
            (min_cell / velocity).min(max_dt)
        } else {
            max_dt
        };
        time += dt;
    }
    if let Some(end) = samples.last() {
        poses.push(end.pose());
    }
    poses
}

/// Builds the body poses of a run, drawing random parameters from `rng`
/// when the configuration asks for it.
pub fn build_trajectory<R: Rng + ?Sized>(
    cfg: &TrajectoryConfig,
    body: &Body,
    grid: &Grid,
    rng: &mut R,
) -> Result<Vec<Pose>, Box<dyn Error>> {
    let path = if cfg.random {
        random_parabola(body.kind, rng)
    } else {
        match body.kind {
            BodyKind::Bucket => cfg.bucket,
            BodyKind::Blade => cfg.blade,
        }
    };
    log::info!(
        "trajectory from ({:.3}, {:.3}) down to ({:.3}, {:.3})",
        path.x_i,
        path.z_i,
        path.x_min,
        path.z_min
    );
    let samples = parabola_samples(&path, origin_angle(body), cfg.samples)?;
    Ok(resample(&samples, body, grid, cfg.duration, cfg.max_dt))
}
