use criterion::{Criterion, black_box, criterion_group, criterion_main};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::time::Duration;

use soil_dynamics::{SoilDynamics, relax_terrain};
use soil_geom::{Quat, Vec3};
use soil_world::{Body, Grid, Pose, SimOut, SimParam};

const TOL: f64 = 1e-5;

fn bucket() -> Body {
    Body::bucket(
        Vec3::ZERO,
        Vec3::ZERO,
        Vec3::new(0.0, 0.0, -0.5),
        Vec3::new(0.7, 0.0, -0.5),
        0.5,
    )
    .unwrap()
}

fn bench_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("step");
    let grid = Grid::new(4.0, 4.0, 4.0, 0.05, 0.01).unwrap();
    let param = SimParam::default();
    let mut base = SimOut::new(&grid);
    SoilDynamics::new(1234).init(&mut base, &grid, 0.2);

    let poses: Vec<Pose> = (0..10)
        .map(|n| Pose::new(Vec3::new(-1.0 + 0.02 * n as f64, 0.0, 0.3), Quat::IDENTITY))
        .collect();

    group.bench_function("bucket_dig_10_steps", |b| {
        b.iter(|| {
            let mut out = base.clone();
            let mut body = bucket();
            let mut dynamics = SoilDynamics::new(1234);
            for pose in &poses {
                dynamics
                    .step(&mut out, pose, &grid, &mut body, &param, TOL)
                    .unwrap();
            }
            black_box(out);
        })
    });
    group.finish();
}

fn bench_relax_terrain(c: &mut Criterion) {
    let mut group = c.benchmark_group("relax_terrain");
    let grid = Grid::new(4.0, 4.0, 4.0, 0.05, 0.01).unwrap();
    let param = SimParam::default();
    let body = bucket();
    let mut base = SimOut::new(&grid);
    SoilDynamics::new(7).init(&mut base, &grid, 1.0);

    group.bench_function("noise_161x161", |b| {
        b.iter(|| {
            let mut out = base.clone();
            let mut rng = StdRng::seed_from_u64(7);
            relax_terrain(&mut out, &grid, &body, &param, &mut rng, TOL);
            black_box(out);
        })
    });
    group.finish();
}

fn config() -> Criterion {
    Criterion::default()
        .sample_size(20)
        .measurement_time(Duration::from_secs(10))
}

criterion_group! {
    name = benches;
    config = config();
    targets = bench_step, bench_relax_terrain
}
criterion_main!(benches);
