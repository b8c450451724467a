use clap::{Parser, ValueEnum};
use log::{LevelFilter, info, warn};
use simplelog::{ColorChoice, CombinedLogger, ConfigBuilder, TermLogger, TerminalMode, WriteLogger};
use soil_dynamics::SoilDynamics;
use soil_io::{ResultsWriter, SimConfig, load_config_from_path};
use soil_world::{BodyKind, SimOut};
use std::error::Error;
use std::fs::File;
use std::path::{Path, PathBuf};

mod trajectory;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum BodyArg {
    Bucket,
    Blade,
}

impl From<BodyArg> for BodyKind {
    fn from(b: BodyArg) -> Self {
        match b {
            BodyArg::Bucket => BodyKind::Bucket,
            BodyArg::Blade => BodyKind::Blade,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "soilsim")]
#[command(about = "Simulates a bucket or blade moving through soil", long_about = None)]
struct Args {
    /// TOML run configuration; built-in defaults are used without it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Body to simulate
    #[arg(long, value_enum)]
    body: Option<BodyArg>,

    /// Seed of the random generator
    #[arg(long)]
    seed: Option<u64>,

    /// Draw the trajectory parameters at random
    #[arg(long)]
    random_trajectory: bool,

    /// Check volume and soil consistency after every step
    #[arg(long)]
    check: bool,

    /// Write CSV results after every step
    #[arg(long)]
    write: bool,

    /// Directory for CSV results
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Also log to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn init_logging(log_file: Option<&Path>) -> Result<(), Box<dyn Error>> {
    match log_file {
        Some(path) => {
            let config = ConfigBuilder::new().set_time_level(LevelFilter::Off).build();
            CombinedLogger::init(vec![
                TermLogger::new(
                    LevelFilter::Info,
                    config.clone(),
                    TerminalMode::Mixed,
                    ColorChoice::Auto,
                ),
                WriteLogger::new(LevelFilter::Debug, config, File::create(path)?),
            ])?;
        }
        None => {
            env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
        }
    }
    Ok(())
}

fn apply_overrides(cfg: &mut SimConfig, args: &Args) {
    if let Some(body) = args.body {
        cfg.body.kind = body.into();
    }
    if let Some(seed) = args.seed {
        cfg.sim.seed = seed;
    }
    if let Some(dir) = &args.output_dir {
        cfg.output.dir = dir.clone();
    }
    cfg.trajectory.random |= args.random_trajectory;
    cfg.output.check |= args.check;
    cfg.output.write |= args.write;
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_logging(args.log_file.as_deref())?;

    let mut cfg = match &args.config {
        Some(path) => load_config_from_path(path)?,
        None => SimConfig::default(),
    };
    apply_overrides(&mut cfg, &args);

    let grid = cfg.grid.build()?;
    let sim_param = cfg.sim.params()?;
    let mut body = cfg.body.build()?;
    let tol = cfg.sim.tolerance;

    let mut dynamics = SoilDynamics::new(cfg.sim.seed);
    let poses = trajectory::build_trajectory(&cfg.trajectory, &body, &grid, dynamics.rng())?;

    let mut sim_out = SimOut::new(&grid);
    dynamics.init(&mut sim_out, &grid, cfg.terrain.amplitude);
    let init_volume = sim_out.soil_volume(&grid);

    let writer = if cfg.output.write {
        Some(ResultsWriter::new(&cfg.output.dir)?)
    } else {
        None
    };

    info!(
        "simulating a {:?} over {} poses on a {}x{} grid",
        body.kind,
        poses.len(),
        grid.size_x(),
        grid.size_y()
    );
    let mut failed_checks = 0;
    for (n, pose) in poses.iter().enumerate() {
        info!(target: "step", "step {n} / {}", poses.len() - 1);
        dynamics.step(&mut sim_out, pose, &grid, &mut body, &sim_param, tol)?;

        if cfg.output.check && !dynamics.check(&sim_out, init_volume, &grid, tol) {
            failed_checks += 1;
        }
        if let Some(writer) = &writer {
            writer.write(&sim_out, &grid, &body)?;
        }
    }

    if failed_checks > 0 {
        warn!("{failed_checks} steps failed the consistency checks");
    }
    info!(
        "done, soil volume {:.6} m3 (initial {:.6} m3)",
        sim_out.soil_volume(&grid),
        init_volume
    );
    Ok(())
}
