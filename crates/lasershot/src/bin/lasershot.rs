//! lasershot CLI: group laser points from image files and manage the stored
//! four-corner calibration.

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use lasershot::frames::ImageSequenceSource;
use lasershot::{
    calib, CalibrationManager, CalibrationStore, CornerSlot, JsonFileStore, LaserShotConfig,
    LaserShotSession, PollStats, Poller, Resolution,
};
use log::LevelFilter;
use nalgebra::Point2;

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "lasershot")]
#[command(about = "Laser shot grouping and four-corner target calibration")]
#[command(version)]
struct Cli {
    /// JSON session config; missing fields use defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract points from image files (one frame each) and print shots as JSON.
    Detect {
        /// Frames in capture order.
        #[arg(required = true)]
        frames: Vec<PathBuf>,

        #[command(flatten)]
        camera: CameraArgs,

        /// Ignore any stored calibration.
        #[arg(long)]
        uncorrected: bool,
    },

    /// Compute and store a calibration from four image-space corners.
    Calibrate {
        /// Four corners as `x,y`: top-left, top-right, bottom-right,
        /// bottom-left.
        #[arg(long, value_parser = parse_point, num_args = 4, required = true)]
        corners: Vec<Point2<f64>>,

        #[command(flatten)]
        camera: CameraArgs,
    },

    /// Report whether the stored calibration applies to this camera.
    Check {
        #[command(flatten)]
        camera: CameraArgs,
    },
}

#[derive(Debug, Clone, Args)]
struct CameraArgs {
    /// Camera identifier (overrides the config).
    #[arg(long)]
    camera_id: Option<String>,

    /// Processing width in pixels (overrides the config).
    #[arg(long)]
    width: Option<u32>,

    /// Processing height in pixels (overrides the config).
    #[arg(long)]
    height: Option<u32>,

    /// Calibration store file (overrides the config).
    #[arg(long)]
    store: Option<PathBuf>,
}

impl CameraArgs {
    fn apply(&self, mut cfg: LaserShotConfig) -> LaserShotConfig {
        if let Some(id) = &self.camera_id {
            cfg.camera_id = id.clone();
        }
        cfg.processing = Resolution::new(
            self.width.unwrap_or(cfg.processing.width),
            self.height.unwrap_or(cfg.processing.height),
        );
        if let Some(store) = &self.store {
            cfg.store_path = Some(store.display().to_string());
        }
        cfg
    }
}

fn parse_point(raw: &str) -> Result<Point2<f64>, String> {
    let (x, y) = raw
        .split_once(',')
        .ok_or_else(|| format!("expected `x,y`, got {raw:?}"))?;
    let x: f64 = x.trim().parse().map_err(|e| format!("bad x in {raw:?}: {e}"))?;
    let y: f64 = y.trim().parse().map_err(|e| format!("bad y in {raw:?}: {e}"))?;
    Ok(Point2::new(x, y))
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    #[cfg(feature = "tracing")]
    {
        let _ = level;
        lasershot::core::init_tracing(false);
    }
    #[cfg(not(feature = "tracing"))]
    {
        let _ = lasershot::core::init_with_level(level);
    }

    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            log::error!("{e}");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> CliResult<ExitCode> {
    let base = match &cli.config {
        Some(path) => LaserShotConfig::load_json(path)?,
        None => LaserShotConfig::default(),
    };

    match &cli.command {
        Commands::Detect {
            frames,
            camera,
            uncorrected,
        } => run_detect(camera.apply(base), frames, *uncorrected),
        Commands::Calibrate { corners, camera } => run_calibrate(camera.apply(base), corners),
        Commands::Check { camera } => run_check(camera.apply(base)),
    }
}

fn open_store(cfg: &LaserShotConfig) -> CalibrationStore<JsonFileStore> {
    CalibrationStore::new(JsonFileStore::new(cfg.store_path()))
}

fn run_detect(cfg: LaserShotConfig, frames: &[PathBuf], uncorrected: bool) -> CliResult<ExitCode> {
    let mut session = LaserShotSession::from_config(&cfg);
    if !uncorrected {
        session.restore_calibration(&open_store(&cfg), Utc::now());
    }

    let poller = Poller::from_millis(cfg.poll_period_ms);
    let mut source = ImageSequenceSource::new(frames.iter().cloned(), cfg.processing);
    let mut stats = PollStats::default();
    for i in 0..frames.len() {
        let timestamp_ms = i as i64 * cfg.poll_period_ms as i64;
        poller.step(&mut source, &mut session, timestamp_ms, &mut stats);
    }
    log::info!(
        "{} frames, {} points, {} shots",
        stats.frames,
        stats.points,
        session.shots().len()
    );

    println!("{}", serde_json::to_string_pretty(session.shots())?);
    Ok(if stats.acquisition_errors > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn run_calibrate(cfg: LaserShotConfig, corners: &[Point2<f64>]) -> CliResult<ExitCode> {
    if corners.len() != 4 {
        return Err(calib::CalibrationError::Precomplete {
            corners: corners.len(),
        }
        .into());
    }

    let mut manager = CalibrationManager::new(cfg.target);
    for (slot, &p) in CornerSlot::ALL.into_iter().zip(corners) {
        manager.select_corner(slot);
        manager.capture(p);
    }
    let (record, homography) = manager.finish(&cfg.camera_id, cfg.processing, Utc::now())?;
    open_store(&cfg).save(&record)?;
    log::info!("calibration stored in {}", cfg.store_path().display());

    println!("{}", serde_json::to_string_pretty(&homography.to_array())?);
    Ok(ExitCode::SUCCESS)
}

fn run_check(cfg: LaserShotConfig) -> CliResult<ExitCode> {
    let record = open_store(&cfg).load().unwrap_or_else(|e| {
        log::warn!("calibration store unreadable: {e}");
        None
    });
    if calib::is_valid(record.as_ref(), cfg.processing, &cfg.camera_id) {
        println!("valid");
        Ok(ExitCode::SUCCESS)
    } else {
        println!("invalid");
        Ok(ExitCode::from(2))
    }
}
