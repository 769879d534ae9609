//! High-level facade crate for the `lasershot-*` workspace.
//!
//! This crate provides:
//! - re-exports of the underlying crates,
//! - [`PerspectiveCorrector`], which maps detections into target space,
//! - [`LaserShotSession`], the per-frame pipeline tying extraction, shot
//!   grouping and calibration together,
//! - [`Poller`], a fixed-period loop over a [`FrameSource`],
//! - (feature `image`) loading frames from image files.
//!
//! ## Quickstart
//!
//! ```
//! use lasershot::{LaserShotConfig, LaserShotSession, MarkerPoint};
//!
//! let mut session = LaserShotSession::from_config(&LaserShotConfig::default());
//! for p in [
//!     MarkerPoint::new(100.0, 100.0, 0),
//!     MarkerPoint::new(102.0, 101.0, 50),
//!     MarkerPoint::new(400.0, 400.0, 60),
//! ] {
//!     session.record_point(p);
//! }
//! assert_eq!(session.shots().len(), 2);
//! ```
//!
//! ## API map
//! - `lasershot::core`: points, images, homographies, logger.
//! - `lasershot::marker`: color segmentation and marker extraction.
//! - `lasershot::shots`: online shot grouping.
//! - `lasershot::calib`: corner capture, homography, calibration records.

pub use lasershot_calib as calib;
pub use lasershot_core as core;
pub use lasershot_marker as marker;
pub use lasershot_shots as shots;

pub use lasershot_calib::{
    CalibrationError, CalibrationManager, CalibrationRecord, CalibrationState, CalibrationStore,
    CaptureOutcome, CornerSlot, JsonFileStore, KeyValueStore, MemoryStore, StoreError, TargetRect,
};
pub use lasershot_core::{Homography, MarkerPoint, Resolution, RgbaImage, RgbaImageView};
pub use lasershot_marker::{ColorSegmenter, HsvRange, HsvThresholdSegmenter, MarkerParams};
pub use lasershot_shots::{Assignment, Shot, ShotParams, ShotSession};

mod config;
mod corrector;
mod error;
mod poller;
mod session;

#[cfg(feature = "image")]
pub mod frames;

pub use config::LaserShotConfig;
pub use corrector::PerspectiveCorrector;
pub use error::LaserShotError;
pub use poller::{AcquisitionError, FrameSource, PollStats, Poller};
pub use session::{CycleReport, LaserShotSession, Mode};
