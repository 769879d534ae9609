//! Four-corner calibration of a planar target.
//!
//! - [`CalibrationManager`] collects the target corners one slot at a time.
//! - [`compute_homography`] maps the corners onto a canonical rectangle.
//! - [`CalibrationRecord`] is the persisted result; [`is_valid`] decides
//!   whether a stored record still applies to the current camera.
//! - [`CalibrationStore`] reads and writes records through any
//!   [`KeyValueStore`].

mod error;
mod homography;
mod manager;
mod record;
mod store;

pub use error::{CalibrationError, StoreError};
pub use homography::{compute_homography, CornerSlot, TargetRect};
pub use manager::{CalibrationManager, CalibrationState, CaptureOutcome};
pub use record::{
    is_valid, is_valid_at, CalibrationRecord, CornerPoint, MAX_CALIBRATION_AGE_DAYS,
};
pub use store::{CalibrationStore, JsonFileStore, KeyValueStore, MemoryStore, CALIBRATION_KEY};
