use lasershot_calib::{CalibrationError, StoreError};

/// Errors produced by the facade helpers.
#[derive(thiserror::Error, Debug)]
pub enum LaserShotError {
    #[error(transparent)]
    Calibration(#[from] CalibrationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "image")]
    #[error(transparent)]
    Image(#[from] image::ImageError),
}
