/// Errors on the calibration path. They never affect normal detection.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CalibrationError {
    #[error("homography needs exactly 4 corners (have {corners})")]
    Precomplete { corners: usize },
    #[error("corners are collinear or coincident; no unique homography")]
    DegenerateConfiguration,
}

/// Errors from the key-value persistence layer.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
