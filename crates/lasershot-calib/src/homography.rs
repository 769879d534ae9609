use lasershot_core::{homography_from_4pt, is_degenerate_quad, Homography};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::CalibrationError;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Relative collinearity tolerance for corner quads.
const DEGENERACY_EPS: f64 = 1e-6;

/// Target corners in canonical order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CornerSlot {
    TopLeft,
    TopRight,
    BottomRight,
    BottomLeft,
}

impl CornerSlot {
    pub const ALL: [CornerSlot; 4] = [
        CornerSlot::TopLeft,
        CornerSlot::TopRight,
        CornerSlot::BottomRight,
        CornerSlot::BottomLeft,
    ];

    pub fn index(self) -> usize {
        match self {
            CornerSlot::TopLeft => 0,
            CornerSlot::TopRight => 1,
            CornerSlot::BottomRight => 2,
            CornerSlot::BottomLeft => 3,
        }
    }
}

impl std::fmt::Display for CornerSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CornerSlot::TopLeft => "top-left",
            CornerSlot::TopRight => "top-right",
            CornerSlot::BottomRight => "bottom-right",
            CornerSlot::BottomLeft => "bottom-left",
        };
        f.write_str(name)
    }
}

/// Destination rectangle of the rectified target.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TargetRect {
    pub width: f64,
    pub height: f64,
}

impl TargetRect {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// `[(0,0), (W,0), (W,H), (0,H)]`, matching [`CornerSlot::ALL`].
    pub fn corners(&self) -> [Point2<f64>; 4] {
        [
            Point2::new(0.0, 0.0),
            Point2::new(self.width, 0.0),
            Point2::new(self.width, self.height),
            Point2::new(0.0, self.height),
        ]
    }
}

impl Default for TargetRect {
    fn default() -> Self {
        Self::new(640.0, 360.0)
    }
}

/// Homography mapping image-space corners onto `target`.
///
/// `corners` must hold exactly four points in [`CornerSlot::ALL`] order.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(corners), fields(n = corners.len()))
)]
pub fn compute_homography(
    corners: &[Point2<f64>],
    target: TargetRect,
) -> Result<Homography, CalibrationError> {
    let src: &[Point2<f64>; 4] = corners
        .try_into()
        .map_err(|_| CalibrationError::Precomplete {
            corners: corners.len(),
        })?;
    let dst = target.corners();

    if is_degenerate_quad(src, DEGENERACY_EPS) || is_degenerate_quad(&dst, DEGENERACY_EPS) {
        log::warn!("degenerate calibration corners: {src:?}");
        return Err(CalibrationError::DegenerateConfiguration);
    }

    homography_from_4pt(src, &dst).ok_or(CalibrationError::DegenerateConfiguration)
}
