use lasershot_calib::TargetRect;
use lasershot_core::{warp_perspective_rgba, Homography, MarkerPoint, RgbaImage, RgbaImageView};

/// Maps frame content and detections into the calibrated target rectangle.
///
/// Without a homography the corrector is a pass-through for points and
/// produces no warped frames.
#[derive(Clone, Debug)]
pub struct PerspectiveCorrector {
    h_target_from_img: Option<Homography>,
    h_img_from_target: Option<Homography>,
    target: TargetRect,
}

impl PerspectiveCorrector {
    pub fn new(target: TargetRect) -> Self {
        Self {
            h_target_from_img: None,
            h_img_from_target: None,
            target,
        }
    }

    pub fn with_homography(target: TargetRect, h_target_from_img: Homography) -> Self {
        let mut c = Self::new(target);
        c.set_homography(Some(h_target_from_img));
        c
    }

    /// Replace the homography. A non-invertible matrix still corrects points
    /// but disables frame warping.
    pub fn set_homography(&mut self, h_target_from_img: Option<Homography>) {
        self.h_img_from_target = h_target_from_img.and_then(|h| h.inverse());
        if h_target_from_img.is_some() && self.h_img_from_target.is_none() {
            log::warn!("calibration homography is not invertible; frame warping disabled");
        }
        self.h_target_from_img = h_target_from_img;
    }

    pub fn homography(&self) -> Option<&Homography> {
        self.h_target_from_img.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.h_target_from_img.is_some()
    }

    pub fn target(&self) -> TargetRect {
        self.target
    }

    pub fn correct_point(&self, p: MarkerPoint) -> MarkerPoint {
        match &self.h_target_from_img {
            Some(h) => p.moved_to(h.apply(p.position())),
            None => p,
        }
    }

    pub fn correct_points(&self, points: Vec<MarkerPoint>) -> Vec<MarkerPoint> {
        if !self.is_active() {
            return points;
        }
        points.into_iter().map(|p| self.correct_point(p)).collect()
    }

    /// Rectified copy of `frame`, sized to the target rectangle.
    pub fn warp_frame(&self, frame: &RgbaImageView<'_>) -> Option<RgbaImage> {
        let h = self.h_img_from_target.as_ref()?;
        let w = self.target.width.round().max(1.0) as usize;
        let hgt = self.target.height.round().max(1.0) as usize;
        Some(warp_perspective_rgba(frame, h, w, hgt))
    }
}
