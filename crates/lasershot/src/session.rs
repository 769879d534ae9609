use chrono::{DateTime, Utc};
use lasershot_calib::{
    CalibrationManager, CalibrationStore, CaptureOutcome, CornerSlot, KeyValueStore,
};
use lasershot_core::{Homography, MarkerPoint, Resolution, RgbaImageView, TimestampMs};
use lasershot_marker::{ColorSegmenter, HsvThresholdSegmenter, MarkerExtractor};
use lasershot_shots::{Assignment, ShotClusterer, ShotSession};

use crate::{LaserShotConfig, LaserShotError, PerspectiveCorrector};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Where extracted points go.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Mode {
    /// Points are corrected (when calibrated) and grouped into shots.
    #[default]
    Detect,
    /// The first point of each cycle is offered to the calibration manager.
    Calibrate,
}

/// What one frame cycle did.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CycleReport {
    pub timestamp_ms: TimestampMs,
    /// True when no frame was ready.
    pub skipped: bool,
    /// Extracted points, in target space when a calibration is active.
    pub points: Vec<MarkerPoint>,
    pub assignments: Vec<Assignment>,
    pub calibration: Option<CaptureOutcome>,
}

/// Owns everything a tracking session needs and processes one frame at a time.
pub struct LaserShotSession<S = HsvThresholdSegmenter> {
    camera_id: String,
    resolution: Resolution,
    mode: Mode,
    extractor: MarkerExtractor<S>,
    clusterer: ShotClusterer,
    shots: ShotSession,
    calibration: CalibrationManager,
    corrector: PerspectiveCorrector,
}

impl LaserShotSession<HsvThresholdSegmenter> {
    pub fn from_config(config: &LaserShotConfig) -> Self {
        Self::new(config, HsvThresholdSegmenter::default())
    }
}

impl<S: ColorSegmenter> LaserShotSession<S> {
    pub fn new(config: &LaserShotConfig, segmenter: S) -> Self {
        Self {
            camera_id: config.camera_id.clone(),
            resolution: config.processing,
            mode: Mode::Detect,
            extractor: MarkerExtractor::new(segmenter, config.marker.clone()),
            clusterer: ShotClusterer::new(config.shots),
            shots: ShotSession::new(),
            calibration: CalibrationManager::new(config.target),
            corrector: PerspectiveCorrector::new(config.target),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    pub fn camera_id(&self) -> &str {
        &self.camera_id
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn shots(&self) -> &ShotSession {
        &self.shots
    }

    /// Hand the accumulated shots to the caller and start an empty session.
    pub fn take_shots(&mut self) -> ShotSession {
        std::mem::take(&mut self.shots)
    }

    pub fn calibration(&self) -> &CalibrationManager {
        &self.calibration
    }

    pub fn corrector(&self) -> &PerspectiveCorrector {
        &self.corrector
    }

    pub fn extractor(&self) -> &MarkerExtractor<S> {
        &self.extractor
    }

    /// Arm a corner slot and switch to calibration mode.
    pub fn begin_corner(&mut self, slot: CornerSlot) -> CaptureOutcome {
        self.mode = Mode::Calibrate;
        self.calibration.select_corner(slot)
    }

    /// Abandon any corner capture and go back to detection.
    pub fn cancel_calibration(&mut self) {
        if self.calibration.state().is_collecting()
            || matches!(
                self.calibration.state(),
                lasershot_calib::CalibrationState::Complete { .. }
            )
        {
            self.calibration.reset();
        }
        self.mode = Mode::Detect;
    }

    /// Run one frame cycle.
    ///
    /// `None` means the frame was not ready; nothing is updated.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, frame), fields(mode = ?self.mode))
    )]
    pub fn process_cycle(
        &mut self,
        frame: Option<&RgbaImageView<'_>>,
        timestamp_ms: TimestampMs,
    ) -> CycleReport {
        let mut report = CycleReport {
            timestamp_ms,
            skipped: frame.is_none(),
            ..CycleReport::default()
        };
        let points = self.extractor.extract(frame, timestamp_ms);
        if points.is_empty() {
            return report;
        }

        match self.mode {
            Mode::Calibrate => {
                let first = points[0];
                report.calibration = Some(self.calibration.capture(first.position()));
                report.points = points;
            }
            Mode::Detect => {
                let points = self.corrector.correct_points(points);
                report.assignments = points
                    .iter()
                    .map(|&p| self.clusterer.assign(&mut self.shots, p))
                    .collect();
                report.points = points;
            }
        }
        report
    }

    /// Feed an already extracted image-space point through correction and
    /// grouping, bypassing frame extraction.
    pub fn record_point(&mut self, point: MarkerPoint) -> Assignment {
        let p = self.corrector.correct_point(point);
        self.clusterer.assign(&mut self.shots, p)
    }

    /// Accept the captured corners, persist the record and start correcting.
    ///
    /// The new calibration takes effect only once the record is stored. On
    /// any failure the manager, the mode and the previous homography stay as
    /// they were.
    pub fn finish_calibration<K: KeyValueStore>(
        &mut self,
        store: &mut CalibrationStore<K>,
        now: DateTime<Utc>,
    ) -> Result<Homography, LaserShotError> {
        let (record, homography) =
            self.calibration
                .prepare(&self.camera_id, self.resolution, now)?;
        store.save(&record)?;
        self.calibration.accept(record, homography);
        self.corrector.set_homography(Some(homography));
        self.mode = Mode::Detect;
        Ok(homography)
    }

    /// Load a stored calibration if it applies to this camera.
    ///
    /// Returns `false` for a missing, unreadable, stale or mismatched record;
    /// the session then runs uncorrected.
    pub fn restore_calibration<K: KeyValueStore>(
        &mut self,
        store: &CalibrationStore<K>,
        now: DateTime<Utc>,
    ) -> bool {
        let record = match store.load() {
            Ok(record) => record,
            Err(e) => {
                log::warn!("calibration store unreadable, running uncorrected: {e}");
                return false;
            }
        };
        match self
            .calibration
            .restore(record, &self.camera_id, self.resolution, now)
        {
            Some(h) => {
                self.corrector.set_homography(Some(h));
                log::info!("using stored calibration for camera {:?}", self.camera_id);
                true
            }
            None => {
                log::info!("no usable stored calibration; running uncorrected");
                false
            }
        }
    }

    /// Give back the segmentation handle.
    pub fn release(self) -> S {
        self.extractor.release()
    }
}
