use chrono::{DateTime, Utc};
use lasershot_core::{Homography, Resolution};
use nalgebra::Point2;

use crate::{
    compute_homography, is_valid_at, CalibrationError, CalibrationRecord, CornerSlot, TargetRect,
};

/// Calibration workflow state.
#[derive(Clone, Debug, PartialEq)]
pub enum CalibrationState {
    /// No calibration in progress and none loaded.
    Idle,
    /// Corners are being captured. `armed` is the slot the next point fills.
    Collecting {
        corners: [Option<Point2<f64>>; 4],
        armed: Option<CornerSlot>,
    },
    /// All four corners captured; homography not yet accepted.
    Complete { corners: [Point2<f64>; 4] },
    /// A record is in use.
    Valid {
        record: CalibrationRecord,
        homography: Homography,
    },
    /// A stored record exists but does not apply (stale, other camera, other
    /// resolution, or unusable corners). Behaves like no calibration.
    Invalid { record: CalibrationRecord },
}

impl CalibrationState {
    pub fn is_idle(&self) -> bool {
        matches!(self, CalibrationState::Idle)
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, CalibrationState::Valid { .. })
    }

    pub fn is_collecting(&self) -> bool {
        matches!(self, CalibrationState::Collecting { .. })
    }
}

impl std::fmt::Display for CalibrationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CalibrationState::Idle => write!(f, "Idle"),
            CalibrationState::Collecting { corners, armed } => {
                let filled = corners.iter().flatten().count();
                match armed {
                    Some(slot) => write!(f, "Collecting {filled}/4 (waiting for {slot})"),
                    None => write!(f, "Collecting {filled}/4"),
                }
            }
            CalibrationState::Complete { .. } => write!(f, "Complete"),
            CalibrationState::Valid { record, .. } => write!(f, "Valid ({})", record.camera_id),
            CalibrationState::Invalid { .. } => write!(f, "Invalid"),
        }
    }
}

/// Result of a corner selection or capture request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// The slot will take the next captured point.
    Armed { slot: CornerSlot },
    /// A point was stored; `filled` corners are now known.
    Captured { slot: CornerSlot, filled: usize },
    /// The fourth corner was stored.
    Completed,
    /// The slot already has a corner; nothing changed.
    AlreadyFilled { slot: CornerSlot },
    /// No slot is armed; the point was ignored.
    NotArmed,
}

/// Drives four-corner capture and turns it into a calibration record.
#[derive(Clone, Debug)]
pub struct CalibrationManager {
    state: CalibrationState,
    target: TargetRect,
}

impl CalibrationManager {
    pub fn new(target: TargetRect) -> Self {
        Self {
            state: CalibrationState::Idle,
            target,
        }
    }

    pub fn state(&self) -> &CalibrationState {
        &self.state
    }

    pub fn target(&self) -> TargetRect {
        self.target
    }

    /// Drop any capture or loaded record.
    pub fn reset(&mut self) {
        self.state = CalibrationState::Idle;
        log::info!("calibration reset");
    }

    /// Number of captured corners.
    pub fn progress(&self) -> usize {
        match &self.state {
            CalibrationState::Collecting { corners, .. } => corners.iter().flatten().count(),
            CalibrationState::Complete { .. } | CalibrationState::Valid { .. } => 4,
            CalibrationState::Idle | CalibrationState::Invalid { .. } => 0,
        }
    }

    /// Captured corners in slot order (only filled ones).
    pub fn corners(&self) -> Vec<Point2<f64>> {
        match &self.state {
            CalibrationState::Collecting { corners, .. } => {
                corners.iter().flatten().copied().collect()
            }
            CalibrationState::Complete { corners } => corners.to_vec(),
            CalibrationState::Valid { record, .. } => record.corner_points().to_vec(),
            CalibrationState::Idle | CalibrationState::Invalid { .. } => Vec::new(),
        }
    }

    /// Designate the slot the next captured point goes to.
    ///
    /// Starts a fresh capture unless one is already running. A filled slot is
    /// rejected without changing state.
    pub fn select_corner(&mut self, slot: CornerSlot) -> CaptureOutcome {
        match &mut self.state {
            CalibrationState::Collecting { corners, armed } => {
                if corners[slot.index()].is_some() {
                    return CaptureOutcome::AlreadyFilled { slot };
                }
                *armed = Some(slot);
            }
            CalibrationState::Complete { .. } => return CaptureOutcome::AlreadyFilled { slot },
            CalibrationState::Idle
            | CalibrationState::Valid { .. }
            | CalibrationState::Invalid { .. } => {
                self.state = CalibrationState::Collecting {
                    corners: [None; 4],
                    armed: Some(slot),
                };
            }
        }
        log::debug!("waiting for {slot} corner");
        CaptureOutcome::Armed { slot }
    }

    /// Store `point` in the armed slot.
    pub fn capture(&mut self, point: Point2<f64>) -> CaptureOutcome {
        let CalibrationState::Collecting { corners, armed } = &mut self.state else {
            return CaptureOutcome::NotArmed;
        };
        let Some(slot) = armed.take() else {
            return CaptureOutcome::NotArmed;
        };
        if corners[slot.index()].is_some() {
            return CaptureOutcome::AlreadyFilled { slot };
        }
        corners[slot.index()] = Some(point);
        log::info!("captured {slot} corner at ({:.1}, {:.1})", point.x, point.y);

        let filled = corners.iter().flatten().count();
        let complete = match *corners {
            [Some(a), Some(b), Some(c), Some(d)] => Some([a, b, c, d]),
            _ => None,
        };
        if let Some(corners) = complete {
            self.state = CalibrationState::Complete { corners };
            return CaptureOutcome::Completed;
        }
        CaptureOutcome::Captured { slot, filled }
    }

    /// Homography from the current corners onto the target rectangle.
    pub fn compute_homography(&self) -> Result<Homography, CalibrationError> {
        compute_homography(&self.corners(), self.target)
    }

    /// Corners captured towards a new calibration. Zero outside a capture.
    fn captured(&self) -> usize {
        match &self.state {
            CalibrationState::Collecting { corners, .. } => corners.iter().flatten().count(),
            CalibrationState::Complete { .. } => 4,
            _ => 0,
        }
    }

    /// Compute the homography and record for the captured corners without
    /// changing state. Pair with [`CalibrationManager::accept`] once the record
    /// is stored.
    pub fn prepare(
        &self,
        camera_id: &str,
        resolution: Resolution,
        now: DateTime<Utc>,
    ) -> Result<(CalibrationRecord, Homography), CalibrationError> {
        let CalibrationState::Complete { corners } = &self.state else {
            return Err(CalibrationError::Precomplete {
                corners: self.captured(),
            });
        };
        let homography = compute_homography(corners, self.target)?;
        let record = CalibrationRecord::new(camera_id, resolution, now, *corners);
        Ok((record, homography))
    }

    /// Make a prepared calibration the current one.
    pub fn accept(&mut self, record: CalibrationRecord, homography: Homography) {
        log::info!("calibration accepted for camera {:?}", record.camera_id);
        self.state = CalibrationState::Valid { record, homography };
    }

    /// [`prepare`](CalibrationManager::prepare) followed by
    /// [`accept`](CalibrationManager::accept).
    ///
    /// On error the state is left as it was.
    pub fn finish(
        &mut self,
        camera_id: &str,
        resolution: Resolution,
        now: DateTime<Utc>,
    ) -> Result<(CalibrationRecord, Homography), CalibrationError> {
        let (record, homography) = self.prepare(camera_id, resolution, now)?;
        self.accept(record.clone(), homography);
        Ok((record, homography))
    }

    /// Adopt a stored record if it still applies.
    ///
    /// Returns the homography when the record is valid. An invalid record
    /// moves to [`CalibrationState::Invalid`]; no record leaves the state
    /// untouched. Never interrupts a capture in progress.
    pub fn restore(
        &mut self,
        record: Option<CalibrationRecord>,
        camera_id: &str,
        resolution: Resolution,
        now: DateTime<Utc>,
    ) -> Option<Homography> {
        if matches!(
            self.state,
            CalibrationState::Collecting { .. } | CalibrationState::Complete { .. }
        ) {
            return None;
        }
        let record = record?;
        if !is_valid_at(Some(&record), resolution, camera_id, now) {
            self.state = CalibrationState::Invalid { record };
            return None;
        }
        match compute_homography(&record.corner_points(), self.target) {
            Ok(homography) => {
                self.state = CalibrationState::Valid { record, homography };
                Some(homography)
            }
            Err(e) => {
                log::warn!("stored calibration unusable: {e}");
                self.state = CalibrationState::Invalid { record };
                None
            }
        }
    }
}

impl Default for CalibrationManager {
    fn default() -> Self {
        Self::new(TargetRect::default())
    }
}
