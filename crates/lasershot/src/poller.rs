//! Fixed-period frame loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use lasershot_core::{RgbaImage, TimestampMs};
use lasershot_marker::ColorSegmenter;

use crate::{CycleReport, LaserShotSession};

/// Failure to obtain a frame from a device or file.
#[derive(thiserror::Error, Debug)]
pub enum AcquisitionError {
    #[error("frame source exhausted")]
    Exhausted,

    #[error("frame source failed: {0}")]
    Device(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Anything that can hand out the current frame.
pub trait FrameSource {
    /// Latest frame, or `Ok(None)` if none is ready yet.
    fn poll(&mut self) -> Result<Option<RgbaImage>, AcquisitionError>;
}

/// Counters collected by [`Poller::run`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PollStats {
    pub cycles: u64,
    pub frames: u64,
    pub skipped: u64,
    pub acquisition_errors: u64,
    pub points: u64,
}

impl PollStats {
    fn record(&mut self, report: &CycleReport) {
        self.cycles += 1;
        if report.skipped {
            self.skipped += 1;
        } else {
            self.frames += 1;
        }
        self.points += report.points.len() as u64;
    }
}

/// Polls a [`FrameSource`] every `period` and feeds the session.
#[derive(Clone, Copy, Debug)]
pub struct Poller {
    period: Duration,
}

impl Poller {
    pub fn new(period: Duration) -> Self {
        Self { period }
    }

    pub fn from_millis(period_ms: u64) -> Self {
        Self::new(Duration::from_millis(period_ms))
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// One cycle: poll the source and process whatever came back.
    ///
    /// An acquisition error is logged and treated like a frame that is not
    /// ready.
    pub fn step<F, S>(
        &self,
        source: &mut F,
        session: &mut LaserShotSession<S>,
        timestamp_ms: TimestampMs,
        stats: &mut PollStats,
    ) -> CycleReport
    where
        F: FrameSource + ?Sized,
        S: ColorSegmenter,
    {
        let frame = match source.poll() {
            Ok(frame) => frame,
            Err(e) => {
                log::warn!("frame acquisition failed at t={timestamp_ms}: {e}");
                stats.acquisition_errors += 1;
                None
            }
        };
        let report = session.process_cycle(frame.as_ref().map(|f| f.view()).as_ref(), timestamp_ms);
        stats.record(&report);
        report
    }

    /// Run until `stop` is set or the source reports it is exhausted.
    ///
    /// Timestamps are milliseconds since the loop started.
    pub fn run<F, S>(
        &self,
        source: &mut F,
        session: &mut LaserShotSession<S>,
        stop: &AtomicBool,
    ) -> PollStats
    where
        F: FrameSource + ?Sized,
        S: ColorSegmenter,
    {
        let start = Instant::now();
        let mut stats = PollStats::default();
        log::info!("polling every {} ms", self.period.as_millis());

        while !stop.load(Ordering::Relaxed) {
            let tick = Instant::now();
            let timestamp_ms = start.elapsed().as_millis() as TimestampMs;

            let frame = match source.poll() {
                Ok(frame) => frame,
                Err(AcquisitionError::Exhausted) => {
                    log::info!("frame source exhausted");
                    break;
                }
                Err(e) => {
                    log::warn!("frame acquisition failed at t={timestamp_ms}: {e}");
                    stats.acquisition_errors += 1;
                    None
                }
            };
            let report =
                session.process_cycle(frame.as_ref().map(|f| f.view()).as_ref(), timestamp_ms);
            stats.record(&report);

            if let Some(rest) = self.period.checked_sub(tick.elapsed()) {
                std::thread::sleep(rest);
            }
        }

        log::info!(
            "polling stopped after {} cycles ({} frames, {} points)",
            stats.cycles,
            stats.frames,
            stats.points
        );
        stats
    }
}

impl Default for Poller {
    fn default() -> Self {
        Self::from_millis(50)
    }
}
