use lasershot_core::{MarkerPoint, TimestampMs};
use serde::{Deserialize, Serialize};

use crate::{Shot, ShotSession};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Thresholds for joining a point to an existing shot.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShotParams {
    /// Max Euclidean distance from the shot centroid.
    pub spatial_threshold: f64,
    /// Max absolute time difference to the shot's most recent point.
    pub temporal_threshold_ms: TimestampMs,
}

impl Default for ShotParams {
    fn default() -> Self {
        Self {
            spatial_threshold: 10.0,
            temporal_threshold_ms: 300,
        }
    }
}

impl ShotParams {
    /// Distance is measured to the centroid, time to the last point.
    pub fn accepts(&self, shot: &Shot, p: &MarkerPoint) -> bool {
        let c = shot.center();
        let dist = ((p.x - c.x).powi(2) + (p.y - c.y).powi(2)).sqrt();
        let dt = p.timestamp_ms.abs_diff(shot.last_point().timestamp_ms);
        let within_time =
            u64::try_from(self.temporal_threshold_ms).is_ok_and(|limit| dt <= limit);
        dist <= self.spatial_threshold && within_time
    }
}

/// Where a point ended up.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Assignment {
    Joined { shot: usize },
    Started { shot: usize },
}

impl Assignment {
    pub fn shot_index(&self) -> usize {
        match *self {
            Assignment::Joined { shot } | Assignment::Started { shot } => shot,
        }
    }
}

/// First-match greedy clusterer.
#[derive(Clone, Debug, Default)]
pub struct ShotClusterer {
    params: ShotParams,
}

impl ShotClusterer {
    pub fn new(params: ShotParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &ShotParams {
        &self.params
    }

    /// Add one point to `session`.
    ///
    /// Shots are scanned in creation order and the first acceptable one wins,
    /// even if a later shot is closer.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "trace", skip(self, session), fields(shots = session.len()))
    )]
    pub fn assign(&self, session: &mut ShotSession, point: MarkerPoint) -> Assignment {
        let shots = session.shots_mut();
        match shots.iter().position(|s| self.params.accepts(s, &point)) {
            Some(idx) => {
                shots[idx].push(point);
                Assignment::Joined { shot: idx }
            }
            None => {
                shots.push(Shot::start(point));
                let idx = shots.len() - 1;
                log::debug!(
                    "shot {idx} started at ({:.1}, {:.1}) t={}",
                    point.x,
                    point.y,
                    point.timestamp_ms
                );
                Assignment::Started { shot: idx }
            }
        }
    }

    pub fn assign_all<I>(&self, session: &mut ShotSession, points: I)
    where
        I: IntoIterator<Item = MarkerPoint>,
    {
        for p in points {
            self.assign(session, p);
        }
    }
}

/// Value-style form: consume the session, return it with `point` assigned.
pub fn assign(mut session: ShotSession, point: MarkerPoint, params: &ShotParams) -> ShotSession {
    ShotClusterer::new(*params).assign(&mut session, point);
    session
}
