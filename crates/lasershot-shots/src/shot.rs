use lasershot_core::{MarkerPoint, TimestampMs};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// A group of detections believed to belong to one shot.
///
/// `center` is the running mean of `points`, updated on every append.
/// Deserialization rejects an empty point list and rebuilds `center` from the
/// points.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoredShot")]
pub struct Shot {
    points: Vec<MarkerPoint>,
    center: Point2<f64>,
}

#[derive(Deserialize)]
struct StoredShot {
    points: Vec<MarkerPoint>,
}

impl TryFrom<StoredShot> for Shot {
    type Error = &'static str;

    fn try_from(stored: StoredShot) -> Result<Self, Self::Error> {
        let mut points = stored.points.into_iter();
        let first = points.next().ok_or("a shot needs at least one point")?;
        let mut shot = Shot::start(first);
        for p in points {
            shot.push(p);
        }
        Ok(shot)
    }
}

impl Shot {
    pub(crate) fn start(p: MarkerPoint) -> Self {
        Self {
            points: vec![p],
            center: p.position(),
        }
    }

    /// center' = (center * (n - 1) + p) / n, with n the post-append count.
    pub(crate) fn push(&mut self, p: MarkerPoint) {
        self.points.push(p);
        let n = self.points.len() as f64;
        self.center = Point2::new(
            (self.center.x * (n - 1.0) + p.x) / n,
            (self.center.y * (n - 1.0) + p.y) / n,
        );
    }

    pub fn points(&self) -> &[MarkerPoint] {
        &self.points
    }

    pub fn center(&self) -> Point2<f64> {
        self.center
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always false; a shot is created with one point.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last_point(&self) -> &MarkerPoint {
        // shots are never empty
        &self.points[self.points.len() - 1]
    }

    pub fn first_timestamp(&self) -> TimestampMs {
        self.points[0].timestamp_ms
    }
}

/// Caller-owned, append-only collection of shots for one session.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ShotSession {
    shots: Vec<Shot>,
}

impl ShotSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shots in creation order.
    pub fn shots(&self) -> &[Shot] {
        &self.shots
    }

    pub fn len(&self) -> usize {
        self.shots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shots.is_empty()
    }

    pub fn total_points(&self) -> usize {
        self.shots.iter().map(Shot::len).sum()
    }

    pub fn into_shots(self) -> Vec<Shot> {
        self.shots
    }

    pub(crate) fn shots_mut(&mut self) -> &mut Vec<Shot> {
        &mut self.shots
    }
}
