use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Milliseconds on the session clock.
pub type TimestampMs = i64;

/// A single marker detection in frame (or target) coordinates.
///
/// Produced once per detected region and never mutated afterwards.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarkerPoint {
    pub x: f64,
    pub y: f64,
    #[serde(rename = "timestamp")]
    pub timestamp_ms: TimestampMs,
}

impl MarkerPoint {
    pub fn new(x: f64, y: f64, timestamp_ms: TimestampMs) -> Self {
        Self { x, y, timestamp_ms }
    }

    #[inline]
    pub fn position(&self) -> Point2<f64> {
        Point2::new(self.x, self.y)
    }

    /// Same timestamp, new position.
    pub fn moved_to(&self, p: Point2<f64>) -> Self {
        Self {
            x: p.x,
            y: p.y,
            timestamp_ms: self.timestamp_ms,
        }
    }
}

/// Frame or capture resolution in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::new(640, 360)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_point_serializes_timestamp_field() {
        let p = MarkerPoint::new(1.5, 2.0, 42);
        let json = serde_json::to_value(p).expect("serialize");
        assert_eq!(json["timestamp"], 42);
        assert_eq!(json["x"], 1.5);
    }

    #[test]
    fn moved_to_keeps_timestamp() {
        let p = MarkerPoint::new(1.0, 1.0, 7).moved_to(Point2::new(3.0, 4.0));
        assert_eq!(p, MarkerPoint::new(3.0, 4.0, 7));
    }
}
