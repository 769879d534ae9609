use chrono::{DateTime, Duration, Utc};
use lasershot_core::Resolution;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Stored calibrations older than this are ignored.
pub const MAX_CALIBRATION_AGE_DAYS: i64 = 30;

/// Corner position in image pixels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CornerPoint {
    pub x: f64,
    pub y: f64,
}

impl From<Point2<f64>> for CornerPoint {
    fn from(p: Point2<f64>) -> Self {
        Self { x: p.x, y: p.y }
    }
}

impl From<CornerPoint> for Point2<f64> {
    fn from(c: CornerPoint) -> Self {
        Point2::new(c.x, c.y)
    }
}

/// Result of one completed four-corner calibration.
///
/// A later calibration replaces the record as a whole.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationRecord {
    pub camera_id: String,
    pub resolution: Resolution,
    #[serde(with = "iso8601_millis")]
    pub timestamp: DateTime<Utc>,
    pub corners: [CornerPoint; 4],
}

impl CalibrationRecord {
    pub fn new(
        camera_id: impl Into<String>,
        resolution: Resolution,
        timestamp: DateTime<Utc>,
        corners: [Point2<f64>; 4],
    ) -> Self {
        Self {
            camera_id: camera_id.into(),
            resolution,
            timestamp,
            corners: corners.map(CornerPoint::from),
        }
    }

    /// Corners in canonical slot order.
    pub fn corner_points(&self) -> [Point2<f64>; 4] {
        self.corners.map(Point2::from)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

/// Whether `record` can be used for the current camera, as of now.
pub fn is_valid(
    record: Option<&CalibrationRecord>,
    current_resolution: Resolution,
    current_camera_id: &str,
) -> bool {
    is_valid_at(record, current_resolution, current_camera_id, Utc::now())
}

/// Whether `record` can be used for the current camera at time `now`.
///
/// Rejects a missing record, a different camera, a different resolution, and
/// a record more than [`MAX_CALIBRATION_AGE_DAYS`] of elapsed time old.
pub fn is_valid_at(
    record: Option<&CalibrationRecord>,
    current_resolution: Resolution,
    current_camera_id: &str,
    now: DateTime<Utc>,
) -> bool {
    let Some(record) = record else {
        return false;
    };
    if record.camera_id != current_camera_id {
        log::info!(
            "calibration camera mismatch: stored {:?}, current {current_camera_id:?}",
            record.camera_id
        );
        return false;
    }
    if record.resolution != current_resolution {
        log::info!(
            "calibration resolution mismatch: stored {}x{}, current {}x{}",
            record.resolution.width,
            record.resolution.height,
            current_resolution.width,
            current_resolution.height
        );
        return false;
    }
    let age = now.signed_duration_since(record.timestamp);
    if age > Duration::days(MAX_CALIBRATION_AGE_DAYS) {
        log::info!("calibration expired ({} days old)", age.num_days());
        return false;
    }
    true
}

mod iso8601_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record_at(ts: DateTime<Utc>) -> CalibrationRecord {
        CalibrationRecord::new(
            "cam-1",
            Resolution::new(640, 360),
            ts,
            [
                Point2::new(0.0, 0.0),
                Point2::new(640.0, 0.0),
                Point2::new(640.0, 360.0),
                Point2::new(0.0, 360.0),
            ],
        )
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).single().expect("valid date")
    }

    #[test]
    fn missing_record_is_invalid() {
        assert!(!is_valid_at(None, Resolution::new(640, 360), "cam-1", now()));
    }

    #[test]
    fn age_boundary() {
        let res = Resolution::new(640, 360);
        let just_over = now() - Duration::days(30) - Duration::seconds(1);
        assert!(!is_valid_at(Some(&record_at(just_over)), res, "cam-1", now()));

        let just_under = now() - Duration::days(29) - Duration::hours(23);
        assert!(is_valid_at(Some(&record_at(just_under)), res, "cam-1", now()));

        let exactly = now() - Duration::days(30);
        assert!(is_valid_at(Some(&record_at(exactly)), res, "cam-1", now()));
    }

    #[test]
    fn age_is_elapsed_time_not_calendar_days() {
        // 30 calendar days apart, but almost 31 days of elapsed time
        let stored = Utc.with_ymd_and_hms(2026, 1, 1, 0, 30, 0).single().expect("date");
        let later = Utc.with_ymd_and_hms(2026, 1, 31, 23, 30, 0).single().expect("date");
        let res = Resolution::new(640, 360);
        assert!(!is_valid_at(Some(&record_at(stored)), res, "cam-1", later));
    }

    #[test]
    fn camera_and_resolution_must_match() {
        let rec = record_at(now());
        assert!(!is_valid_at(Some(&rec), Resolution::new(640, 360), "cam-2", now()));
        assert!(!is_valid_at(Some(&rec), Resolution::new(1280, 720), "cam-1", now()));
        assert!(is_valid_at(Some(&rec), Resolution::new(640, 360), "cam-1", now()));
    }

    #[test]
    fn json_uses_wire_field_names() {
        let rec = record_at(now());
        let v: serde_json::Value = serde_json::from_str(&rec.to_json().expect("json")).expect("parse");
        assert_eq!(v["cameraId"], "cam-1");
        assert_eq!(v["resolution"]["width"], 640);
        assert_eq!(v["timestamp"], "2026-03-01T12:00:00.000Z");
        assert_eq!(v["corners"].as_array().map(Vec::len), Some(4));
        assert_eq!(v["corners"][2]["x"], 640.0);

        let back = CalibrationRecord::from_json(&rec.to_json().expect("json")).expect("decode");
        assert_eq!(back, rec);
    }

    #[test]
    fn record_with_three_corners_does_not_decode() {
        let raw = r#"{"cameraId":"c","resolution":{"width":1,"height":1},
            "timestamp":"2026-03-01T12:00:00.000Z",
            "corners":[{"x":0,"y":0},{"x":1,"y":0},{"x":1,"y":1}]}"#;
        assert!(CalibrationRecord::from_json(raw).is_err());
    }
}
