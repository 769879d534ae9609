//! JSON configuration for a tracking session.

use std::{fs, path::Path};

use lasershot_calib::TargetRect;
use lasershot_core::Resolution;
use lasershot_marker::MarkerParams;
use lasershot_shots::ShotParams;
use serde::{Deserialize, Serialize};

use crate::LaserShotError;

fn default_camera_id() -> String {
    "default".to_string()
}

fn default_poll_period_ms() -> u64 {
    50
}

/// Session configuration. Every field has a default, so partial files work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaserShotConfig {
    /// Identifier of the capture device; calibrations are bound to it.
    #[serde(default = "default_camera_id")]
    pub camera_id: String,
    /// Frames are resampled to this size before extraction.
    #[serde(default)]
    pub processing: Resolution,
    #[serde(default)]
    pub marker: MarkerParams,
    #[serde(default)]
    pub shots: ShotParams,
    /// Rectified target rectangle.
    #[serde(default)]
    pub target: TargetRect,
    #[serde(default = "default_poll_period_ms")]
    pub poll_period_ms: u64,
    /// Calibration store location for the CLI.
    #[serde(default)]
    pub store_path: Option<String>,
}

impl Default for LaserShotConfig {
    fn default() -> Self {
        Self {
            camera_id: default_camera_id(),
            processing: Resolution::default(),
            marker: MarkerParams::default(),
            shots: ShotParams::default(),
            target: TargetRect::default(),
            poll_period_ms: default_poll_period_ms(),
            store_path: None,
        }
    }
}

impl LaserShotConfig {
    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, LaserShotError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), LaserShotError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Resolve the calibration store path.
    pub fn store_path(&self) -> std::path::PathBuf {
        self.store_path
            .as_ref()
            .map(std::path::PathBuf::from)
            .unwrap_or_else(|| std::path::PathBuf::from("lasershot_store.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_uses_defaults() {
        let cfg: LaserShotConfig =
            serde_json::from_str(r#"{"camera_id": "cam-7", "shots": {"spatial_threshold": 4.0, "temporal_threshold_ms": 120}}"#)
                .expect("parse");
        assert_eq!(cfg.camera_id, "cam-7");
        assert_eq!(cfg.shots.spatial_threshold, 4.0);
        assert_eq!(cfg.poll_period_ms, 50);
        assert_eq!(cfg.processing, Resolution::new(640, 360));
        assert_eq!(cfg.target, TargetRect::new(640.0, 360.0));
    }

    #[test]
    fn config_round_trips_through_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("cfg.json");
        let cfg = LaserShotConfig {
            store_path: Some("calib.json".to_string()),
            ..LaserShotConfig::default()
        };
        cfg.write_json(&path).expect("write");
        assert_eq!(LaserShotConfig::load_json(&path).expect("load"), cfg);
    }
}
