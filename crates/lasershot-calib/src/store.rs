//! Calibration persistence on top of a string key-value store.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::{CalibrationRecord, StoreError};

/// Key under which the calibration record is stored.
pub const CALIBRATION_KEY: &str = "laser-calibration";

/// Minimal string key-value store.
///
/// `set` must replace the previous value as a whole.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError>;
}

#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }
}

/// All keys in one JSON object on disk.
///
/// Writes go to a temporary file in the same directory which is then renamed
/// over the target, so readers see either the old or the new content.
#[derive(Clone, Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let json = serde_json::to_string_pretty(entries)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError> {
        let mut entries = self.read_all()?;
        entries.insert(key.to_string(), value);
        self.write_all(&entries)
    }
}

/// Reads and writes the calibration record through a [`KeyValueStore`].
#[derive(Clone, Debug)]
pub struct CalibrationStore<S> {
    store: S,
    key: String,
}

impl<S: KeyValueStore> CalibrationStore<S> {
    pub fn new(store: S) -> Self {
        Self::with_key(store, CALIBRATION_KEY)
    }

    pub fn with_key(store: S, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// Replace any stored record with `record`.
    pub fn save(&mut self, record: &CalibrationRecord) -> Result<(), StoreError> {
        let json = record.to_json()?;
        self.store.set(&self.key, json)?;
        log::info!(
            "saved calibration for camera {:?} ({}x{})",
            record.camera_id,
            record.resolution.width,
            record.resolution.height
        );
        Ok(())
    }

    /// Load the stored record. An unreadable record counts as absent.
    pub fn load(&self) -> Result<Option<CalibrationRecord>, StoreError> {
        let Some(raw) = self.store.get(&self.key)? else {
            return Ok(None);
        };
        match CalibrationRecord::from_json(&raw) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                log::warn!("ignoring malformed calibration record: {e}");
                Ok(None)
            }
        }
    }

    pub fn inner(&self) -> &S {
        &self.store
    }

    pub fn into_inner(self) -> S {
        self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use lasershot_core::Resolution;
    use nalgebra::Point2;

    fn record(camera: &str) -> CalibrationRecord {
        CalibrationRecord::new(
            camera,
            Resolution::new(640, 360),
            Utc.with_ymd_and_hms(2026, 5, 4, 10, 0, 0).single().expect("date"),
            [
                Point2::new(1.0, 2.0),
                Point2::new(600.0, 3.0),
                Point2::new(610.0, 350.0),
                Point2::new(4.0, 340.0),
            ],
        )
    }

    #[test]
    fn empty_store_loads_nothing() {
        let store = CalibrationStore::new(MemoryStore::new());
        assert!(store.load().expect("load").is_none());
    }

    #[test]
    fn save_replaces_previous_record() {
        let mut store = CalibrationStore::new(MemoryStore::new());
        store.save(&record("a")).expect("save");
        store.save(&record("b")).expect("save");
        let loaded = store.load().expect("load").expect("record");
        assert_eq!(loaded.camera_id, "b");
    }

    #[test]
    fn malformed_record_is_treated_as_absent() {
        let mut kv = MemoryStore::new();
        kv.set(CALIBRATION_KEY, "{not json".to_string()).expect("set");
        let store = CalibrationStore::new(kv);
        assert!(store.load().expect("load").is_none());
    }
}
