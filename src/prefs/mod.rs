//! Audio preference persistence.
//!
//! One JSON record `{muted, musicVolume, sfxVolume}` is stored under
//! [`PREFERENCE_KEY`] in a small key/value backend. Every failure is absorbed
//! here: loading falls back to defaults and saving only logs.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Key the audio record lives under
pub const PREFERENCE_KEY: &str = "frenzytone.audio";

#[derive(Debug, Error)]
pub enum PreferenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("storage unavailable")]
    Unavailable,
}

/// Persisted audio preferences
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Preferences {
    pub muted: bool,
    pub music_volume: f32,
    pub sfx_volume: f32,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            muted: false,
            music_volume: 0.5,
            sfx_volume: 0.7,
        }
    }
}

impl Preferences {
    /// Clamp volumes into `[0, 1]`, replacing non-finite values with defaults
    pub fn sanitized(self) -> Self {
        let defaults = Self::default();
        let fix = |v: f32, fallback: f32| {
            if v.is_finite() {
                v.clamp(0.0, 1.0)
            } else {
                fallback
            }
        };
        Self {
            muted: self.muted,
            music_volume: fix(self.music_volume, defaults.music_volume),
            sfx_volume: fix(self.sfx_volume, defaults.sfx_volume),
        }
    }
}

/// String key/value storage
pub trait PreferenceBackend: Send {
    fn read(&self, key: &str) -> Result<Option<String>, PreferenceError>;
    fn write(&mut self, key: &str, value: String) -> Result<(), PreferenceError>;
}

/// JSON object file mapping keys to string values
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `preferences.json` inside `dir`
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join("preferences.json"))
    }

    /// ~/.frenzytone/preferences.json
    pub fn default_location() -> Self {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        Self::in_dir(&PathBuf::from(home).join(".frenzytone"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<BTreeMap<String, String>, PreferenceError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let json = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

impl PreferenceBackend for FileBackend {
    fn read(&self, key: &str) -> Result<Option<String>, PreferenceError> {
        Ok(self.read_map()?.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: String) -> Result<(), PreferenceError> {
        // A corrupt file is replaced rather than blocking every later save
        let mut map = self.read_map().unwrap_or_default();
        map.insert(key.to_string(), value);

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(&map)?)?;
        Ok(())
    }
}

/// Process-local storage. Clones share the same map.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    entries: Arc<Mutex<BTreeMap<String, String>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceBackend for MemoryBackend {
    fn read(&self, key: &str) -> Result<Option<String>, PreferenceError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn write(&mut self, key: &str, value: String) -> Result<(), PreferenceError> {
        self.entries.lock().insert(key.to_string(), value);
        Ok(())
    }
}

/// Storage that is never available
pub struct UnavailableBackend;

impl PreferenceBackend for UnavailableBackend {
    fn read(&self, _key: &str) -> Result<Option<String>, PreferenceError> {
        Err(PreferenceError::Unavailable)
    }

    fn write(&mut self, _key: &str, _value: String) -> Result<(), PreferenceError> {
        Err(PreferenceError::Unavailable)
    }
}

/// Reads and writes the audio record, never failing outward
pub struct PreferenceStore {
    backend: Box<dyn PreferenceBackend>,
}

impl PreferenceStore {
    pub fn new(backend: impl PreferenceBackend + 'static) -> Self {
        Self {
            backend: Box::new(backend),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryBackend::new())
    }

    pub fn unavailable() -> Self {
        Self::new(UnavailableBackend)
    }

    /// Stored preferences, or defaults when absent or unreadable
    pub fn load(&self) -> Preferences {
        match self.try_load() {
            Ok(Some(prefs)) => prefs.sanitized(),
            Ok(None) => Preferences::default(),
            Err(e) => {
                tracing::warn!("Could not load audio preferences, using defaults: {}", e);
                Preferences::default()
            }
        }
    }

    fn try_load(&self) -> Result<Option<Preferences>, PreferenceError> {
        match self.backend.read(PREFERENCE_KEY)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Persist `prefs`. Returns false if the write failed.
    pub fn save(&mut self, prefs: &Preferences) -> bool {
        let result = serde_json::to_string(prefs)
            .map_err(PreferenceError::from)
            .and_then(|json| self.backend.write(PREFERENCE_KEY, json));
        match result {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Could not save audio preferences: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_record_gives_defaults() {
        let store = PreferenceStore::in_memory();
        assert_eq!(store.load(), Preferences::default());
    }

    #[test]
    fn memory_round_trip() {
        let backend = MemoryBackend::new();
        let mut store = PreferenceStore::new(backend.clone());
        let prefs = Preferences {
            muted: true,
            music_volume: 0.3,
            sfx_volume: 0.9,
        };
        assert!(store.save(&prefs));

        let reloaded = PreferenceStore::new(backend).load();
        assert_eq!(reloaded, prefs);
    }

    #[test]
    fn record_uses_camel_case_keys() {
        let backend = MemoryBackend::new();
        let mut store = PreferenceStore::new(backend.clone());
        store.save(&Preferences::default());
        let json = backend
            .read(PREFERENCE_KEY)
            .expect("read")
            .expect("record present");
        assert!(json.contains("musicVolume"));
        assert!(json.contains("sfxVolume"));
    }

    #[test]
    fn corrupt_record_falls_back() {
        let mut backend = MemoryBackend::new();
        backend
            .write(PREFERENCE_KEY, "{musicVolume: nope".to_string())
            .expect("write");
        let store = PreferenceStore::new(backend);
        assert_eq!(store.load(), Preferences::default());
    }

    #[test]
    fn partial_and_out_of_range_records_are_sanitized() {
        let mut backend = MemoryBackend::new();
        backend
            .write(PREFERENCE_KEY, r#"{"musicVolume": 4.0}"#.to_string())
            .expect("write");
        let prefs = PreferenceStore::new(backend).load();
        assert_eq!(prefs.music_volume, 1.0);
        assert_eq!(prefs.sfx_volume, 0.7);
        assert!(!prefs.muted);
    }

    #[test]
    fn unavailable_storage_is_absorbed() {
        let mut store = PreferenceStore::unavailable();
        assert_eq!(store.load(), Preferences::default());
        assert!(!store.save(&Preferences::default()));
    }

    #[test]
    fn file_round_trip_creates_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        let nested = dir.path().join("a").join("b");
        let mut store = PreferenceStore::new(FileBackend::in_dir(&nested));
        let prefs = Preferences {
            muted: false,
            music_volume: 0.3,
            sfx_volume: 0.2,
        };
        assert!(store.save(&prefs));

        let reloaded = PreferenceStore::new(FileBackend::in_dir(&nested)).load();
        assert!((reloaded.music_volume - 0.3).abs() < 1e-6);
        assert!((reloaded.sfx_volume - 0.2).abs() < 1e-6);
    }

    #[test]
    fn corrupt_file_is_replaced_on_save() {
        let dir = tempfile::tempdir().expect("tempdir");
        let backend = FileBackend::in_dir(dir.path());
        fs::write(backend.path(), "not json at all").expect("write");

        let mut store = PreferenceStore::new(FileBackend::in_dir(dir.path()));
        assert_eq!(store.load(), Preferences::default());
        assert!(store.save(&Preferences::default()));
        assert_eq!(store.load(), Preferences::default());
    }

    #[test]
    fn other_keys_survive_a_save() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut backend = FileBackend::in_dir(dir.path());
        backend
            .write("someone.else", "kept".to_string())
            .expect("write");

        let mut store = PreferenceStore::new(FileBackend::in_dir(dir.path()));
        store.save(&Preferences::default());
        assert_eq!(
            backend.read("someone.else").expect("read"),
            Some("kept".to_string())
        );
    }
}
