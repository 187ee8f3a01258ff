//! Persisted user settings behind a small key/value store.

use crate::geo::GeoPreference;
use crate::sequencer::PlayMode;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;
use tracing::{debug, warn};

pub const PLAY_MODE: &str = "play_mode";
pub const IMAGE_DISPLAY_SECS: &str = "image_display_secs";
pub const TRANSITION_SECS: &str = "transition_secs";
pub const SHOW_LOCATION: &str = "show_location";
pub const GEOCODER_PREFERRED: &str = "geocoder.preferred";
pub const GEOCODER_FALLBACK: &str = "geocoder.fallback";

const DEFAULT_IMAGE_DISPLAY_SECS: u64 = 5;
const DEFAULT_TRANSITION_SECS: u64 = 1;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Settings file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Settings file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// String key/value persistence owned by the host application.
pub trait SettingsStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), SettingsError>;
    fn remove(&self, key: &str) -> Result<(), SettingsError>;
}

#[derive(Debug, Default)]
pub struct MemorySettings {
    values: RwLock<HashMap<String, String>>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemorySettings {
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SettingsError> {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), SettingsError> {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}

/// A flat JSON object on disk, rewritten on every change.
#[derive(Debug)]
pub struct JsonFileSettings {
    path: PathBuf,
    values: RwLock<BTreeMap<String, String>>,
}

impl JsonFileSettings {
    /// Loads `path`, starting empty when the file does not exist yet.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref().to_path_buf();
        let values = match std::fs::read_to_string(&path) {
            Ok(contents) if contents.trim().is_empty() => BTreeMap::new(),
            Ok(contents) => serde_json::from_str(&contents)?,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                debug!("No settings file at {}, starting empty", path.display());
                BTreeMap::new()
            }
            Err(error) => return Err(error.into()),
        };
        Ok(Self {
            path,
            values: RwLock::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, values: &BTreeMap<String, String>) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(values)?)?;
        Ok(())
    }
}

impl SettingsStore for JsonFileSettings {
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SettingsError> {
        let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.to_string(), value.to_string());
        self.persist(&values)
    }

    fn remove(&self, key: &str) -> Result<(), SettingsError> {
        let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
        if values.remove(key).is_some() {
            self.persist(&values)?;
        }
        Ok(())
    }
}

/// Typed view over a [`SettingsStore`]. Missing or unparseable values read as defaults.
#[derive(Clone)]
pub struct Settings {
    store: Arc<dyn SettingsStore>,
}

impl Settings {
    pub fn new(store: Arc<dyn SettingsStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemorySettings::new()))
    }

    fn parsed<T: FromStr>(&self, key: &str) -> Option<T> {
        let raw = self.store.get(key)?;
        let parsed = raw.trim().parse().ok();
        if parsed.is_none() {
            warn!("Ignoring invalid value {:?} for setting {}", raw, key);
        }
        parsed
    }

    pub fn play_mode(&self) -> PlayMode {
        self.parsed(PLAY_MODE).unwrap_or_default()
    }

    pub fn set_play_mode(&self, mode: PlayMode) -> Result<(), SettingsError> {
        self.store.set(PLAY_MODE, mode.as_str())
    }

    pub fn image_display_secs(&self) -> u64 {
        self.parsed(IMAGE_DISPLAY_SECS)
            .filter(|&secs| secs > 0)
            .unwrap_or(DEFAULT_IMAGE_DISPLAY_SECS)
    }

    pub fn set_image_display_secs(&self, secs: u64) -> Result<(), SettingsError> {
        self.store.set(IMAGE_DISPLAY_SECS, &secs.to_string())
    }

    pub fn transition_secs(&self) -> u64 {
        self.parsed(TRANSITION_SECS)
            .unwrap_or(DEFAULT_TRANSITION_SECS)
    }

    pub fn set_transition_secs(&self, secs: u64) -> Result<(), SettingsError> {
        self.store.set(TRANSITION_SECS, &secs.to_string())
    }

    pub fn show_location(&self) -> bool {
        self.parsed(SHOW_LOCATION).unwrap_or(true)
    }

    pub fn set_show_location(&self, show: bool) -> Result<(), SettingsError> {
        self.store.set(SHOW_LOCATION, &show.to_string())
    }

    pub fn geocoder_preference(&self) -> GeoPreference {
        GeoPreference {
            provider: self
                .store
                .get(GEOCODER_PREFERRED)
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty()),
            fallback_enabled: self.parsed(GEOCODER_FALLBACK).unwrap_or(true),
        }
    }

    pub fn set_geocoder_preference(&self, preference: &GeoPreference) -> Result<(), SettingsError> {
        match &preference.provider {
            Some(name) => self.store.set(GEOCODER_PREFERRED, name)?,
            None => self.store.remove(GEOCODER_PREFERRED)?,
        }
        self.store
            .set(GEOCODER_FALLBACK, &preference.fallback_enabled.to_string())
    }
}
