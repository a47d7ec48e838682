use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{
    fs,
    path::PathBuf,
    sync::{PoisonError, RwLock},
    time::Duration,
};

use crate::camera::types::Dimensions;
use crate::camera::DeviceSelectionPolicy;

pub const ARCHIVE_URL_ENV: &str = "MAGIC_MIRROR_ARCHIVE_URL";
pub const DEBUG_ENV: &str = "MAGIC_MIRROR_DEBUG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CameraSettings {
    pub selection: DeviceSelectionPolicy,
    pub ideal_width: u32,
    pub ideal_height: u32,
    /// Upper bound on the wait for a forced composite before a capture.
    pub capture_grace_ms: u64,
    pub capability_probe_retries: u32,
    pub resolution_scaling: u32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            selection: DeviceSelectionPolicy::default(),
            ideal_width: 640,
            ideal_height: 480,
            capture_grace_ms: 2000,
            capability_probe_retries: 0,
            resolution_scaling: 2,
        }
    }
}

impl CameraSettings {
    pub fn ideal(&self) -> Dimensions {
        Dimensions::new(self.ideal_width, self.ideal_height)
    }

    pub fn capture_grace(&self) -> Duration {
        Duration::from_millis(self.capture_grace_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ArchiveSettings {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ArchiveSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".into(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ShareSettings {
    pub app_url: String,
}

/// The kiosk's config record. Fields it does not know about are kept as-is so
/// the UI can store its own keys alongside.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KioskConfig {
    pub version: u32,
    pub camera: CameraSettings,
    pub archive: ArchiveSettings,
    pub share: ShareSettings,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for KioskConfig {
    fn default() -> Self {
        Self {
            version: 1,
            camera: CameraSettings::default(),
            archive: ArchiveSettings::default(),
            share: ShareSettings::default(),
            extra: Map::new(),
        }
    }
}

impl KioskConfig {
    /// Reads a stored record without rejecting it: a known key with the wrong
    /// shape falls back to its default, unknown keys are carried in `extra`.
    pub fn from_stored(value: &Value) -> Self {
        let Some(object) = value.as_object() else {
            log::warn!("Config record is not an object, using defaults");
            return Self::default();
        };

        let mut config = Self::default();
        for (key, field) in object {
            match key.as_str() {
                "version" => config.version = lenient(key, field, config.version),
                "camera" => config.camera = lenient(key, field, CameraSettings::default()),
                "archive" => config.archive = lenient(key, field, ArchiveSettings::default()),
                "share" => config.share = lenient(key, field, ShareSettings::default()),
                _ => {
                    config.extra.insert(key.clone(), field.clone());
                }
            }
        }
        config
    }

    /// Applies environment overrides on top of the stored values.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(ARCHIVE_URL_ENV) {
            if !url.trim().is_empty() {
                self.archive.base_url = url;
            }
        }
        self
    }
}

fn lenient<T: DeserializeOwned>(key: &str, field: &Value, fallback: T) -> T {
    serde_json::from_value(field.clone()).unwrap_or_else(|err| {
        log::warn!("Ignoring config key {key}: {err}");
        fallback
    })
}

pub fn debug_requested() -> bool {
    std::env::var(DEBUG_ENV).is_ok_and(|v| v == "1")
}

/// The config record as the UI last wrote it. Reads go through
/// [`KioskConfig::from_stored`], so a record the app cannot fully use is
/// still kept verbatim.
pub struct ConfigStore {
    path: PathBuf,
    data: RwLock<Value>,
}

impl ConfigStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                log::warn!("Invalid config at {}, using defaults: {err}", path.display());
                Value::Null
            })
        } else {
            Value::Null
        };

        let data = if data.is_object() {
            data
        } else {
            serde_json::to_value(KioskConfig::default())?
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    /// The stored record, read leniently.
    pub fn stored(&self) -> KioskConfig {
        KioskConfig::from_stored(&self.get_json())
    }

    /// The record the app runs with: stored values plus environment overrides.
    pub fn effective(&self) -> KioskConfig {
        self.stored().with_env_overrides()
    }

    /// The record exactly as stored.
    pub fn get_json(&self) -> Value {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replaces the whole record, last writer wins. Any JSON object is kept
    /// as given.
    pub fn set_json(&self, value: Value) -> Result<KioskConfig> {
        if !value.is_object() {
            anyhow::bail!("Config record must be a JSON object");
        }
        let config = KioskConfig::from_stored(&value);
        self.replace(value)?;
        Ok(config)
    }

    fn replace(&self, value: Value) -> Result<()> {
        let mut guard = self.data.write().unwrap_or_else(PoisonError::into_inner);
        self.persist(&value)?;
        *guard = value;
        Ok(())
    }

    fn persist(&self, data: &Value) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write config to {}", self.path.display()))
    }
}
