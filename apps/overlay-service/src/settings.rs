//! Persisted user settings

use parking_lot::RwLock;
use shared_protocol::{AppSettings, ProtocolError};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

const APP_DIR: &str = "snapfloat";
const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to write settings: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// Settings cache backed by an optional JSON file
pub struct SettingsStore {
    path: Option<PathBuf>,
    current: RwLock<AppSettings>,
}

impl SettingsStore {
    /// `<config dir>/snapfloat/settings.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(SETTINGS_FILE))
    }

    /// Load from `path`. A missing or corrupt file yields the defaults.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let settings = Self::read(&path);
        Self {
            path: Some(path),
            current: RwLock::new(settings),
        }
    }

    /// Never touches disk
    pub fn in_memory(settings: AppSettings) -> Self {
        Self {
            path: None,
            current: RwLock::new(settings.normalized()),
        }
    }

    fn read(path: &Path) -> AppSettings {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                debug!("No settings at {}: {}", path.display(), e);
                return AppSettings::default();
            }
        };
        AppSettings::from_json(&text).unwrap_or_else(|e| {
            warn!("Ignoring corrupt settings file {}: {}", path.display(), e);
            AppSettings::default()
        })
    }

    pub fn get(&self) -> AppSettings {
        self.current.read().clone()
    }

    /// Apply `change`, clamp, and write through to disk
    pub fn update(&self, change: impl FnOnce(&mut AppSettings)) -> Result<AppSettings, SettingsError> {
        let settings = {
            let mut current = self.current.write();
            change(&mut current);
            *current = current.clone().normalized();
            current.clone()
        };

        if let Some(path) = &self.path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, settings.to_json()?)?;
        }
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_protocol::CaptureMethod;

    fn scratch_file() -> PathBuf {
        std::env::temp_dir()
            .join(format!("snapfloat-settings-{}", uuid::Uuid::new_v4()))
            .join(SETTINGS_FILE)
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let store = SettingsStore::open(scratch_file());
        assert_eq!(store.get(), AppSettings::default());
    }

    #[test]
    fn test_update_persists_and_clamps() {
        let path = scratch_file();
        let store = SettingsStore::open(&path);
        store
            .update(|s| {
                s.timer_duration = 45;
                s.sound_enabled = false;
                s.capture_method = CaptureMethod::Onscreen;
            })
            .unwrap();

        let reloaded = SettingsStore::open(&path).get();
        assert_eq!(reloaded.timer_duration, 20);
        assert!(!reloaded.sound_enabled);
        assert_eq!(reloaded.capture_method, CaptureMethod::Onscreen);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_corrupt_file_gives_defaults() {
        let path = scratch_file();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{ not json").unwrap();

        assert_eq!(SettingsStore::open(&path).get(), AppSettings::default());
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
