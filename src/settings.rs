use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::Duration,
};

use crate::error::{EngineError, EngineResult};
use crate::retention::RetentionConfig;
use crate::segmentation::SegmentationConfig;

/// Externally configured thresholds, read once per pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TripSettings {
    pub trip_separator_secs: i64,
    pub min_entries_per_trip: usize,
    pub trip_count_retention_limit: usize,
    pub gps_trip_count_retention_limit: usize,
    pub trip_reprocessing_allowed: bool,
    pub geocode_timeout_ms: u64,
}

impl Default for TripSettings {
    fn default() -> Self {
        Self {
            trip_separator_secs: 300,
            min_entries_per_trip: 5,
            trip_count_retention_limit: 100,
            gps_trip_count_retention_limit: 20,
            trip_reprocessing_allowed: false,
            geocode_timeout_ms: 10_000,
        }
    }
}

impl TripSettings {
    pub fn validate(&self) -> EngineResult<()> {
        self.segmentation_config(false)?;
        if self.geocode_timeout_ms == 0 {
            return Err(EngineError::Configuration(
                "geocode timeout must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// Config for one segmentation pass. `force` asks for re-segmentation of
    /// already processed samples and needs `trip_reprocessing_allowed`.
    pub fn segmentation_config(&self, force: bool) -> EngineResult<SegmentationConfig> {
        if force && !self.trip_reprocessing_allowed {
            return Err(EngineError::Configuration(
                "trip reprocessing is disabled in settings".into(),
            ));
        }
        let config = SegmentationConfig {
            trip_separator_secs: self.trip_separator_secs,
            min_entries_per_trip: self.min_entries_per_trip,
            force_reprocessing: force,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn retention_config(&self) -> RetentionConfig {
        RetentionConfig {
            trip_count_limit: self.trip_count_retention_limit,
            journal_trip_count_limit: self.gps_trip_count_retention_limit,
            trip_separator_secs: self.trip_separator_secs,
        }
    }

    pub fn collaborator_timeout(&self) -> Duration {
        Duration::from_millis(self.geocode_timeout_ms)
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<TripSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!(
                    "Ignoring malformed settings in {}: {err}; using defaults",
                    path.display()
                );
                TripSettings::default()
            })
        } else {
            TripSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn trip_settings(&self) -> TripSettings {
        self.read().clone()
    }

    /// Validate and persist new settings. Invalid settings are not stored.
    pub fn update_trip_settings(&self, settings: TripSettings) -> EngineResult<()> {
        settings.validate()?;
        let mut guard = self.write();
        self.persist(&settings)?;
        *guard = settings;
        Ok(())
    }

    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read settings from {}", self.path.display()))?;
        let data: TripSettings = serde_json::from_str(&contents)
            .with_context(|| format!("Malformed settings in {}", self.path.display()))?;
        *self.write() = data;
        Ok(())
    }

    fn persist(&self, data: &TripSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    fn read(&self) -> RwLockReadGuard<'_, TripSettings> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, TripSettings> {
        self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json")).unwrap();
        assert_eq!(store.trip_settings(), TripSettings::default());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "tripSeparatorSecs": 120 }"#).unwrap();

        let settings = SettingsStore::new(path).unwrap().trip_settings();
        assert_eq!(settings.trip_separator_secs, 120);
        assert_eq!(settings.min_entries_per_trip, 5);
    }

    #[test]
    fn update_persists_and_reloads() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        let store = SettingsStore::new(path.clone()).unwrap();

        let updated = TripSettings {
            min_entries_per_trip: 3,
            trip_reprocessing_allowed: true,
            ..Default::default()
        };
        store.update_trip_settings(updated.clone()).unwrap();

        let reopened = SettingsStore::new(path).unwrap();
        assert_eq!(reopened.trip_settings(), updated);
    }

    #[test]
    fn invalid_update_is_rejected_and_not_stored() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        let store = SettingsStore::new(path.clone()).unwrap();

        let err = store
            .update_trip_settings(TripSettings {
                trip_separator_secs: -5,
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
        assert!(!path.exists());
        assert_eq!(store.trip_settings().trip_separator_secs, 300);
    }

    #[test]
    fn forced_pass_needs_permission() {
        let settings = TripSettings::default();
        assert!(matches!(
            settings.segmentation_config(true),
            Err(EngineError::Configuration(_))
        ));

        let allowed = TripSettings {
            trip_reprocessing_allowed: true,
            ..Default::default()
        };
        assert!(allowed.segmentation_config(true).unwrap().force_reprocessing);
    }

    #[test]
    fn retention_config_carries_limits() {
        let settings = TripSettings {
            trip_count_retention_limit: 7,
            gps_trip_count_retention_limit: 2,
            trip_separator_secs: 60,
            ..Default::default()
        };
        let config = settings.retention_config();
        assert_eq!(config.trip_count_limit, 7);
        assert_eq!(config.journal_trip_count_limit, 2);
        assert_eq!(config.trip_separator_secs, 60);
    }

    #[test]
    fn zero_timeout_is_invalid() {
        let settings = TripSettings {
            geocode_timeout_ms: 0,
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }
}
