//! Application configuration

use crate::format::CodecTable;
use crate::utils::error::LoaderError;
use crate::utils::platform;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_TICK_INTERVAL_MS: u64 = 500;

/// Application settings, persisted as JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Last used download location
    pub download_location: PathBuf,

    /// Scheduler tick interval in milliseconds
    pub tick_interval_ms: u64,

    /// Timeout for the playlist/single probe, in seconds
    pub probe_timeout_secs: u64,

    /// Explicit yt-dlp executable; searched for when unset
    pub ytdlp_path: Option<PathBuf>,

    /// Explicit ffmpeg location handed to the engine
    pub ffmpeg_location: Option<PathBuf>,

    /// Extra codec labels layered over the built-in table
    pub codec_overrides: HashMap<String, String>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            download_location: platform::default_download_dir(),
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            probe_timeout_secs: 120,
            ytdlp_path: None,
            ffmpeg_location: None,
            codec_overrides: HashMap::new(),
        }
    }
}

impl AppSettings {
    /// Load from the default location (see [`platform::settings_path`])
    pub fn load() -> Result<Self, LoaderError> {
        Self::load_from(&platform::settings_path())
    }

    /// Load from `path`; a missing file yields the defaults
    pub fn load_from(path: &Path) -> Result<Self, LoaderError> {
        if !path.exists() {
            debug!("No settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let settings: Self = serde_json::from_str(&content)
            .map_err(|e| LoaderError::Config(format!("{}: {}", path.display(), e)))?;
        settings.validated()
    }

    pub fn save(&self) -> Result<(), LoaderError> {
        self.save_to(&platform::settings_path())
    }

    /// Write to `path`, creating parent directories as needed
    pub fn save_to(&self, path: &Path) -> Result<(), LoaderError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        info!("Saved settings to {}", path.display());
        Ok(())
    }

    /// Enforce sane minimums
    pub fn validated(mut self) -> Result<Self, LoaderError> {
        if self.tick_interval_ms == 0 {
            warn!(
                "tick_interval_ms of 0 is not allowed, using {}",
                DEFAULT_TICK_INTERVAL_MS
            );
            self.tick_interval_ms = DEFAULT_TICK_INTERVAL_MS;
        }
        if self.probe_timeout_secs == 0 {
            return Err(LoaderError::Config(
                "probe_timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(self)
    }

    /// Never zero: a zero interval would make the scheduler ticker panic
    pub fn tick_interval(&self) -> Duration {
        match self.tick_interval_ms {
            0 => Duration::from_millis(DEFAULT_TICK_INTERVAL_MS),
            ms => Duration::from_millis(ms),
        }
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn codec_table(&self) -> CodecTable {
        CodecTable::with_overrides(&self.codec_overrides)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = AppSettings::default();
        assert_eq!(config.tick_interval(), Duration::from_millis(500));
        assert_eq!(config.probe_timeout(), Duration::from_secs(120));
        assert!(config.download_location.is_absolute());
    }

    #[test]
    fn settings_round_trip_on_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let mut settings = AppSettings::default();
        settings.download_location = dir.path().join("media");
        settings.codec_overrides.insert("mp4v".into(), "MPEG-4 Visual".into());
        settings.save_to(&path).unwrap();

        let loaded = AppSettings::load_from(&path).unwrap();
        assert_eq!(loaded, settings);
        assert_eq!(loaded.codec_table().label("mp4v.20.3"), "MPEG-4 Visual");
    }

    #[test]
    fn missing_file_gives_defaults_and_partial_files_fill_in() {
        let dir = tempdir().unwrap();
        let missing = AppSettings::load_from(&dir.path().join("none.json")).unwrap();
        assert_eq!(missing.tick_interval_ms, 500);

        let path = dir.path().join("partial.json");
        std::fs::write(&path, r#"{"tick_interval_ms": 0, "probe_timeout_secs": 30}"#).unwrap();
        let partial = AppSettings::load_from(&path).unwrap();
        assert_eq!(partial.tick_interval_ms, 500);
        assert_eq!(partial.probe_timeout_secs, 30);
    }

    #[test]
    fn unvalidated_zero_tick_uses_the_default() {
        let settings = AppSettings {
            tick_interval_ms: 0,
            ..AppSettings::default()
        };
        assert_eq!(settings.tick_interval(), Duration::from_millis(500));
    }

    #[test]
    fn invalid_files_are_config_errors() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            AppSettings::load_from(&path),
            Err(LoaderError::Config(_))
        ));

        std::fs::write(&path, r#"{"probe_timeout_secs": 0}"#).unwrap();
        assert!(matches!(
            AppSettings::load_from(&path),
            Err(LoaderError::Config(_))
        ));
    }
}
