//! Platform-specific locations for tubequeue
//!
//! - Settings: `<config dir>/tubequeue/settings.json`
//! - Downloads: the platform Downloads folder, never a relative path

use std::path::{Path, PathBuf};
use tracing::warn;

const APP_DIR: &str = "tubequeue";

/// Returns the configuration directory
/// - macOS: ~/Library/Application Support/tubequeue
/// - Windows: %APPDATA%\tubequeue
/// - Linux: ~/.config/tubequeue
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// Location of the persisted [`AppSettings`](crate::utils::AppSettings)
pub fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

/// Returns the default download directory (`~/Downloads`)
pub fn default_download_dir() -> PathBuf {
    dirs::download_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Downloads")))
        .unwrap_or_else(|| {
            warn!("Could not determine Downloads directory, using the temp dir");
            std::env::temp_dir()
        })
}

/// Name of the yt-dlp binary on this platform
pub fn ytdlp_binary_name() -> &'static str {
    if cfg!(target_os = "windows") {
        "yt-dlp.exe"
    } else {
        "yt-dlp"
    }
}

/// Check if a file is executable
pub fn is_executable(path: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        std::fs::metadata(path)
            .map(|metadata| metadata.is_file() && metadata.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
    }

    #[cfg(not(unix))]
    {
        path.is_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_live_in_the_app_config_dir() {
        let path = settings_path();
        assert!(path.ends_with("tubequeue/settings.json"));
    }

    #[test]
    fn download_dir_is_not_empty() {
        assert!(!default_download_dir().as_os_str().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn executable_bit_is_detected() {
        let dir = tempfile::tempdir().expect("temp dir");
        let file = dir.path().join("tool");
        std::fs::write(&file, b"#!/bin/sh\n").expect("write");
        assert!(!is_executable(&file));

        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&file, std::fs::Permissions::from_mode(0o755)).expect("chmod");
        assert!(is_executable(&file));
        assert!(!is_executable(dir.path()));
    }
}
