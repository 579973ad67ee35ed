//! Error handling for tubequeue

use thiserror::Error;

/// Main error type for tubequeue
#[derive(Debug, Clone, Error)]
pub enum LoaderError {
    /// Rejected before any work starts: empty or malformed URL, missing destination.
    #[error("{0}")]
    InvalidInput(String),

    #[error("yt-dlp not found. Please install yt-dlp")]
    YtDlpNotFound,

    #[error("Failed to extract video info: {0}")]
    Extraction(String),

    /// Engine reported the private-video signature. Not terminal on its own.
    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Login cancelled: no browser was chosen")]
    LoginDeclined,

    #[error("Login failed: {0}")]
    LoginFailed(String),

    #[error("Download failed: {0}")]
    Download(String),

    /// Engine could not be run at all (spawn or wait failure). Not retried.
    #[error("Unexpected error: {0}")]
    Unexpected(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl LoaderError {
    /// Whether this error carries the access-denied signature that triggers login escalation
    pub fn is_access_denied(&self) -> bool {
        match self {
            LoaderError::AccessDenied(_) => true,
            LoaderError::Extraction(msg) | LoaderError::Download(msg) => {
                crate::auth::is_access_denied(msg)
            }
            _ => false,
        }
    }
}

impl From<std::io::Error> for LoaderError {
    fn from(e: std::io::Error) -> Self {
        LoaderError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for LoaderError {
    fn from(e: serde_json::Error) -> Self {
        LoaderError::Serialization(e.to_string())
    }
}
