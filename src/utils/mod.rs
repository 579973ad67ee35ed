//! Utility modules for error handling, configuration and filesystem helpers

pub mod config;
pub mod error;
pub mod platform;
pub mod sanitize;

// Re-export for convenience
pub use config::AppSettings;
pub use error::LoaderError;
pub use sanitize::sanitize_title;
