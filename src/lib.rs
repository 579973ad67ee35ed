//! tubequeue library
//!
//! A serial download queue on top of yt-dlp: URL classification, per-item format
//! selection, one download at a time, and login escalation for private media.

pub mod app;
pub mod auth;
pub mod backend;
pub mod cli;
pub mod downloader;
pub mod extractor;
pub mod format;
pub mod queue;
pub mod resolver;
pub mod utils;

// Re-export main types for easier use
pub use app::{spawn_backend, BackendHandle};
pub use backend::{BackendCommand, BackendConfig, BackendEvent, PlaylistDecision, Prompter};
pub use downloader::{DownloadEvent, DownloadOptions, EngineEvent, PostprocessEvent};
pub use extractor::{MediaEngine, YtDlpEngine};
pub use queue::{DownloadTask, QueueEvent, SchedulerState, TaskState};
pub use resolver::DownloadMode;
pub use utils::{AppSettings, LoaderError};
