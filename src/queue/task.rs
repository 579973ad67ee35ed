//! Download task state machine

use crate::downloader::progress::{parse_percent, strip_ansi, DownloadEvent, PostprocessEvent};
use crate::downloader::DownloadOptions;
use crate::format::{size_label, FormatSummary, Metadata};
use crate::utils::error::LoaderError;
use crate::utils::sanitize::sanitize_title;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub type TaskId = Uuid;

pub const STATUS_QUEUED: &str = "Queued - Waiting to extract info...";
pub const STATUS_EXTRACTING: &str = "Extracting info...";
pub const STATUS_READY: &str = "Ready to download";
pub const STATUS_EXTRACT_FAILED: &str = "Failed to extract info";
pub const STATUS_STARTING: &str = "Starting download...";
pub const STATUS_FINISHED: &str = "Finished";
pub const STATUS_DOWNLOAD_ERROR: &str = "Download error";
pub const STATUS_POSTPROCESSING: &str = "Post-processing";

/// Task lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskState {
    Queued,
    Extracting,
    Extracted,
    ExtractFailed,
    Downloading,
    Finished,
    DownloadFailed,
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::ExtractFailed | TaskState::Finished | TaskState::DownloadFailed
        )
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskState::Queued => "Queued",
            TaskState::Extracting => "Extracting",
            TaskState::Extracted => "Extracted",
            TaskState::ExtractFailed => "Extract failed",
            TaskState::Downloading => "Downloading",
            TaskState::Finished => "Finished",
            TaskState::DownloadFailed => "Download failed",
        };
        f.write_str(name)
    }
}

/// Work order handed to an extraction worker
#[derive(Debug, Clone)]
pub struct ExtractRequest {
    pub task_id: TaskId,
    pub url: String,
    pub options: DownloadOptions,
}

/// Work order handed to a download worker
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub task_id: TaskId,
    pub url: String,
    pub options: DownloadOptions,
}

/// One queued item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadTask {
    pub id: TaskId,
    pub url: String,
    pub destination: PathBuf,
    pub options: DownloadOptions,
    pub state: TaskState,
    /// 0..=100
    pub progress: u8,
    pub status: String,
    pub title: Option<String>,
    pub duration: Option<String>,
    pub size: u64,
    pub summary: FormatSummary,
    pub created_at: DateTime<Utc>,
}

impl DownloadTask {
    /// New task that still needs its metadata
    pub fn new(url: impl Into<String>, destination: impl Into<PathBuf>, options: DownloadOptions) -> Self {
        Self {
            id: Uuid::new_v4(),
            url: url.into(),
            destination: destination.into(),
            options,
            state: TaskState::Queued,
            progress: 0,
            status: STATUS_QUEUED.to_string(),
            title: None,
            duration: None,
            size: 0,
            summary: FormatSummary::default(),
            created_at: Utc::now(),
        }
    }

    /// Task whose metadata is already known; it starts out ready to download
    pub fn with_info(
        url: impl Into<String>,
        destination: impl Into<PathBuf>,
        options: DownloadOptions,
        metadata: &Metadata,
        summary: FormatSummary,
    ) -> Self {
        let mut task = Self::new(url, destination, options);
        task.apply_metadata(metadata);
        task.summary = summary;
        task.state = TaskState::Extracted;
        task.status = STATUS_READY.to_string();
        task
    }

    pub fn size_label(&self) -> String {
        size_label(self.size)
    }

    /// Queued → Extracting
    pub fn begin_extraction(&mut self) -> Option<ExtractRequest> {
        if self.state != TaskState::Queued {
            warn!("Task {} cannot start extraction from {}", self.id, self.state);
            return None;
        }
        self.state = TaskState::Extracting;
        self.status = STATUS_EXTRACTING.to_string();
        info!("Extracting info for {}", self.url);
        Some(ExtractRequest {
            task_id: self.id,
            url: self.url.clone(),
            options: self.options.single_item(),
        })
    }

    /// Extracting → Extracted | ExtractFailed. Results for a task in any other state are
    /// ignored and `false` is returned.
    pub fn finish_extraction(&mut self, result: Result<Metadata, LoaderError>) -> bool {
        if self.state != TaskState::Extracting {
            debug!("Ignoring extraction result for task {} in {}", self.id, self.state);
            return false;
        }
        match result {
            Ok(metadata) => {
                self.apply_metadata(&metadata);
                self.summary = metadata.summary();
                self.state = TaskState::Extracted;
                self.status = STATUS_READY.to_string();
                info!("Ready to download: {}", metadata.title);
            }
            Err(e) => {
                self.state = TaskState::ExtractFailed;
                self.status = STATUS_EXTRACT_FAILED.to_string();
                warn!("Extraction failed for {}: {}", self.url, e);
            }
        }
        true
    }

    fn apply_metadata(&mut self, metadata: &Metadata) {
        let title = sanitize_title(&metadata.title);
        self.options.resolve_title(&title);
        self.title = Some(title);
        self.duration = Some(metadata.duration.clone());
        self.size = metadata.size;
    }

    /// Extracted → Downloading
    pub fn begin_download(&mut self) -> Option<DownloadRequest> {
        if self.state != TaskState::Extracted {
            warn!("Task {} cannot start downloading from {}", self.id, self.state);
            return None;
        }
        self.state = TaskState::Downloading;
        self.status = STATUS_STARTING.to_string();
        info!("Starting download of {}", self.url);
        Some(DownloadRequest {
            task_id: self.id,
            url: self.url.clone(),
            options: self.options.clone(),
        })
    }

    /// Apply a download-stream event. Returns `true` when the event moved the task into a
    /// terminal state.
    pub fn on_download_event(&mut self, event: &DownloadEvent) -> bool {
        match event {
            DownloadEvent::Downloading { percent, line } => {
                if let Some(value) = parse_percent(percent) {
                    self.progress = value;
                    self.status = format!("Downloading: {}", strip_ansi(line).trim());
                }
                false
            }
            _ if self.state.is_terminal() => false,
            DownloadEvent::Finished => {
                self.state = TaskState::Finished;
                self.status = STATUS_FINISHED.to_string();
                self.progress = 100;
                true
            }
            DownloadEvent::Failed(message) => {
                self.state = TaskState::DownloadFailed;
                self.status = STATUS_DOWNLOAD_ERROR.to_string();
                warn!("Download failed for {}: {}", self.url, message);
                true
            }
        }
    }

    /// Apply a post-processing event; status text only
    pub fn on_postprocess_event(&mut self, event: &PostprocessEvent) {
        self.status = match event {
            PostprocessEvent::Started | PostprocessEvent::Processing => STATUS_POSTPROCESSING,
            PostprocessEvent::Finished => STATUS_FINISHED,
        }
        .to_string();
    }

    /// Title when known, else the URL
    pub fn display_name(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.url)
    }
}
