//! yt-dlp subprocess engine
//!
//! Supports a bundled yt-dlp (next to the executable, or inside a macOS .app bundle),
//! one on PATH, and the usual install locations.

use crate::downloader::progress::{DownloadEvent, EngineEvent, PostprocessEvent};
use crate::downloader::DownloadOptions;
use crate::extractor::models::RawInfo;
use crate::extractor::traits::MediaEngine;
use crate::utils::error::LoaderError;
use crate::utils::platform::{is_executable, ytdlp_binary_name};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

const DOWNLOAD_TAG: &str = "tubequeue-dl ";
const POSTPROCESS_TAG: &str = "tubequeue-pp ";
const FIELD_SEP: char = '|';

/// Engine backed by the yt-dlp executable
pub struct YtDlpEngine {
    ytdlp_path: PathBuf,
}

impl YtDlpEngine {
    /// Use `explicit` when given, otherwise search for yt-dlp
    pub fn new(explicit: Option<&Path>) -> Result<Self, LoaderError> {
        if let Some(path) = explicit {
            if path.is_file() {
                info!("Using configured yt-dlp: {}", path.display());
                return Ok(Self {
                    ytdlp_path: path.to_path_buf(),
                });
            }
            warn!("Configured yt-dlp {} does not exist, searching", path.display());
        }

        match find_ytdlp() {
            Some(ytdlp_path) => {
                info!("Found yt-dlp at: {}", ytdlp_path.display());
                Ok(Self { ytdlp_path })
            }
            None => {
                error!("yt-dlp not found anywhere!");
                Err(LoaderError::YtDlpNotFound)
            }
        }
    }

    pub fn ytdlp_path(&self) -> &Path {
        &self.ytdlp_path
    }

    /// `yt-dlp --version`
    pub async fn version(&self) -> Result<String, LoaderError> {
        let output = Command::new(&self.ytdlp_path)
            .arg("--version")
            .output()
            .await?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn dump_json(
        &self,
        url: &str,
        options: &DownloadOptions,
    ) -> Result<RawInfo, LoaderError> {
        let args = options.to_args();
        debug!("yt-dlp -J {} {}", args.join(" "), url);

        let output = Command::new(&self.ytdlp_path)
            .args(&args)
            .arg("-J")
            .arg("--no-warnings")
            .arg(url)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| unexpected("run yt-dlp", e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = error_message(&stderr)
                .unwrap_or_else(|| format!("yt-dlp exited with {}", output.status));
            error!("yt-dlp extraction failed: {}", message);
            return Err(engine_failure(message, LoaderError::Extraction));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        if stdout.trim().is_empty() {
            return Err(LoaderError::Extraction(format!(
                "yt-dlp returned no information for {}",
                url
            )));
        }
        RawInfo::from_json(&stdout).map_err(|e| LoaderError::Extraction(e.to_string()))
    }
}

#[async_trait]
impl MediaEngine for YtDlpEngine {
    fn id(&self) -> &'static str {
        "yt-dlp"
    }

    async fn probe_flat(&self, url: &str, options: &DownloadOptions) -> Result<RawInfo, LoaderError> {
        self.dump_json(url, &options.flat_probe()).await
    }

    async fn extract(&self, url: &str, options: &DownloadOptions) -> Result<RawInfo, LoaderError> {
        self.dump_json(url, &options.single_item()).await
    }

    async fn download(
        &self,
        url: &str,
        options: &DownloadOptions,
        events: mpsc::UnboundedSender<EngineEvent>,
    ) -> Result<(), LoaderError> {
        let args = options.to_args();
        debug!("yt-dlp {} {}", args.join(" "), url);

        let mut child = Command::new(&self.ytdlp_path)
            .args(&args)
            .arg("--newline")
            .arg("--no-warnings")
            .arg("--progress")
            .arg("--progress-template")
            .arg(format!(
                "download:{}%(progress.status)s|%(progress._percent_str)s|%(progress._default_template)s",
                DOWNLOAD_TAG
            ))
            .arg("--progress-template")
            .arg(format!(
                "postprocess:{}%(progress.status)s|%(progress.postprocessor)s",
                POSTPROCESS_TAG
            ))
            .arg(url)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| unexpected("start yt-dlp", e))?;

        // Error lines end up in the failure message
        let stderr_reader = child.stderr.take().map(|stderr| {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                let mut errors = Vec::new();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!("yt-dlp stderr: {}", line);
                    if line.starts_with("ERROR:") {
                        errors.push(line);
                    }
                }
                errors
            })
        });

        if let Some(stdout) = child.stdout.take() {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if let Some(event) = parse_progress_line(&line) {
                    if events.send(event).is_err() {
                        debug!("Event receiver dropped, ignoring further progress");
                    }
                }
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| unexpected("wait for yt-dlp", e))?;
        let errors = match stderr_reader {
            Some(handle) => handle.await.unwrap_or_default(),
            None => Vec::new(),
        };

        if status.success() {
            info!("yt-dlp finished {}", url);
            Ok(())
        } else {
            let message = if errors.is_empty() {
                format!("yt-dlp exited with {}", status)
            } else {
                errors.join("\n")
            };
            error!("yt-dlp download failed: {}", message);
            Err(engine_failure(message, LoaderError::Download))
        }
    }
}

/// The private-video signature becomes [`LoaderError::AccessDenied`], anything else `otherwise`
fn engine_failure(message: String, otherwise: fn(String) -> LoaderError) -> LoaderError {
    if crate::auth::is_access_denied(&message) {
        LoaderError::AccessDenied(message)
    } else {
        otherwise(message)
    }
}

fn unexpected(action: &str, e: std::io::Error) -> LoaderError {
    LoaderError::Unexpected(format!("could not {}: {}", action, e))
}

/// Turn one tagged stdout line into an engine event
pub fn parse_progress_line(line: &str) -> Option<EngineEvent> {
    if let Some(rest) = line.strip_prefix(DOWNLOAD_TAG) {
        let mut fields = rest.splitn(3, FIELD_SEP);
        let status = fields.next()?.trim();
        let percent = fields.next().unwrap_or_default().to_string();
        let text = fields.next().unwrap_or_default().to_string();
        let event = match status {
            "downloading" => DownloadEvent::Downloading { percent, line: text },
            "finished" => DownloadEvent::Finished,
            "error" => DownloadEvent::Failed(text),
            _ => return None,
        };
        return Some(EngineEvent::Download(event));
    }

    let rest = line.strip_prefix(POSTPROCESS_TAG)?;
    let status = rest.split(FIELD_SEP).next()?;
    Some(EngineEvent::Postprocess(PostprocessEvent::from_status(status)))
}

/// All `ERROR:` lines of an engine's stderr, or the trimmed stderr when there are none
fn error_message(stderr: &str) -> Option<String> {
    let errors: Vec<&str> = stderr
        .lines()
        .filter(|line| line.starts_with("ERROR:"))
        .collect();
    if !errors.is_empty() {
        return Some(errors.join("\n"));
    }
    let trimmed = stderr.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

// ============================================================
// yt-dlp Detection Functions
// ============================================================

/// Find yt-dlp binary with priority:
/// 1. Bundled (next to the executable or inside the .app bundle)
/// 2. System PATH
/// 3. Common installation paths
pub fn find_ytdlp() -> Option<PathBuf> {
    if let Some(bundled) = find_bundled_ytdlp() {
        debug!("Using bundled yt-dlp: {:?}", bundled);
        return Some(bundled);
    }
    if let Ok(system) = which::which(ytdlp_binary_name()) {
        debug!("Using system yt-dlp: {:?}", system);
        return Some(system);
    }
    if let Some(common) = find_in_common_paths() {
        debug!("Using yt-dlp from common path: {:?}", common);
        return Some(common);
    }
    warn!("yt-dlp not found in bundle, PATH or common locations");
    None
}

fn find_bundled_ytdlp() -> Option<PathBuf> {
    let exe_path = std::env::current_exe().ok()?;
    let exe_dir = exe_path.parent()?;

    // Tubequeue.app/Contents/MacOS/tubequeue -> Contents/Resources/bin/yt-dlp
    if exe_dir.ends_with("MacOS") {
        let bundled = exe_dir
            .parent()?
            .join("Resources")
            .join("bin")
            .join(ytdlp_binary_name());
        if is_executable(&bundled) {
            return Some(bundled);
        }
    }

    let beside = exe_dir.join(ytdlp_binary_name());
    is_executable(&beside).then_some(beside)
}

fn find_in_common_paths() -> Option<PathBuf> {
    let mut candidates: Vec<PathBuf> = [
        "/opt/homebrew/bin/yt-dlp",
        "/usr/local/bin/yt-dlp",
        "/usr/bin/yt-dlp",
        "/Library/Frameworks/Python.framework/Versions/Current/bin/yt-dlp",
    ]
    .into_iter()
    .map(PathBuf::from)
    .collect();
    if let Some(home) = dirs::home_dir() {
        candidates.push(home.join(".local").join("bin").join(ytdlp_binary_name()));
    }

    candidates.into_iter().find(|path| is_executable(path))
}
