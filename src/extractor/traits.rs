use crate::downloader::progress::EngineEvent;
use crate::downloader::DownloadOptions;
use crate::extractor::models::RawInfo;
use crate::utils::error::LoaderError;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Extraction/download engine boundary
///
/// Isolates the queue from the concrete engine (the yt-dlp subprocess in production,
/// scripted fakes in tests). Implementations report failures through the returned
/// `Result`; the event channel only carries progress.
#[async_trait]
pub trait MediaEngine: Send + Sync {
    /// Short identifier used in logs
    fn id(&self) -> &'static str;

    /// Shallow probe used to tell playlists from single items
    async fn probe_flat(&self, url: &str, options: &DownloadOptions) -> Result<RawInfo, LoaderError>;

    /// Full metadata for one item, including its format list
    async fn extract(&self, url: &str, options: &DownloadOptions) -> Result<RawInfo, LoaderError>;

    /// Download (and post-process) one item, streaming events until it returns
    async fn download(
        &self,
        url: &str,
        options: &DownloadOptions,
        events: mpsc::UnboundedSender<EngineEvent>,
    ) -> Result<(), LoaderError>;
}
