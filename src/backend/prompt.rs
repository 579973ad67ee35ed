//! Modal prompts the backend needs answered by the presentation layer

use crate::auth::CredentialSource;
use crate::extractor::models::FlatEntry;
use crate::format::{FormatChoice, FormatMenu};
use crate::resolver::{DownloadMode, PlaylistSelection};
use async_trait::async_trait;

/// Confirmed playlist selection
#[derive(Debug, Clone, PartialEq)]
pub enum PlaylistDecision {
    /// Queue the entries with the submission's quick mode
    Download(Vec<FlatEntry>),
    /// Pick one format from the first entry and apply it to every entry
    CustomizeSame(Vec<FlatEntry>),
    /// Pick a format per entry, one prompt after another
    CustomizeEach(Vec<FlatEntry>),
}

impl PlaylistDecision {
    pub fn entries(&self) -> &[FlatEntry] {
        match self {
            PlaylistDecision::Download(entries)
            | PlaylistDecision::CustomizeSame(entries)
            | PlaylistDecision::CustomizeEach(entries) => entries,
        }
    }
}

/// Every prompt may be dismissed, which is reported as `None`.
#[async_trait]
pub trait Prompter: Send + Sync {
    /// Which browser's cookies to retry with after an access-denied failure
    async fn choose_credential_source(&self, url: &str) -> Option<CredentialSource>;

    /// Which playlist entries to queue; `mode` decides what "confirm" means
    async fn select_playlist_entries(
        &self,
        selection: PlaylistSelection,
        mode: DownloadMode,
    ) -> Option<PlaylistDecision>;

    async fn choose_format(&self, menu: &FormatMenu) -> Option<FormatChoice>;
}
