//! URL validation and playlist/single classification

pub mod playlist;

use crate::downloader::DownloadOptions;
use crate::extractor::models::{FlatEntry, RawInfo};
use crate::extractor::MediaEngine;
use crate::utils::error::LoaderError;
use path_absolutize::Absolutize;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

pub use playlist::PlaylistSelection;

/// How a submission should be downloaded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DownloadMode {
    VideoBest,
    AudioBest,
    /// Let the user pick formats (and an audio conversion) before queueing
    Customize,
}

/// Outcome of the flat probe
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Single {
        url: String,
    },
    Playlist {
        title: String,
        url: String,
        /// Non-null members, in playlist order
        entries: Vec<FlatEntry>,
    },
}

/// Whether `url` has both a scheme and a host
pub fn is_valid_url(url: &str) -> bool {
    Url::parse(url.trim())
        .map(|u| u.host_str().is_some_and(|h| !h.is_empty()))
        .unwrap_or(false)
}

/// Check a submission before any work starts and return the absolute destination
pub fn validate_submission(url: &str, destination: &Path) -> Result<PathBuf, LoaderError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(LoaderError::InvalidInput("Please enter a URL".to_string()));
    }
    if !is_valid_url(url) {
        return Err(LoaderError::InvalidInput(format!("Invalid URL: {}", url)));
    }
    if destination.as_os_str().is_empty() {
        return Err(LoaderError::InvalidInput(
            "Please choose a download location".to_string(),
        ));
    }

    let absolute = destination
        .absolutize()
        .map_err(|e| LoaderError::InvalidInput(format!("Invalid download location: {}", e)))?;
    Ok(absolute.into_owned())
}

/// Full URL of a playlist member.
///
/// Absolute http(s) URLs are used verbatim. Bare ids are expanded against the playlist's
/// host (`watch?v=` form); YouTube-family hosts always expand to `www.youtube.com`. An
/// entry with no id at all falls back to the playlist URL.
pub fn entry_url(entry: &FlatEntry, playlist_url: &str) -> String {
    if let Some(url) = entry.url.as_deref() {
        if url.starts_with("http://") || url.starts_with("https://") {
            return url.to_string();
        }
    }

    let id = entry
        .url
        .as_deref()
        .filter(|u| !u.is_empty())
        .or(entry.id.as_deref())
        .filter(|id| !id.is_empty());
    let Some(id) = id else {
        return playlist_url.to_string();
    };

    match Url::parse(playlist_url) {
        Ok(parsed) => {
            let host = parsed.host_str().unwrap_or_default();
            if host.contains("youtube") || host.contains("youtu.be") {
                format!("https://www.youtube.com/watch?v={}", id)
            } else {
                format!("{}://{}/watch?v={}", parsed.scheme(), host, id)
            }
        }
        Err(_) => format!("https://www.youtube.com/watch?v={}", id),
    }
}

/// Decide between playlist and single item from a flat-probe document
pub fn classify_probe(info: RawInfo, url: &str) -> Result<Resolution, LoaderError> {
    let is_playlist = info.kind.as_deref() == Some("playlist") || info.entries.is_some();
    let raw_entries = info.entries.unwrap_or_default();

    if !is_playlist || raw_entries.is_empty() {
        return Ok(Resolution::Single {
            url: url.to_string(),
        });
    }

    let entries: Vec<FlatEntry> = raw_entries.into_iter().flatten().collect();
    if entries.is_empty() {
        return Err(LoaderError::Extraction(
            "No videos found in playlist".to_string(),
        ));
    }

    Ok(Resolution::Playlist {
        title: info.title.unwrap_or_else(|| "Playlist".to_string()),
        url: url.to_string(),
        entries,
    })
}

/// Probe `url` shallowly and classify it. Errors, empty output and timeouts all surface
/// as [`LoaderError::Extraction`].
pub async fn classify(
    engine: &dyn MediaEngine,
    url: &str,
    options: &DownloadOptions,
    timeout: Duration,
) -> Result<Resolution, LoaderError> {
    debug!("Probing {} (timeout {:?})", url, timeout);
    let probe = options.flat_probe();

    let info = match tokio::time::timeout(timeout, engine.probe_flat(url, &probe)).await {
        Ok(Ok(info)) => info,
        Ok(Err(e)) => {
            warn!("Probe failed for {}: {}", url, e);
            return Err(match e {
                LoaderError::Extraction(_) => e,
                other => LoaderError::Extraction(other.to_string()),
            });
        }
        Err(_) => {
            warn!("Probe timed out for {}", url);
            return Err(LoaderError::Extraction(format!(
                "Timed out after {}s while checking URL",
                timeout.as_secs()
            )));
        }
    };

    let resolution = classify_probe(info, url)?;
    if let Resolution::Playlist { entries, .. } = &resolution {
        info!("{} is a playlist with {} entries", url, entries.len());
    }
    Ok(resolution)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: Option<&str>, url: Option<&str>) -> FlatEntry {
        FlatEntry {
            id: id.map(str::to_string),
            url: url.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn submissions_are_validated() {
        assert!(matches!(
            validate_submission("", Path::new("/tmp")),
            Err(LoaderError::InvalidInput(_))
        ));
        assert!(matches!(
            validate_submission("not a url", Path::new("/tmp")),
            Err(LoaderError::InvalidInput(_))
        ));
        assert!(matches!(
            validate_submission("https://example.com/v", Path::new("")),
            Err(LoaderError::InvalidInput(_))
        ));
        let dest = validate_submission("https://example.com/v", Path::new("media")).unwrap();
        assert!(dest.is_absolute());
    }

    #[test]
    fn entry_urls_expand_bare_ids() {
        let yt = "https://www.youtube.com/playlist?list=PL1";
        assert_eq!(
            entry_url(&entry(Some("abc"), None), yt),
            "https://www.youtube.com/watch?v=abc"
        );
        assert_eq!(
            entry_url(&entry(None, Some("xyz")), "https://youtu.be/list"),
            "https://www.youtube.com/watch?v=xyz"
        );
        assert_eq!(
            entry_url(&entry(Some("9"), None), "http://videos.example.org/list/3"),
            "http://videos.example.org/watch?v=9"
        );
        assert_eq!(
            entry_url(&entry(Some("a"), Some("https://cdn.example.com/a")), yt),
            "https://cdn.example.com/a"
        );
        assert_eq!(entry_url(&entry(None, None), yt), yt);
    }

    #[test]
    fn probe_documents_classify() {
        let single = RawInfo {
            title: Some("clip".into()),
            ..Default::default()
        };
        assert_eq!(
            classify_probe(single, "u").unwrap(),
            Resolution::Single { url: "u".into() }
        );

        let playlist = RawInfo {
            kind: Some("playlist".into()),
            title: Some("Mix".into()),
            entries: Some(vec![Some(entry(Some("a"), None)), None, Some(entry(Some("b"), None))]),
            ..Default::default()
        };
        match classify_probe(playlist, "u").unwrap() {
            Resolution::Playlist { title, entries, .. } => {
                assert_eq!(title, "Mix");
                assert_eq!(entries.len(), 2);
            }
            other => panic!("expected playlist, got {:?}", other),
        }
    }

    #[test]
    fn empty_playlists_are_single_and_all_null_fails() {
        let empty = RawInfo {
            kind: Some("playlist".into()),
            entries: Some(vec![]),
            ..Default::default()
        };
        assert!(matches!(
            classify_probe(empty, "u").unwrap(),
            Resolution::Single { .. }
        ));

        let nulls = RawInfo {
            kind: Some("playlist".into()),
            entries: Some(vec![None, None]),
            ..Default::default()
        };
        assert!(matches!(
            classify_probe(nulls, "u"),
            Err(LoaderError::Extraction(_))
        ));
    }

    /// Engine whose probe either stalls or fails outright
    struct StubEngine {
        stall: bool,
    }

    #[async_trait::async_trait]
    impl MediaEngine for StubEngine {
        fn id(&self) -> &'static str {
            "stub"
        }

        async fn probe_flat(&self, _url: &str, options: &DownloadOptions) -> Result<RawInfo, LoaderError> {
            assert!(options.flat);
            if self.stall {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
            Err(LoaderError::Io("connection refused".into()))
        }

        async fn extract(&self, _url: &str, _options: &DownloadOptions) -> Result<RawInfo, LoaderError> {
            unreachable!("classify only probes")
        }

        async fn download(
            &self,
            _url: &str,
            _options: &DownloadOptions,
            _events: tokio::sync::mpsc::UnboundedSender<crate::downloader::EngineEvent>,
        ) -> Result<(), LoaderError> {
            unreachable!("classify only probes")
        }
    }

    #[test]
    fn probe_failures_surface_as_extraction_errors() {
        let engine = StubEngine { stall: false };
        let err = tokio_test::block_on(classify(
            &engine,
            "https://example.com/v",
            &DownloadOptions::default(),
            Duration::from_secs(5),
        ))
        .unwrap_err();
        assert!(matches!(err, LoaderError::Extraction(ref m) if m.contains("connection refused")));
    }

    #[test]
    fn stalled_probe_times_out() {
        let engine = StubEngine { stall: true };
        let err = tokio_test::block_on(classify(
            &engine,
            "https://example.com/v",
            &DownloadOptions::default(),
            Duration::from_millis(20),
        ))
        .unwrap_err();
        assert!(matches!(err, LoaderError::Extraction(ref m) if m.starts_with("Timed out")));
    }
}
