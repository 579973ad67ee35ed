//! Login escalation for private or access-restricted media
//!
//! When the engine answers with the private-video signature, the user is asked once
//! which browser holds a logged-in session; the failed operation is then retried a
//! single time with that browser's cookies.

use crate::backend::prompt::Prompter;
use crate::downloader::DownloadOptions;
use crate::utils::error::LoaderError;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

/// Tail of the engine message for private videos
pub const PRIVATE_VIDEO_SIGNATURE: &str =
    "Private video. Sign in if you've been granted access to this video";

/// Whether an engine error message means "log in to see this"
pub fn is_access_denied(message: &str) -> bool {
    message.trim_end().ends_with(PRIVATE_VIDEO_SIGNATURE)
}

/// Browsers the engine can borrow session cookies from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialSource {
    Brave,
    Chrome,
    Chromium,
    Edge,
    Firefox,
    Opera,
    Safari,
    Vivaldi,
}

impl CredentialSource {
    pub const ALL: [CredentialSource; 8] = [
        CredentialSource::Brave,
        CredentialSource::Chrome,
        CredentialSource::Chromium,
        CredentialSource::Edge,
        CredentialSource::Firefox,
        CredentialSource::Opera,
        CredentialSource::Safari,
        CredentialSource::Vivaldi,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialSource::Brave => "brave",
            CredentialSource::Chrome => "chrome",
            CredentialSource::Chromium => "chromium",
            CredentialSource::Edge => "edge",
            CredentialSource::Firefox => "firefox",
            CredentialSource::Opera => "opera",
            CredentialSource::Safari => "safari",
            CredentialSource::Vivaldi => "vivaldi",
        }
    }
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CredentialSource {
    type Err = LoaderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|source| source.as_str() == wanted)
            .ok_or_else(|| LoaderError::InvalidInput(format!("Unknown browser: {}", s)))
    }
}

/// Result of an operation that may have needed a login
#[derive(Debug)]
pub struct Escalated<T> {
    pub value: T,
    /// Browser that made the retry succeed; callers promote it into the default options
    pub promoted: Option<CredentialSource>,
}

/// Run `attempt`, escalating to a one-shot browser login on access denial.
///
/// `attempt` is the operation itself (extraction or download) parameterized by the
/// options it should run with. It is called at most twice. A dismissed prompt maps to
/// [`LoaderError::LoginDeclined`], a failed retry to [`LoaderError::LoginFailed`].
pub async fn with_escalation<T, F>(
    prompter: &dyn Prompter,
    url: &str,
    options: &DownloadOptions,
    mut attempt: F,
) -> Result<Escalated<T>, LoaderError>
where
    F: FnMut(DownloadOptions) -> BoxFuture<'static, Result<T, LoaderError>>,
{
    let err = match attempt(options.clone()).await {
        Ok(value) => {
            return Ok(Escalated {
                value,
                promoted: None,
            })
        }
        Err(err) if err.is_access_denied() => err,
        Err(err) => return Err(err),
    };

    warn!("{} needs a login: {}", url, err);
    let Some(source) = prompter.choose_credential_source(url).await else {
        info!("Login prompt dismissed for {}", url);
        return Err(LoaderError::LoginDeclined);
    };

    let mut retry = options.clone();
    retry.cookies_from_browser = Some(source);
    info!("Retrying {} with cookies from {}", url, source);

    match attempt(retry).await {
        Ok(value) => Ok(Escalated {
            value,
            promoted: Some(source),
        }),
        Err(e) => {
            warn!("Login with {} failed for {}: {}", source, url, e);
            Err(LoaderError::LoginFailed(e.to_string()))
        }
    }
}
