//! Progress and post-processing events emitted by the engine during a download

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref PERCENT_RE: Regex = Regex::new(r"\d{1,3}\.\d{1,2}%").unwrap();
    static ref ANSI_RE: Regex = Regex::new(r"\x1B(?:[@-Z\\-_]|\[[0-?]*[ -/]*[@-~])").unwrap();
}

/// Download-stream event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DownloadEvent {
    /// Periodic report. `percent` is the engine's raw percentage text (`" 42.5%"`),
    /// `line` its human-readable progress line (may contain terminal colors).
    Downloading { percent: String, line: String },
    /// The stream finished; post-processing may still follow.
    Finished,
    Failed(String),
}

impl DownloadEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, DownloadEvent::Finished | DownloadEvent::Failed(_))
    }
}

/// Post-processing event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PostprocessEvent {
    Started,
    Processing,
    /// Any other status tag; the post-processor's own terminal signal
    Finished,
}

impl PostprocessEvent {
    /// Map the engine's status tag
    pub fn from_status(status: &str) -> Self {
        match status.trim() {
            "started" => PostprocessEvent::Started,
            "processing" => PostprocessEvent::Processing,
            _ => PostprocessEvent::Finished,
        }
    }
}

/// Everything a running download reports back
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EngineEvent {
    Download(DownloadEvent),
    Postprocess(PostprocessEvent),
}

/// Integer percentage from text like `" 42.57%"`.
///
/// Only the `d{1,3}.d{1,2}%` shape is accepted; anything else, or a value above 100,
/// yields `None`.
pub fn parse_percent(text: &str) -> Option<u8> {
    let found = PERCENT_RE.find(text)?.as_str();
    let (whole, _) = found.split_once('.')?;
    let value: u16 = whole.parse().ok()?;
    if value > 100 {
        return None;
    }
    u8::try_from(value).ok()
}

/// Remove terminal color and cursor escape sequences
pub fn strip_ansi(text: &str) -> String {
    ANSI_RE.replace_all(text, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_takes_integer_part() {
        assert_eq!(parse_percent("42.57%"), Some(42));
        assert_eq!(parse_percent("  0.0%"), Some(0));
        assert_eq!(parse_percent("100.00%"), Some(100));
        assert_eq!(parse_percent("\x1b[0;94m 99.9%\x1b[0m"), Some(99));
    }

    #[test]
    fn unparsable_percentages_are_rejected() {
        assert_eq!(parse_percent("N/A"), None);
        assert_eq!(parse_percent("42%"), None);
        assert_eq!(parse_percent("Unknown"), None);
        assert_eq!(parse_percent("250.00%"), None);
    }

    #[test]
    fn ansi_sequences_are_stripped() {
        let colored = "\x1b[0;94m 12.3%\x1b[0m of \x1b[0;32m10.00MiB\x1b[0m";
        assert_eq!(strip_ansi(colored), " 12.3% of 10.00MiB");
    }

    #[test]
    fn postprocess_tags_map() {
        assert_eq!(PostprocessEvent::from_status("started"), PostprocessEvent::Started);
        assert_eq!(PostprocessEvent::from_status("processing"), PostprocessEvent::Processing);
        assert_eq!(PostprocessEvent::from_status("finished"), PostprocessEvent::Finished);
    }
}
