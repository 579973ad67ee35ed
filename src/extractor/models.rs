//! Raw metadata as reported by the extraction engine (yt-dlp `-J` JSON)
//!
//! Every field is optional or defaulted: extractors disagree wildly on what they fill
//! in, and a missing key must never fail the whole document.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Top-level info document for a single video or a playlist
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawInfo {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(rename = "_type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub webpage_url: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub duration_string: Option<String>,
    #[serde(default)]
    pub filesize: Option<f64>,
    #[serde(default)]
    pub filesize_approx: Option<f64>,
    #[serde(default)]
    pub subtitles: BTreeMap<String, Value>,
    /// Engine's chosen format when a single stream satisfies the request
    #[serde(default)]
    pub format_id: Option<String>,
    /// Paired best-video + best-audio streams chosen by the engine
    #[serde(default)]
    pub requested_formats: Option<Vec<RawFormat>>,
    #[serde(default)]
    pub formats: Vec<RawFormat>,
    /// Present for playlists; members the engine could not resolve are `null`
    #[serde(default)]
    pub entries: Option<Vec<Option<FlatEntry>>>,
}

/// One raw format entry
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawFormat {
    #[serde(default)]
    pub format_id: String,
    #[serde(default)]
    pub ext: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub format_note: Option<String>,
    #[serde(default)]
    pub vcodec: Option<String>,
    #[serde(default)]
    pub acodec: Option<String>,
    #[serde(default)]
    pub resolution: Option<String>,
    #[serde(default)]
    pub fps: Option<f64>,
    #[serde(default)]
    pub dynamic_range: Option<String>,
    /// Audio sample rate in Hz; kept untyped because some extractors emit strings
    #[serde(default)]
    pub asr: Option<Value>,
    /// Audio bitrate in kbps; kept untyped for the same reason
    #[serde(default)]
    pub abr: Option<Value>,
    #[serde(default)]
    pub filesize: Option<f64>,
    #[serde(default)]
    pub filesize_approx: Option<f64>,
}

impl RawFormat {
    /// Whether the entry carries a video stream
    pub fn has_video(&self) -> bool {
        codec_present(self.vcodec.as_deref())
    }

    /// Whether the entry carries an audio stream
    pub fn has_audio(&self) -> bool {
        codec_present(self.acodec.as_deref())
    }

    pub fn is_storyboard(&self) -> bool {
        self.format_note.as_deref() == Some("storyboard")
    }

    pub fn has_stream_url(&self) -> bool {
        self.url.as_deref().is_some_and(|u| !u.is_empty())
    }
}

fn codec_present(codec: Option<&str>) -> bool {
    matches!(codec, Some(c) if !c.is_empty() && c != "none")
}

/// Shallow playlist member returned by a flat probe
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlatEntry {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
}

impl RawInfo {
    /// Parse the JSON document printed by the engine
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Interpret a loosely typed numeric field (number or numeric string)
pub fn numeric(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
}
