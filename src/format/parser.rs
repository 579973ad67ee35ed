//! Normalization of raw engine metadata into selectable formats

use crate::extractor::models::{numeric, RawFormat, RawInfo};
use crate::format::codec::CodecTable;
use serde::{Deserialize, Serialize};

pub const UNKNOWN_TITLE: &str = "Unknown Title";
pub const UNKNOWN_DURATION: &str = "Unknown Duration";
pub const UNKNOWN_SAMPLE_RATE: &str = "unknown sample rate";
pub const UNKNOWN_BITRATE: &str = "unknown bitrate";
pub const UNKNOWN_SIZE: &str = "unknown size";

/// Video half of a format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoFacet {
    pub resolution: String,
    pub fps: Option<f64>,
    pub codec: String,
    pub hdr: bool,
}

/// Audio half of a format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioFacet {
    pub sample_rate: String,
    pub bitrate: String,
    pub codec: String,
}

/// Immutable, display-ready view of one raw format. Always has at least one facet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedFormat {
    pub format_id: String,
    pub ext: String,
    pub size: u64,
    pub video: Option<VideoFacet>,
    pub audio: Option<AudioFacet>,
}

/// Best video and/or best audio resolved by the engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormatSummary {
    pub video: Option<VideoFacet>,
    pub audio: Option<AudioFacet>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Formats {
    Best(FormatSummary),
    All(Vec<ParsedFormat>),
}

/// Extraction result, owned by the task (or prompt) that requested it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub title: String,
    pub duration: String,
    pub size: u64,
    pub subtitles: Vec<String>,
    pub formats: Formats,
}

impl Metadata {
    /// The best-format summary, empty when the metadata lists all formats
    pub fn summary(&self) -> FormatSummary {
        match &self.formats {
            Formats::Best(summary) => summary.clone(),
            Formats::All(_) => FormatSummary::default(),
        }
    }

    /// Every parsed format, empty for best-only metadata
    pub fn all_formats(&self) -> &[ParsedFormat] {
        match &self.formats {
            Formats::All(formats) => formats,
            Formats::Best(_) => &[],
        }
    }
}

/// Turn a raw engine document into [`Metadata`].
///
/// With `best_only`, the paired `requested_formats` (if any) are merged into one
/// video/audio summary, later entries overwriting earlier ones of the same facet;
/// otherwise the single format matching the top-level `format_id` is used. Without
/// `best_only`, every usable non-storyboard format is returned.
pub fn parse_metadata(raw: &RawInfo, best_only: bool, codecs: &CodecTable) -> Metadata {
    let formats = if best_only {
        Formats::Best(best_summary(raw, codecs))
    } else {
        Formats::All(
            raw.formats
                .iter()
                .filter(|f| !f.is_storyboard() && f.has_stream_url())
                .filter_map(|f| parse_format(f, codecs))
                .collect(),
        )
    };

    Metadata {
        title: raw.title.clone().unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
        duration: raw
            .duration_string
            .clone()
            .unwrap_or_else(|| UNKNOWN_DURATION.to_string()),
        size: resolve_size(raw.filesize, raw.filesize_approx),
        subtitles: raw.subtitles.keys().cloned().collect(),
        formats,
    }
}

fn best_summary(raw: &RawInfo, codecs: &CodecTable) -> FormatSummary {
    let mut summary = FormatSummary::default();

    if let Some(requested) = &raw.requested_formats {
        for parsed in requested.iter().filter_map(|f| parse_format(f, codecs)) {
            if parsed.video.is_some() {
                summary.video = parsed.video;
            }
            if parsed.audio.is_some() {
                summary.audio = parsed.audio;
            }
        }
        return summary;
    }

    if let Some(format_id) = raw.format_id.as_deref() {
        if let Some(parsed) = raw
            .formats
            .iter()
            .find(|f| f.format_id == format_id)
            .and_then(|f| parse_format(f, codecs))
        {
            summary.video = parsed.video;
            summary.audio = parsed.audio;
        }
    }

    summary
}

/// Parse one raw format; `None` when it carries neither video nor audio.
pub fn parse_format(raw: &RawFormat, codecs: &CodecTable) -> Option<ParsedFormat> {
    let video = raw.has_video().then(|| VideoFacet {
        resolution: raw
            .resolution
            .clone()
            .unwrap_or_else(|| "unknown".to_string()),
        fps: raw.fps,
        codec: codecs.label(raw.vcodec.as_deref().unwrap_or_default()),
        hdr: raw.dynamic_range.as_deref().is_some_and(|d| d != "SDR"),
    });

    let audio = raw.has_audio().then(|| AudioFacet {
        sample_rate: sample_rate_label(numeric(raw.asr.as_ref())),
        bitrate: bitrate_label(numeric(raw.abr.as_ref())),
        codec: codecs.label(raw.acodec.as_deref().unwrap_or_default()),
    });

    if video.is_none() && audio.is_none() {
        return None;
    }

    Some(ParsedFormat {
        format_id: raw.format_id.clone(),
        ext: raw.ext.clone(),
        size: resolve_size(raw.filesize, raw.filesize_approx),
        video,
        audio,
    })
}

/// `44100` → `"44.1khz"`; absent or zero → the unknown label
pub fn sample_rate_label(hz: Option<f64>) -> String {
    match hz {
        Some(hz) if hz > 0.0 => format!("{}khz", round2(hz / 1000.0)),
        _ => UNKNOWN_SAMPLE_RATE.to_string(),
    }
}

/// `129.482` → `"129kbps"`; absent or zero → the unknown label
pub fn bitrate_label(kbps: Option<f64>) -> String {
    match kbps {
        Some(kbps) if kbps > 0.0 => format!("{}kbps", kbps.round() as i64),
        _ => UNKNOWN_BITRATE.to_string(),
    }
}

/// Exact size, else approximate, else 0 ("unknown")
pub fn resolve_size(exact: Option<f64>, approx: Option<f64>) -> u64 {
    exact
        .filter(|s| s.is_finite() && *s > 0.0)
        .or(approx.filter(|s| s.is_finite() && *s > 0.0))
        .map(|s| s as u64)
        .unwrap_or(0)
}

/// `13_000_000` → `"12.4MB"`; 0 → `"unknown size"`
pub fn size_label(bytes: u64) -> String {
    if bytes == 0 {
        return UNKNOWN_SIZE.to_string();
    }
    format!("{}MB", round2(bytes as f64 / (1024.0 * 1024.0)))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn fps_label(fps: Option<f64>) -> String {
    match fps {
        Some(fps) => format!("{}", round2(fps)),
        None => "?".to_string(),
    }
}

impl VideoFacet {
    pub fn label(&self) -> String {
        let mut label = format!(
            "{}@{}fps {}",
            self.resolution,
            fps_label(self.fps),
            self.codec
        );
        if self.hdr {
            label.push_str(" HDR");
        }
        label
    }
}

impl AudioFacet {
    pub fn label(&self) -> String {
        format!("{} {} {}", self.sample_rate, self.bitrate, self.codec)
    }
}

impl FormatSummary {
    pub fn is_empty(&self) -> bool {
        self.video.is_none() && self.audio.is_none()
    }

    /// One-line description used by task rows
    pub fn label(&self) -> String {
        let mut parts = Vec::new();
        if let Some(video) = &self.video {
            parts.push(format!("Video: {}", video.label()));
        }
        if let Some(audio) = &self.audio {
            parts.push(format!("Audio: {}", audio.label()));
        }
        parts.join(" ")
    }
}

impl ParsedFormat {
    pub fn is_combined(&self) -> bool {
        self.video.is_some() && self.audio.is_some()
    }

    pub fn label(&self) -> String {
        let mut lines = Vec::new();
        if let Some(video) = &self.video {
            lines.push(format!("Video: {}", video.label()));
        }
        if let Some(audio) = &self.audio {
            lines.push(format!("Audio: {}", audio.label()));
        }
        lines.push(format!(
            "File extension: {} Size: {}",
            self.ext,
            size_label(self.size)
        ));
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw_format(id: &str, vcodec: &str, acodec: &str) -> RawFormat {
        RawFormat {
            format_id: id.to_string(),
            ext: "mp4".to_string(),
            url: Some(format!("https://cdn.example.com/{}", id)),
            vcodec: Some(vcodec.to_string()),
            acodec: Some(acodec.to_string()),
            resolution: Some("1920x1080".to_string()),
            fps: Some(30.0),
            dynamic_range: Some("SDR".to_string()),
            asr: Some(json!(44100)),
            abr: Some(json!(129.5)),
            ..Default::default()
        }
    }

    #[test]
    fn requested_formats_merge_into_pair() {
        let raw = RawInfo {
            title: Some("Clip".into()),
            requested_formats: Some(vec![
                raw_format("137", "avc1.640028", "none"),
                raw_format("140", "none", "mp4a.40.2"),
            ]),
            ..Default::default()
        };
        let meta = parse_metadata(&raw, true, &CodecTable::default());
        let summary = meta.summary();
        assert_eq!(summary.video.expect("video").codec, "H264/AVC");
        let audio = summary.audio.expect("audio");
        assert_eq!(audio.codec, "AAC");
        assert_eq!(audio.bitrate, "130kbps");
        assert_eq!(audio.sample_rate, "44.1khz");
    }

    #[test]
    fn last_audio_capable_requested_entry_wins() {
        let raw = RawInfo {
            requested_formats: Some(vec![
                raw_format("251", "none", "opus"),
                raw_format("18", "avc1", "mp4a.40.2"),
            ]),
            ..Default::default()
        };
        let summary = parse_metadata(&raw, true, &CodecTable::default()).summary();
        assert_eq!(summary.audio.expect("audio").codec, "AAC");
        assert_eq!(summary.video.expect("video").codec, "H264/AVC");
    }

    #[test]
    fn best_without_pair_uses_chosen_format_id() {
        let raw = RawInfo {
            format_id: Some("251".into()),
            formats: vec![
                raw_format("18", "avc1", "mp4a"),
                raw_format("251", "none", "opus"),
            ],
            ..Default::default()
        };
        let summary = parse_metadata(&raw, true, &CodecTable::default()).summary();
        assert!(summary.video.is_none());
        assert_eq!(summary.audio.expect("audio").codec, "Opus");
    }

    #[test]
    fn best_with_unknown_format_id_is_empty() {
        let raw = RawInfo {
            format_id: Some("999".into()),
            formats: vec![raw_format("18", "avc1", "mp4a")],
            ..Default::default()
        };
        assert!(parse_metadata(&raw, true, &CodecTable::default())
            .summary()
            .is_empty());
    }

    #[test]
    fn all_formats_skip_storyboards_urlless_and_codecless() {
        let mut storyboard = raw_format("sb0", "none", "none");
        storyboard.format_note = Some("storyboard".into());
        let mut no_url = raw_format("22", "avc1", "mp4a");
        no_url.url = None;
        let mut mislabelled_storyboard = raw_format("sb1", "avc1", "none");
        mislabelled_storyboard.format_note = Some("storyboard".into());

        let raw = RawInfo {
            formats: vec![
                storyboard,
                no_url,
                mislabelled_storyboard,
                raw_format("bare", "none", "none"),
                raw_format("18", "avc1", "mp4a"),
            ],
            ..Default::default()
        };
        let meta = parse_metadata(&raw, false, &CodecTable::default());
        let ids: Vec<_> = meta.all_formats().iter().map(|f| f.format_id.as_str()).collect();
        assert_eq!(ids, vec!["18"]);
    }

    #[test]
    fn audio_without_abr_reports_unknown_bitrate() {
        let mut f = raw_format("140", "none", "mp4a.40.2");
        f.abr = None;
        let parsed = parse_format(&f, &CodecTable::default()).expect("audio format");
        assert_eq!(parsed.audio.expect("audio").bitrate, UNKNOWN_BITRATE);

        f.abr = Some(json!(0));
        let parsed = parse_format(&f, &CodecTable::default()).expect("audio format");
        assert_eq!(parsed.audio.expect("audio").bitrate, UNKNOWN_BITRATE);

        f.abr = Some(json!("garbage"));
        f.asr = Some(json!(null));
        let audio = parse_format(&f, &CodecTable::default())
            .expect("audio format")
            .audio
            .expect("audio");
        assert_eq!(audio.bitrate, UNKNOWN_BITRATE);
        assert_eq!(audio.sample_rate, UNKNOWN_SAMPLE_RATE);
    }

    #[test]
    fn hdr_only_when_range_is_not_sdr() {
        let mut f = raw_format("337", "vp09.02", "none");
        f.dynamic_range = Some("HDR10".into());
        assert!(parse_format(&f, &CodecTable::default()).unwrap().video.unwrap().hdr);
        f.dynamic_range = None;
        assert!(!parse_format(&f, &CodecTable::default()).unwrap().video.unwrap().hdr);
    }

    #[test]
    fn size_prefers_exact_then_approx() {
        assert_eq!(resolve_size(Some(10.0), Some(20.0)), 10);
        assert_eq!(resolve_size(None, Some(20.0)), 20);
        assert_eq!(resolve_size(Some(0.0), Some(20.0)), 20);
        assert_eq!(resolve_size(None, None), 0);
    }

    #[test]
    fn top_level_fields_default_when_missing() {
        let meta = parse_metadata(&RawInfo::default(), true, &CodecTable::default());
        assert_eq!(meta.title, UNKNOWN_TITLE);
        assert_eq!(meta.duration, UNKNOWN_DURATION);
        assert_eq!(meta.size, 0);
    }

    #[test]
    fn labels_render_like_the_queue_rows() {
        let parsed = parse_format(&raw_format("18", "avc1", "opus"), &CodecTable::default())
            .expect("format");
        assert_eq!(
            parsed.video.as_ref().unwrap().label(),
            "1920x1080@30fps H264/AVC"
        );
        assert_eq!(size_label(0), UNKNOWN_SIZE);
        assert_eq!(size_label(5 * 1024 * 1024), "5MB");
        assert!(parsed.label().contains("File extension: mp4 Size: unknown size"));
    }
}
