//! Customize-download menu: what the format prompt shows and what it returns

use crate::format::parser::{FormatSummary, Metadata, ParsedFormat};
use crate::utils::error::LoaderError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Audio re-encode targets offered for audio-only picks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioTarget {
    Aac,
    Alac,
    Flac,
    M4a,
    Mp3,
    Opus,
    Vorbis,
    Wav,
}

impl AudioTarget {
    pub const ALL: [AudioTarget; 8] = [
        AudioTarget::Aac,
        AudioTarget::Alac,
        AudioTarget::Flac,
        AudioTarget::M4a,
        AudioTarget::Mp3,
        AudioTarget::Opus,
        AudioTarget::Vorbis,
        AudioTarget::Wav,
    ];

    /// Codec name understood by the engine's audio extractor
    pub fn codec(&self) -> &'static str {
        match self {
            AudioTarget::Aac => "aac",
            AudioTarget::Alac => "alac",
            AudioTarget::Flac => "flac",
            AudioTarget::M4a => "m4a",
            AudioTarget::Mp3 => "mp3",
            AudioTarget::Opus => "opus",
            AudioTarget::Vorbis => "vorbis",
            AudioTarget::Wav => "wav",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AudioTarget::Aac => "AAC (.m4a)",
            AudioTarget::Alac => "ALAC (.m4a)",
            AudioTarget::Flac => "FLAC (.flac)",
            AudioTarget::M4a => "m4a (.m4a)",
            AudioTarget::Mp3 => "mp3 (.mp3)",
            AudioTarget::Opus => "Opus (.opus)",
            AudioTarget::Vorbis => "Vorbis (.ogg)",
            AudioTarget::Wav => "WAV (.wav)",
        }
    }

    pub fn from_codec(codec: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.codec().eq_ignore_ascii_case(codec.trim()))
    }
}

/// Conversion quality as shown to the user: 10 is the best, 0 the worst.
///
/// The engine's knob runs the other way (0 best), see [`QualityLevel::engine_value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityLevel(u8);

impl QualityLevel {
    pub const HIGHEST: u8 = 10;

    pub fn new(level: u8) -> Result<Self, LoaderError> {
        if level > Self::HIGHEST {
            return Err(LoaderError::InvalidInput(format!(
                "Quality must be between 0 and {}, got {}",
                Self::HIGHEST,
                level
            )));
        }
        Ok(Self(level))
    }

    pub fn level(&self) -> u8 {
        self.0
    }

    pub fn engine_value(&self) -> u8 {
        Self::HIGHEST - self.0
    }

    /// All levels in menu order (highest first)
    pub fn menu() -> impl Iterator<Item = QualityLevel> {
        (0..=Self::HIGHEST).rev().map(QualityLevel)
    }
}

impl Default for QualityLevel {
    fn default() -> Self {
        Self(5)
    }
}

impl fmt::Display for QualityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            10 => write!(f, "10 (Highest Quality)"),
            5 => write!(f, "5 (Medium Quality)"),
            0 => write!(f, "0 (Lowest Quality)"),
            n => write!(f, "{}", n),
        }
    }
}

/// Audio conversion requested alongside an audio-only pick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioConversion {
    pub target: AudioTarget,
    pub quality: QualityLevel,
}

/// Formats split the way the customize prompt presents them
#[derive(Debug, Clone, PartialEq)]
pub struct FormatMenu {
    pub title: String,
    pub duration: String,
    /// Streams carrying both video and audio
    pub combined: Vec<ParsedFormat>,
    pub video_only: Vec<ParsedFormat>,
    pub audio_only: Vec<ParsedFormat>,
}

impl FormatMenu {
    /// Build the menu from full (not best-only) metadata
    pub fn from_metadata(metadata: &Metadata) -> Self {
        let mut menu = Self {
            title: metadata.title.clone(),
            duration: metadata.duration.clone(),
            combined: Vec::new(),
            video_only: Vec::new(),
            audio_only: Vec::new(),
        };
        for format in metadata.all_formats() {
            match (&format.video, &format.audio) {
                (Some(_), Some(_)) => menu.combined.push(format.clone()),
                (Some(_), None) => menu.video_only.push(format.clone()),
                (None, Some(_)) => menu.audio_only.push(format.clone()),
                (None, None) => {}
            }
        }
        menu
    }

    pub fn is_empty(&self) -> bool {
        self.combined.is_empty() && self.video_only.is_empty() && self.audio_only.is_empty()
    }

    pub fn header(&self) -> String {
        format!("{} ({})", self.title, self.duration)
    }
}

/// What the user picked in the customize prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatPick {
    /// One stream that already carries video and audio
    Combined(String),
    /// Separate video and/or audio streams, merged by the engine
    Custom {
        video: Option<String>,
        audio: Option<String>,
    },
}

/// Confirmed result of the customize prompt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatChoice {
    /// Engine format selector: an id, or `video+audio`
    pub format: String,
    pub conversion: Option<AudioConversion>,
}

impl FormatChoice {
    /// Validate a pick. Conversion is only kept for audio-only picks.
    pub fn new(pick: FormatPick, conversion: Option<AudioConversion>) -> Result<Self, LoaderError> {
        match pick {
            FormatPick::Combined(id) if !id.is_empty() => Ok(Self {
                format: id,
                conversion: None,
            }),
            FormatPick::Combined(_) => Err(LoaderError::InvalidInput(
                "No format selected".to_string(),
            )),
            FormatPick::Custom { video, audio } => {
                let audio_only = video.is_none() && audio.is_some();
                let ids: Vec<String> = video.into_iter().chain(audio).collect();
                if ids.is_empty() {
                    return Err(LoaderError::InvalidInput(
                        "Select a video format, an audio format, or both".to_string(),
                    ));
                }
                Ok(Self {
                    format: ids.join("+"),
                    conversion: if audio_only { conversion } else { None },
                })
            }
        }
    }

    pub fn format_ids(&self) -> impl Iterator<Item = &str> {
        self.format.split('+')
    }

    /// Facets of the chosen streams, looked up in `metadata`
    pub fn summary(&self, metadata: &Metadata) -> FormatSummary {
        let ids: Vec<&str> = self.format_ids().collect();
        let mut summary = FormatSummary::default();
        for format in metadata
            .all_formats()
            .iter()
            .filter(|f| ids.contains(&f.format_id.as_str()))
        {
            if format.video.is_some() {
                summary.video = format.video.clone();
            }
            if format.audio.is_some() {
                summary.audio = format.audio.clone();
            }
        }
        summary
    }
}
