//! Typed engine options
//!
//! Every task owns its own `DownloadOptions` value; tasks derive theirs from the
//! process-wide defaults by cloning, never by sharing.

use crate::auth::CredentialSource;
use crate::format::{AudioTarget, FormatChoice, QualityLevel};
use crate::resolver::DownloadMode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Engine output template used when nothing else is configured
pub const DEFAULT_OUTPUT_TEMPLATE: &str = "%(title)s.%(ext)s";

/// Literal token in an output template that is replaced by the sanitized title
pub const TITLE_PLACEHOLDER: &str = "TITLE";

const EXT_SUFFIX: &str = ".%(ext)s";
const AUDIO_EXT_SUFFIX: &str = "_audio.%(ext)s";

/// Post-processing steps the engine runs after a download
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "key")]
pub enum Postprocessor {
    /// Re-encode the downloaded audio stream
    ExtractAudio {
        codec: AudioTarget,
        quality: QualityLevel,
    },
}

/// Options passed to every engine call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadOptions {
    /// Output path template, e.g. `/home/me/Downloads/%(title)s.%(ext)s`
    pub output_template: String,
    /// Engine format selector (`bestaudio`, `137+140`, ...). `None` = engine default
    pub format: Option<String>,
    /// Treat the URL as a single item even if it is part of a playlist
    pub no_playlist: bool,
    /// Shallow playlist enumeration without per-item format resolution
    pub flat: bool,
    pub postprocessors: Vec<Postprocessor>,
    pub cookies_from_browser: Option<CredentialSource>,
    pub restrict_filenames: bool,
    pub windows_filenames: bool,
    pub no_check_certificate: bool,
    pub geo_bypass: bool,
    pub overwrites: bool,
    pub live_from_start: bool,
    pub age_limit: Option<u8>,
    pub source_address: Option<String>,
    /// Skip YouTube DASH/HLS manifests during extraction
    pub skip_youtube_manifests: bool,
    pub ffmpeg_location: Option<PathBuf>,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            output_template: DEFAULT_OUTPUT_TEMPLATE.to_string(),
            format: None,
            no_playlist: false,
            flat: false,
            postprocessors: Vec::new(),
            cookies_from_browser: None,
            restrict_filenames: true,
            windows_filenames: true,
            no_check_certificate: true,
            geo_bypass: true,
            overwrites: true,
            live_from_start: true,
            age_limit: Some(100),
            source_address: Some("0.0.0.0".to_string()),
            skip_youtube_manifests: true,
            ffmpeg_location: None,
        }
    }
}

impl DownloadOptions {
    /// Per-task copy for one of the quick download modes, writing into `destination`.
    ///
    /// The template is always rebuilt from the default file name so a template that was
    /// already joined to a directory is never joined twice.
    pub fn for_mode(&self, destination: &Path, mode: DownloadMode) -> Self {
        let mut options = self.clone();
        options.no_playlist = true;
        options.flat = false;
        options.postprocessors.clear();
        options.format = None;

        let file_name = Path::new(&self.output_template)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| DEFAULT_OUTPUT_TEMPLATE.to_string());
        options.output_template = destination.join(file_name).to_string_lossy().into_owned();

        if mode == DownloadMode::AudioBest {
            options.format = Some("bestaudio".to_string());
            options.output_template = options.output_template.replace(EXT_SUFFIX, AUDIO_EXT_SUFFIX);
        }
        options
    }

    /// Apply a confirmed customize choice
    pub fn with_choice(mut self, choice: &FormatChoice) -> Self {
        self.format = Some(choice.format.clone());
        self.postprocessors = choice
            .conversion
            .map(|c| Postprocessor::ExtractAudio {
                codec: c.target,
                quality: c.quality,
            })
            .into_iter()
            .collect();
        self
    }

    /// Options for the shallow playlist/single classification probe
    pub fn flat_probe(&self) -> Self {
        let mut options = self.clone();
        options.flat = true;
        options.no_playlist = false;
        options
    }

    /// Options for full extraction of one item (never expands playlists)
    pub fn single_item(&self) -> Self {
        let mut options = self.clone();
        options.no_playlist = true;
        options.flat = false;
        options
    }

    /// Substitute the [`TITLE_PLACEHOLDER`] token in the file-name part of the template
    /// with an already-sanitized title. Directory components are left alone.
    pub fn resolve_title(&mut self, sanitized_title: &str) -> bool {
        let template = Path::new(&self.output_template);
        let Some(file_name) = template.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            return false;
        };
        if !file_name.contains(TITLE_PLACEHOLDER) {
            return false;
        }
        let resolved = file_name.replace(TITLE_PLACEHOLDER, sanitized_title);
        self.output_template = match template.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => {
                dir.join(resolved).to_string_lossy().into_owned()
            }
            _ => resolved,
        };
        true
    }

    /// Command-line flags for the yt-dlp executable
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec!["-o".to_string(), self.output_template.clone()];

        if let Some(format) = &self.format {
            args.push("-f".to_string());
            args.push(format.clone());
        }
        args.push(if self.no_playlist { "--no-playlist" } else { "--yes-playlist" }.to_string());
        if self.flat {
            args.push("--flat-playlist".to_string());
        }
        for pp in &self.postprocessors {
            match pp {
                Postprocessor::ExtractAudio { codec, quality } => {
                    args.push("--extract-audio".to_string());
                    args.push("--audio-format".to_string());
                    args.push(codec.codec().to_string());
                    args.push("--audio-quality".to_string());
                    args.push(quality.engine_value().to_string());
                }
            }
        }
        if let Some(browser) = self.cookies_from_browser {
            args.push("--cookies-from-browser".to_string());
            args.push(browser.to_string());
        }

        let switches = [
            (self.restrict_filenames, "--restrict-filenames"),
            (self.windows_filenames, "--windows-filenames"),
            (self.no_check_certificate, "--no-check-certificates"),
            (self.geo_bypass, "--geo-bypass"),
            (self.overwrites, "--force-overwrites"),
            (self.live_from_start, "--live-from-start"),
        ];
        args.extend(
            switches
                .iter()
                .filter(|(on, _)| *on)
                .map(|(_, flag)| flag.to_string()),
        );

        if let Some(age) = self.age_limit {
            args.push("--age-limit".to_string());
            args.push(age.to_string());
        }
        if let Some(address) = &self.source_address {
            args.push("--source-address".to_string());
            args.push(address.clone());
        }
        if self.skip_youtube_manifests {
            args.push("--extractor-args".to_string());
            args.push("youtube:skip=dash,hls".to_string());
        }
        if let Some(ffmpeg) = &self.ffmpeg_location {
            args.push("--ffmpeg-location".to_string());
            args.push(ffmpeg.to_string_lossy().into_owned());
        }
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{AudioConversion, FormatPick};

    #[test]
    fn video_mode_joins_destination_and_disables_playlists() {
        let opts = DownloadOptions::default().for_mode(Path::new("/data/media"), DownloadMode::VideoBest);
        assert!(opts.no_playlist);
        assert_eq!(
            opts.output_template,
            Path::new("/data/media").join(DEFAULT_OUTPUT_TEMPLATE).to_string_lossy()
        );
        assert!(opts.format.is_none());
    }

    #[test]
    fn audio_mode_selects_bestaudio_and_suffixes_file() {
        let opts = DownloadOptions::default().for_mode(Path::new("/m"), DownloadMode::AudioBest);
        assert_eq!(opts.format.as_deref(), Some("bestaudio"));
        assert!(opts.output_template.ends_with("%(title)s_audio.%(ext)s"));
    }

    #[test]
    fn tasks_get_independent_copies() {
        let base = DownloadOptions::default();
        let mut a = base.for_mode(Path::new("/a"), DownloadMode::VideoBest);
        let b = base.for_mode(Path::new("/b"), DownloadMode::VideoBest);
        a.format = Some("18".into());
        assert!(b.format.is_none());
        assert!(base.format.is_none());
    }

    #[test]
    fn rederiving_from_a_joined_template_does_not_nest_directories() {
        let first = DownloadOptions::default().for_mode(Path::new("/a"), DownloadMode::VideoBest);
        let second = first.for_mode(Path::new("/b"), DownloadMode::VideoBest);
        assert_eq!(
            second.output_template,
            Path::new("/b").join(DEFAULT_OUTPUT_TEMPLATE).to_string_lossy()
        );
    }

    #[test]
    fn title_placeholder_is_substituted() {
        let mut opts = DownloadOptions {
            output_template: "/m/TITLE.%(ext)s".into(),
            ..Default::default()
        };
        assert!(opts.resolve_title("My_Song"));
        assert_eq!(opts.output_template, "/m/My_Song.%(ext)s");

        let mut plain = DownloadOptions::default();
        assert!(!plain.resolve_title("x"));
        assert_eq!(plain.output_template, DEFAULT_OUTPUT_TEMPLATE);
    }

    #[test]
    fn title_in_the_destination_directory_is_kept() {
        let mut opts = DownloadOptions::default()
            .for_mode(Path::new("/media/TITLE_CARDS"), DownloadMode::VideoBest);
        assert!(!opts.resolve_title("Clip"));
        assert_eq!(
            opts.output_template,
            Path::new("/media/TITLE_CARDS").join(DEFAULT_OUTPUT_TEMPLATE).to_string_lossy()
        );

        let mut named = DownloadOptions {
            output_template: Path::new("/media/TITLE_CARDS")
                .join("TITLE.%(ext)s")
                .to_string_lossy()
                .into_owned(),
            ..Default::default()
        };
        assert!(named.resolve_title("Clip"));
        assert_eq!(
            named.output_template,
            Path::new("/media/TITLE_CARDS").join("Clip.%(ext)s").to_string_lossy()
        );
    }

    #[test]
    fn choice_sets_format_and_conversion() {
        let choice = FormatChoice::new(
            FormatPick::Custom {
                video: None,
                audio: Some("251".into()),
            },
            Some(AudioConversion {
                target: AudioTarget::Mp3,
                quality: QualityLevel::new(10).unwrap(),
            }),
        )
        .unwrap();
        let opts = DownloadOptions::default().with_choice(&choice);
        let args = opts.to_args();
        assert!(args.windows(2).any(|w| w == ["-f", "251"]));
        assert!(args.windows(2).any(|w| w == ["--audio-format", "mp3"]));
        assert!(args.windows(2).any(|w| w == ["--audio-quality", "0"]));
    }

    #[test]
    fn args_cover_switches_and_cookies() {
        let mut opts = DownloadOptions::default().single_item();
        opts.cookies_from_browser = Some(CredentialSource::Firefox);
        let args = opts.to_args();
        assert!(args.contains(&"--no-playlist".to_string()));
        assert!(args.contains(&"--restrict-filenames".to_string()));
        assert!(args.windows(2).any(|w| w == ["--cookies-from-browser", "firefox"]));
        assert!(!args.contains(&"--flat-playlist".to_string()));

        let probe = DownloadOptions::default().flat_probe().to_args();
        assert!(probe.contains(&"--flat-playlist".to_string()));
        assert!(probe.contains(&"--yes-playlist".to_string()));
    }
}
