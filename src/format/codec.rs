//! Codec token → display label table

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Mapping from short codec tokens (`avc1`, `opus`, ...) to display labels.
///
/// Kept as data so deployments can adjust labels from the settings file. The
/// `mp4v` entry keeps its historical `H263` label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CodecTable {
    labels: HashMap<String, String>,
}

const DEFAULT_LABELS: [(&str, &str); 9] = [
    ("mp4v", "H263"),
    ("av01", "AV1"),
    ("avc1", "H264/AVC"),
    ("hev1", "H265/HEVC"),
    ("vp9", "VP9"),
    ("vp09", "VP9"),
    ("vp8", "VP8"),
    ("mp4a", "AAC"),
    ("opus", "Opus"),
];

impl Default for CodecTable {
    fn default() -> Self {
        Self {
            labels: DEFAULT_LABELS
                .iter()
                .map(|(token, label)| (token.to_string(), label.to_string()))
                .collect(),
        }
    }
}

impl CodecTable {
    /// Empty table: every codec passes through unmapped
    pub fn empty() -> Self {
        Self {
            labels: HashMap::new(),
        }
    }

    /// Default table with `overrides` layered on top (keys are lower-cased)
    pub fn with_overrides(overrides: &HashMap<String, String>) -> Self {
        let mut table = Self::default();
        for (token, label) in overrides {
            table.insert(token, label);
        }
        table
    }

    pub fn insert(&mut self, token: &str, label: &str) {
        self.labels.insert(token.to_lowercase(), label.to_string());
    }

    /// Display label for a raw codec string such as `avc1.64001F`.
    ///
    /// The lookup key is the lower-cased text before the first `.`; unknown keys are
    /// returned as that lower-cased token.
    pub fn label(&self, codec: &str) -> String {
        let token = codec.split('.').next().unwrap_or_default().to_lowercase();
        self.labels.get(&token).cloned().unwrap_or(token)
    }
}
