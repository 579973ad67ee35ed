//! Playlist entry selector model

use crate::extractor::models::FlatEntry;
use crate::resolver::DownloadMode;
use crate::utils::error::LoaderError;

/// Checkbox list shown for a playlist; every row starts selected
#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistSelection {
    pub title: String,
    pub url: String,
    entries: Vec<FlatEntry>,
    checked: Vec<bool>,
}

impl PlaylistSelection {
    pub fn new(title: impl Into<String>, url: impl Into<String>, entries: Vec<FlatEntry>) -> Self {
        let checked = vec![true; entries.len()];
        Self {
            title: title.into(),
            url: url.into(),
            entries,
            checked,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_selected(&self, index: usize) -> bool {
        self.checked.get(index).copied().unwrap_or(false)
    }

    /// Flip one row; out-of-range indices are ignored
    pub fn toggle(&mut self, index: usize) {
        if let Some(flag) = self.checked.get_mut(index) {
            *flag = !*flag;
        }
    }

    pub fn set_all(&mut self, selected: bool) {
        self.checked.iter_mut().for_each(|flag| *flag = selected);
    }

    pub fn is_all_selected(&self) -> bool {
        self.checked.iter().all(|flag| *flag)
    }

    pub fn selected_count(&self) -> usize {
        self.checked.iter().filter(|flag| **flag).count()
    }

    pub fn can_confirm(&self) -> bool {
        self.selected_count() > 0
    }

    /// `"3. Title [1:02:03]"`; the duration suffix is omitted when unknown
    pub fn row_label(&self, index: usize) -> Option<String> {
        let entry = self.entries.get(index)?;
        let title = entry.title.as_deref().unwrap_or("Untitled");
        let mut label = format!("{}. {}", index + 1, title);
        if let Some(duration) = entry.duration.filter(|d| d.is_finite() && *d >= 0.0) {
            label.push_str(&format!(" [{}]", clock(duration as u64)));
        }
        Some(label)
    }

    pub fn rows(&self) -> impl Iterator<Item = (usize, &FlatEntry, bool)> {
        self.entries
            .iter()
            .zip(self.checked.iter().copied())
            .enumerate()
            .map(|(i, (entry, checked))| (i, entry, checked))
    }

    pub fn confirm_label(&self, mode: DownloadMode) -> String {
        let count = self.selected_count();
        match mode {
            DownloadMode::VideoBest => format!("Download {} videos", count),
            DownloadMode::AudioBest => format!("Download {} audio files", count),
            DownloadMode::Customize => format!("Customize {} items", count),
        }
    }

    /// Selected entries in playlist order
    pub fn confirm(self) -> Result<Vec<FlatEntry>, LoaderError> {
        if !self.can_confirm() {
            return Err(LoaderError::InvalidInput(
                "Select at least one video".to_string(),
            ));
        }
        Ok(self
            .entries
            .into_iter()
            .zip(self.checked)
            .filter_map(|(entry, checked)| checked.then_some(entry))
            .collect())
    }
}

fn clock(total_secs: u64) -> String {
    let (h, m, s) = (total_secs / 3600, (total_secs % 3600) / 60, total_secs % 60);
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{}:{:02}", m, s)
    }
}
