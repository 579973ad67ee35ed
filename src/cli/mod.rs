//! Terminal front-end: prompts on stdin, events on stdout

use crate::auth::CredentialSource;
use crate::backend::{BackendEvent, PlaylistDecision, Prompter};
use crate::format::{AudioConversion, AudioTarget, FormatChoice, FormatMenu, FormatPick, QualityLevel};
use crate::queue::{QueueEvent, TaskId};
use crate::resolver::{DownloadMode, PlaylistSelection};
use crate::utils::error::LoaderError;
use async_trait::async_trait;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;
use tracing::debug;

/// Answers backend prompts on the terminal
pub struct TerminalPrompter {
    input: Mutex<Lines<BufReader<Stdin>>>,
    /// Answer for every login prompt, skipping the question
    browser: Option<CredentialSource>,
    /// Queue every playlist entry without asking
    select_all: bool,
}

impl TerminalPrompter {
    pub fn new(browser: Option<CredentialSource>, select_all: bool) -> Self {
        Self {
            input: Mutex::new(BufReader::new(tokio::io::stdin()).lines()),
            browser,
            select_all,
        }
    }

    /// Print `question` and read one trimmed line; `None` on end of input
    async fn ask(&self, question: &str) -> Option<String> {
        let mut input = self.input.lock().await;
        print!("{}", question);
        let _ = std::io::stdout().flush();
        match input.next_line().await {
            Ok(Some(line)) => Some(line.trim().to_string()),
            Ok(None) => None,
            Err(e) => {
                debug!("stdin read failed: {}", e);
                None
            }
        }
    }
}

#[async_trait]
impl Prompter for TerminalPrompter {
    async fn choose_credential_source(&self, url: &str) -> Option<CredentialSource> {
        if let Some(browser) = self.browser {
            return Some(browser);
        }
        println!("{} requires a login. Which browser are you logged in with?", url);
        for (i, source) in CredentialSource::ALL.iter().enumerate() {
            println!("  {}. {}", i + 1, source);
        }
        loop {
            let answer = self.ask("Browser (empty to cancel): ").await?;
            if answer.is_empty() {
                return None;
            }
            match parse_browser(&answer) {
                Some(source) => return Some(source),
                None => println!("Unknown browser: {}", answer),
            }
        }
    }

    async fn select_playlist_entries(
        &self,
        mut selection: PlaylistSelection,
        mode: DownloadMode,
    ) -> Option<PlaylistDecision> {
        println!("Playlist: {} ({} videos)", selection.title, selection.len());
        for index in 0..selection.len() {
            if let Some(label) = selection.row_label(index) {
                println!("  {}", label);
            }
        }

        if !self.select_all {
            loop {
                let answer = self
                    .ask("Entries to skip (e.g. 2,4-5; empty keeps all, q cancels): ")
                    .await?;
                if answer.eq_ignore_ascii_case("q") {
                    return None;
                }
                match parse_index_list(&answer, selection.len()) {
                    Ok(skipped) => {
                        skipped.into_iter().for_each(|i| selection.toggle(i));
                        break;
                    }
                    Err(e) => println!("{}", e),
                }
            }
        }

        if !selection.can_confirm() {
            println!("Nothing selected");
            return None;
        }
        println!("{}", selection.confirm_label(mode));

        let same = if mode == DownloadMode::Customize {
            let answer = self
                .ask("Customize [s]ame format for all or [e]ach item? [s]: ")
                .await?;
            Some(!answer.to_lowercase().starts_with('e'))
        } else {
            None
        };

        let entries = selection.confirm().ok()?;
        Some(match same {
            None => PlaylistDecision::Download(entries),
            Some(true) => PlaylistDecision::CustomizeSame(entries),
            Some(false) => PlaylistDecision::CustomizeEach(entries),
        })
    }

    async fn choose_format(&self, menu: &FormatMenu) -> Option<FormatChoice> {
        println!("{}", menu.header());
        print_section("Video + audio", 'c', &menu.combined);
        print_section("Video only", 'v', &menu.video_only);
        print_section("Audio only", 'a', &menu.audio_only);

        loop {
            let answer = self
                .ask("Format (e.g. c1, v2+a1, a3; empty to cancel): ")
                .await?;
            if answer.is_empty() {
                return None;
            }
            let pick = match parse_format_input(&answer, menu) {
                Ok(pick) => pick,
                Err(e) => {
                    println!("{}", e);
                    continue;
                }
            };

            let audio_only = matches!(&pick, FormatPick::Custom { video: None, audio: Some(_) });
            let conversion = if audio_only {
                self.ask_conversion().await
            } else {
                None
            };

            match FormatChoice::new(pick, conversion) {
                Ok(choice) => return Some(choice),
                Err(e) => println!("{}", e),
            }
        }
    }
}

impl TerminalPrompter {
    async fn ask_conversion(&self) -> Option<AudioConversion> {
        let codecs: Vec<&str> = AudioTarget::ALL.iter().map(|t| t.codec()).collect();
        let answer = self
            .ask(&format!(
                "Convert audio to ({}; empty keeps the original): ",
                codecs.join(", ")
            ))
            .await?;
        let target = AudioTarget::from_codec(&answer)?;

        let quality = self
            .ask("Quality 0-10, 10 is best [5]: ")
            .await
            .and_then(|q| q.parse::<u8>().ok())
            .and_then(|q| QualityLevel::new(q).ok())
            .unwrap_or_default();
        println!("Converting to {} at quality {}", target.label(), quality);
        Some(AudioConversion { target, quality })
    }
}

fn print_section(title: &str, prefix: char, formats: &[crate::format::ParsedFormat]) {
    if formats.is_empty() {
        return;
    }
    println!("{}:", title);
    for (i, format) in formats.iter().enumerate() {
        println!(
            "  {}{:<3} [{}] {}",
            prefix,
            i + 1,
            format.format_id,
            format.label().replace('\n', " | ")
        );
    }
}

/// Browser by menu number (1-based) or name
pub fn parse_browser(input: &str) -> Option<CredentialSource> {
    if let Ok(n) = input.trim().parse::<usize>() {
        return n
            .checked_sub(1)
            .and_then(|i| CredentialSource::ALL.get(i).copied());
    }
    input.parse().ok()
}

/// `"2,4-5"` → `[1, 3, 4]` (1-based input, 0-based output, sorted, deduplicated)
pub fn parse_index_list(input: &str, len: usize) -> Result<Vec<usize>, LoaderError> {
    let mut indices = Vec::new();
    for part in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (start, end) = match part.split_once('-') {
            Some((a, b)) => (parse_position(a, len)?, parse_position(b, len)?),
            None => {
                let n = parse_position(part, len)?;
                (n, n)
            }
        };
        if start > end {
            return Err(LoaderError::InvalidInput(format!("Invalid range: {}", part)));
        }
        indices.extend(start..=end);
    }
    indices.sort_unstable();
    indices.dedup();
    Ok(indices)
}

fn parse_position(text: &str, len: usize) -> Result<usize, LoaderError> {
    let n: usize = text
        .trim()
        .parse()
        .map_err(|_| LoaderError::InvalidInput(format!("Not a number: {}", text.trim())))?;
    if n == 0 || n > len {
        return Err(LoaderError::InvalidInput(format!(
            "{} is out of range (1-{})",
            n, len
        )));
    }
    Ok(n - 1)
}

/// `"c2"` → combined #2, `"v1+a3"` → video #1 with audio #3, `"a2"` → audio #2
pub fn parse_format_input(input: &str, menu: &FormatMenu) -> Result<FormatPick, LoaderError> {
    let mut video = None;
    let mut audio = None;

    for token in input.split('+').map(str::trim) {
        let mut chars = token.chars();
        let kind = chars.next().map(|c| c.to_ascii_lowercase());
        let list = match kind {
            Some('c') => &menu.combined,
            Some('v') => &menu.video_only,
            Some('a') => &menu.audio_only,
            _ => {
                return Err(LoaderError::InvalidInput(format!(
                    "Unknown format: {}",
                    token
                )))
            }
        };
        let index = parse_position(chars.as_str(), list.len())?;
        let id = list[index].format_id.clone();

        match kind {
            Some('c') if input.contains('+') => {
                return Err(LoaderError::InvalidInput(
                    "A combined format cannot be merged with another".to_string(),
                ))
            }
            Some('c') => return Ok(FormatPick::Combined(id)),
            Some('v') => video = Some(id),
            _ => audio = Some(id),
        }
    }
    Ok(FormatPick::Custom { video, audio })
}

fn short_id(id: &TaskId) -> String {
    id.simple().to_string()[..8].to_string()
}

/// One printable line per backend event; `None` for events that print nothing
pub fn render_event(event: &BackendEvent) -> Option<String> {
    match event {
        BackendEvent::Queue(queue_event) => Some(match queue_event {
            QueueEvent::TaskAdded { task, .. } => {
                format!("+ [{}] {}", short_id(&task.id), task.display_name())
            }
            QueueEvent::TaskStateChanged {
                task_id,
                name,
                state,
                status,
                ..
            } => format!("[{}] {} ({}): {}", short_id(task_id), name, state, status),
            QueueEvent::TaskProgress {
                task_id,
                progress,
                status,
                ..
            } => format!("[{}] {:>3}% {}", short_id(task_id), progress, status),
            QueueEvent::TaskRemoved { task_id, state, .. } => {
                format!("- [{}] removed ({})", short_id(task_id), state)
            }
            QueueEvent::AppStatus { message, .. } => format!("== {}", message),
        }),
        BackendEvent::Notice { operation, message } => {
            Some(format!("! Error while {}: {}", operation, message))
        }
        BackendEvent::Login { url, source } => {
            Some(format!("Logged in with {} cookies for {}", source, url))
        }
        BackendEvent::Idle => None,
    }
}
