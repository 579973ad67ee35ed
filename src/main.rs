//! tubequeue - serial media download queue on top of yt-dlp

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tubequeue::auth::CredentialSource;
use tubequeue::backend::{BackendCommand, BackendConfig, BackendEvent};
use tubequeue::cli::{render_event, TerminalPrompter};
use tubequeue::{spawn_backend, AppSettings, DownloadMode, YtDlpEngine};

#[derive(Parser)]
#[command(name = "tubequeue", version, about = "Queue media downloads through yt-dlp")]
struct Args {
    /// Media or playlist URLs
    #[arg(required = true)]
    urls: Vec<String>,

    /// Download the best audio stream only
    #[arg(long, conflicts_with = "customize")]
    audio: bool,

    /// Pick formats (and an audio conversion) per item
    #[arg(long)]
    customize: bool,

    /// Download directory (remembered for next time)
    #[arg(long)]
    dir: Option<PathBuf>,

    /// Browser to take cookies from when a video needs a login
    #[arg(long)]
    browser: Option<CredentialSource>,

    /// Queue every playlist entry without asking
    #[arg(long)]
    select_all: bool,

    /// Path to the yt-dlp executable
    #[arg(long)]
    ytdlp: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let mut settings = AppSettings::load().unwrap_or_else(|e| {
        warn!("Could not load settings, using defaults: {}", e);
        AppSettings::default()
    });
    if let Some(dir) = args.dir {
        settings.download_location = dir;
        if let Err(e) = settings.save() {
            warn!("Could not remember download location: {}", e);
        }
    }

    let ytdlp_path = args.ytdlp.or_else(|| settings.ytdlp_path.clone());
    let engine = YtDlpEngine::new(ytdlp_path.as_deref()).context("yt-dlp is required")?;
    match engine.version().await {
        Ok(version) => info!("yt-dlp version {}", version),
        Err(e) => warn!("Could not query yt-dlp version: {}", e),
    }

    let mode = if args.audio {
        DownloadMode::AudioBest
    } else if args.customize {
        DownloadMode::Customize
    } else {
        DownloadMode::VideoBest
    };

    let prompter = TerminalPrompter::new(args.browser, args.select_all);
    let mut backend = spawn_backend(
        BackendConfig::from_settings(&settings),
        Arc::new(engine),
        Arc::new(prompter),
    );

    backend
        .commands
        .send(BackendCommand::Submit {
            urls: args.urls,
            destination: settings.download_location.clone(),
            mode,
        })
        .await
        .context("backend stopped before accepting the URLs")?;

    let mut failures = 0usize;
    while let Some(event) = backend.events.recv().await {
        if matches!(event, BackendEvent::Notice { .. }) {
            failures += 1;
        }
        if let Some(line) = render_event(&event) {
            println!("{}", line);
        }
        if matches!(event, BackendEvent::Idle) {
            break;
        }
    }

    backend.shutdown().await;
    if failures > 0 {
        warn!("{} problem(s) reported", failures);
    }
    Ok(())
}
