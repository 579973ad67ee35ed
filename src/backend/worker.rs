//! Background workers
//!
//! Each engine call runs on its own tokio task. Workers never touch the scheduler; they
//! report through [`WorkerMessage`]s and always finish with [`WorkerMessage::Done`].

use super::messages::{Operation, WorkerMessage};
use super::prompt::{PlaylistDecision, Prompter};
use crate::auth::{self, CredentialSource};
use crate::downloader::progress::{DownloadEvent, EngineEvent};
use crate::downloader::DownloadOptions;
use crate::extractor::MediaEngine;
use crate::format::{parse_metadata, CodecTable, FormatMenu, Metadata};
use crate::queue::{DownloadRequest, DownloadTask, ExtractRequest, TaskId};
use crate::resolver::{self, entry_url, DownloadMode, PlaylistSelection, Resolution};
use crate::utils::error::LoaderError;
use futures::FutureExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub const STATUS_CHECKING: &str = "Checking URL...";
pub const STATUS_PLAYLIST: &str = "Extracting playlist info...";
pub const STATUS_FORMATS: &str = "Extracting formats...";

/// Everything a worker needs, cheap to clone
#[derive(Clone)]
pub struct WorkerContext {
    pub engine: Arc<dyn MediaEngine>,
    pub prompter: Arc<dyn Prompter>,
    pub codecs: Arc<CodecTable>,
    pub probe_timeout: Duration,
    pub tx: mpsc::UnboundedSender<WorkerMessage>,
}

impl WorkerContext {
    fn send(&self, message: WorkerMessage) {
        if self.tx.send(message).is_err() {
            debug!("Backend stopped, dropping worker message");
        }
    }

    fn notice(&self, operation: Operation, err: &LoaderError) {
        self.send(WorkerMessage::Notice {
            operation,
            message: err.to_string(),
        });
    }

    fn status(&self, message: &str) {
        self.send(WorkerMessage::Status(message.to_string()));
    }

    /// Extract full metadata for `url`, escalating to a browser login when needed
    async fn extract_metadata(
        &self,
        task_id: Option<TaskId>,
        url: &str,
        options: &DownloadOptions,
        best_only: bool,
    ) -> Result<(Metadata, Option<CredentialSource>), LoaderError> {
        let engine = self.engine.clone();
        let target = url.to_string();
        let escalated = auth::with_escalation(self.prompter.as_ref(), url, options, move |opts| {
            let engine = engine.clone();
            let target = target.clone();
            async move { engine.extract(&target, &opts).await }.boxed()
        })
        .await?;

        if let Some(source) = escalated.promoted {
            self.send(WorkerMessage::CredentialPromoted {
                task_id,
                url: url.to_string(),
                source,
            });
        }
        Ok((
            parse_metadata(&escalated.value, best_only, &self.codecs),
            escalated.promoted,
        ))
    }
}

/// Resolve and queue submitted URLs, one after another
pub async fn run_submission(
    ctx: WorkerContext,
    urls: Vec<String>,
    destination: PathBuf,
    mode: DownloadMode,
    mut defaults: DownloadOptions,
) {
    for url in urls {
        if let Err(e) = submit_one(&ctx, &url, &destination, mode, &mut defaults).await {
            warn!("Submission of {} failed: {}", url, e);
            ctx.notice(Operation::CheckingUrl, &e);
        }
    }
    ctx.status(crate::queue::scheduler::STATUS_READY);
    ctx.send(WorkerMessage::Done);
}

async fn submit_one(
    ctx: &WorkerContext,
    url: &str,
    destination: &Path,
    mode: DownloadMode,
    defaults: &mut DownloadOptions,
) -> Result<(), LoaderError> {
    ctx.status(STATUS_CHECKING);
    let resolution =
        resolver::classify(ctx.engine.as_ref(), url, defaults, ctx.probe_timeout).await?;

    match resolution {
        Resolution::Single { url } => match mode {
            DownloadMode::Customize => {
                ctx.status(STATUS_FORMATS);
                customize_each(ctx, &[url], destination, defaults).await;
            }
            _ => {
                let options = defaults.for_mode(destination, mode);
                ctx.send(WorkerMessage::Enqueue(DownloadTask::new(url, destination, options)));
            }
        },
        Resolution::Playlist {
            title,
            url: playlist_url,
            entries,
        } => {
            ctx.status(STATUS_PLAYLIST);
            let selection = PlaylistSelection::new(title, playlist_url.clone(), entries);
            let Some(decision) = ctx.prompter.select_playlist_entries(selection, mode).await else {
                info!("Playlist selection for {} dismissed", playlist_url);
                return Ok(());
            };

            let urls: Vec<String> = decision
                .entries()
                .iter()
                .map(|entry| entry_url(entry, &playlist_url))
                .collect();
            info!("Queueing {} playlist entries from {}", urls.len(), playlist_url);

            match decision {
                PlaylistDecision::Download(_) => {
                    let quick = if mode == DownloadMode::AudioBest {
                        DownloadMode::AudioBest
                    } else {
                        DownloadMode::VideoBest
                    };
                    for entry in urls {
                        let options = defaults.for_mode(destination, quick);
                        ctx.send(WorkerMessage::Enqueue(DownloadTask::new(
                            entry,
                            destination,
                            options,
                        )));
                    }
                }
                PlaylistDecision::CustomizeSame(_) => {
                    ctx.status(STATUS_FORMATS);
                    customize_same(ctx, &urls, destination, defaults).await?;
                }
                PlaylistDecision::CustomizeEach(_) => {
                    ctx.status(STATUS_FORMATS);
                    customize_each(ctx, &urls, destination, defaults).await;
                }
            }
        }
    }
    Ok(())
}

/// Prompt for a format for one URL. `Ok(None)` when the prompt was dismissed.
async fn customize_one(
    ctx: &WorkerContext,
    url: &str,
    destination: &Path,
    defaults: &mut DownloadOptions,
) -> Result<Option<(DownloadTask, crate::format::FormatChoice)>, LoaderError> {
    let mut options = defaults.for_mode(destination, DownloadMode::Customize);
    let (metadata, promoted) = ctx.extract_metadata(None, url, &options, false).await?;
    if let Some(source) = promoted {
        options.cookies_from_browser = Some(source);
        defaults.cookies_from_browser = Some(source);
    }

    let menu = FormatMenu::from_metadata(&metadata);
    if menu.is_empty() {
        return Err(LoaderError::Extraction(format!(
            "No downloadable formats found for {}",
            url
        )));
    }

    let Some(choice) = ctx.prompter.choose_format(&menu).await else {
        info!("Format selection for {} dismissed", url);
        return Ok(None);
    };

    let summary = choice.summary(&metadata);
    let task = DownloadTask::with_info(
        url,
        destination,
        options.with_choice(&choice),
        &metadata,
        summary,
    );
    Ok(Some((task, choice)))
}

/// One prompt per URL; a failure or dismissal moves on to the next URL
async fn customize_each(
    ctx: &WorkerContext,
    urls: &[String],
    destination: &Path,
    defaults: &mut DownloadOptions,
) {
    for url in urls {
        match customize_one(ctx, url, destination, defaults).await {
            Ok(Some((task, _))) => ctx.send(WorkerMessage::Enqueue(task)),
            Ok(None) => {}
            Err(e) => {
                warn!("Could not customize {}: {}", url, e);
                ctx.notice(Operation::ExtractingInfo, &e);
            }
        }
    }
}

/// Pick from the first URL; every other URL reuses the choice and is extracted later
async fn customize_same(
    ctx: &WorkerContext,
    urls: &[String],
    destination: &Path,
    defaults: &mut DownloadOptions,
) -> Result<(), LoaderError> {
    let Some((first, rest)) = urls.split_first() else {
        return Ok(());
    };
    let Some((task, choice)) = customize_one(ctx, first, destination, defaults).await? else {
        return Ok(());
    };
    ctx.send(WorkerMessage::Enqueue(task));

    for url in rest {
        let options = defaults
            .for_mode(destination, DownloadMode::Customize)
            .with_choice(&choice);
        ctx.send(WorkerMessage::Enqueue(DownloadTask::new(
            url.clone(),
            destination,
            options,
        )));
    }
    Ok(())
}

/// Best-format extraction for a queued task
pub async fn run_extraction(ctx: WorkerContext, request: ExtractRequest) {
    let result = ctx
        .extract_metadata(Some(request.task_id), &request.url, &request.options, true)
        .await
        .map(|(metadata, _)| metadata);
    if let Err(e) = &result {
        ctx.notice(Operation::ExtractingInfo, e);
    }
    ctx.send(WorkerMessage::Extracted {
        task_id: request.task_id,
        result,
    });
    ctx.send(WorkerMessage::Done);
}

/// Download one task, forwarding engine events in order.
///
/// A terminal download event is synthesized from the engine's return value when the
/// engine did not emit one itself.
pub async fn run_download(ctx: WorkerContext, request: DownloadRequest) {
    let task_id = request.task_id;
    let terminal_sent = Arc::new(AtomicBool::new(false));

    let engine = ctx.engine.clone();
    let tx = ctx.tx.clone();
    let url = request.url.clone();
    let sent = terminal_sent.clone();
    let result = auth::with_escalation(
        ctx.prompter.as_ref(),
        &request.url,
        &request.options,
        move |opts| {
            let engine = engine.clone();
            let tx = tx.clone();
            let url = url.clone();
            let sent = sent.clone();
            async move {
                let (events_tx, mut events_rx) = mpsc::unbounded_channel();
                let forward = async {
                    while let Some(event) = events_rx.recv().await {
                        if let EngineEvent::Download(DownloadEvent::Failed(message)) = &event {
                            if auth::is_access_denied(message) {
                                continue;
                            }
                        }
                        if matches!(&event, EngineEvent::Download(e) if e.is_terminal()) {
                            sent.store(true, Ordering::SeqCst);
                        }
                        let _ = tx.send(WorkerMessage::Engine { task_id, event });
                    }
                };
                let (result, ()) = tokio::join!(engine.download(&url, &opts, events_tx), forward);
                result
            }
            .boxed()
        },
    )
    .await;

    let fallback = match result {
        Ok(escalated) => {
            if let Some(source) = escalated.promoted {
                ctx.send(WorkerMessage::CredentialPromoted {
                    task_id: Some(task_id),
                    url: request.url.clone(),
                    source,
                });
            }
            DownloadEvent::Finished
        }
        Err(e) => {
            ctx.notice(Operation::Downloading, &e);
            DownloadEvent::Failed(e.to_string())
        }
    };

    if !terminal_sent.load(Ordering::SeqCst) {
        ctx.send(WorkerMessage::Engine {
            task_id,
            event: EngineEvent::Download(fallback),
        });
    }
    ctx.send(WorkerMessage::Retire(task_id));
    ctx.send(WorkerMessage::Done);
}
