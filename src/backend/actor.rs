use super::messages::{BackendCommand, BackendEvent, Operation, WorkerMessage};
use super::prompt::Prompter;
use super::worker::{self, WorkerContext};
use crate::downloader::progress::EngineEvent;
use crate::downloader::DownloadOptions;
use crate::extractor::MediaEngine;
use crate::format::CodecTable;
use crate::queue::{SchedulerState, TickAction};
use crate::resolver::validate_submission;
use crate::utils::config::{AppSettings, DEFAULT_TICK_INTERVAL_MS};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Tunables for the backend loop
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub tick_interval: Duration,
    pub probe_timeout: Duration,
    pub codecs: CodecTable,
    /// Process-wide defaults every task's options are cloned from
    pub defaults: DownloadOptions,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self::from_settings(&AppSettings::default())
    }
}

impl BackendConfig {
    pub fn from_settings(settings: &AppSettings) -> Self {
        let defaults = DownloadOptions {
            ffmpeg_location: settings.ffmpeg_location.clone(),
            ..DownloadOptions::default()
        };
        Self {
            tick_interval: settings.tick_interval(),
            probe_timeout: settings.probe_timeout(),
            codecs: settings.codec_table(),
            defaults,
        }
    }
}

/// Single owner of the queue. Ticks, front-end commands and worker results are all
/// handled on this one task.
pub struct BackendActor {
    receiver: mpsc::Receiver<BackendCommand>,
    sender: mpsc::Sender<BackendEvent>,
    worker_rx: mpsc::UnboundedReceiver<WorkerMessage>,
    context: WorkerContext,
    state: SchedulerState,
    defaults: DownloadOptions,
    tick_interval: Duration,
    /// Workers that have not reported `Done` yet
    outstanding: usize,
    /// Set by a submission, cleared once `Idle` was reported
    busy: bool,
}

impl BackendActor {
    pub fn new(
        config: BackendConfig,
        engine: Arc<dyn MediaEngine>,
        prompter: Arc<dyn Prompter>,
        receiver: mpsc::Receiver<BackendCommand>,
        sender: mpsc::Sender<BackendEvent>,
    ) -> Self {
        let (worker_tx, worker_rx) = mpsc::unbounded_channel();
        let context = WorkerContext {
            engine,
            prompter,
            codecs: Arc::new(config.codecs),
            probe_timeout: config.probe_timeout,
            tx: worker_tx,
        };
        let tick_interval = if config.tick_interval.is_zero() {
            warn!("Zero tick interval, using {}ms", DEFAULT_TICK_INTERVAL_MS);
            Duration::from_millis(DEFAULT_TICK_INTERVAL_MS)
        } else {
            config.tick_interval
        };
        Self {
            receiver,
            sender,
            worker_rx,
            context,
            state: SchedulerState::new(),
            defaults: config.defaults,
            tick_interval,
            outstanding: 0,
            busy: false,
        }
    }

    pub async fn run(mut self) {
        info!(
            "BackendActor started (engine: {}, tick: {:?})",
            self.context.engine.id(),
            self.tick_interval
        );

        let mut ticker = tokio::time::interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                command = self.receiver.recv() => match command {
                    Some(BackendCommand::Shutdown) | None => {
                        info!("BackendActor shutting down");
                        break;
                    }
                    Some(command) => self.handle_command(command).await,
                },
                Some(message) = self.worker_rx.recv() => self.handle_worker_message(message).await,
                _ = ticker.tick() => self.on_tick(),
            }

            self.flush().await;
        }
    }

    async fn handle_command(&mut self, command: BackendCommand) {
        match command {
            BackendCommand::Submit {
                urls,
                destination,
                mode,
            } => {
                self.busy = true;
                let mut accepted = Vec::new();
                let mut target = None;
                for url in urls {
                    match validate_submission(&url, &destination) {
                        Ok(absolute) => {
                            target = Some(absolute);
                            accepted.push(url.trim().to_string());
                        }
                        Err(e) => {
                            warn!("Rejected submission {:?}: {}", url, e);
                            self.emit(BackendEvent::Notice {
                                operation: Operation::CheckingUrl,
                                message: e.to_string(),
                            })
                            .await;
                        }
                    }
                }

                if let Some(destination) = target {
                    info!("Accepted {} URL(s) for {:?}", accepted.len(), mode);
                    self.outstanding += 1;
                    tokio::spawn(worker::run_submission(
                        self.context.clone(),
                        accepted,
                        destination,
                        mode,
                        self.defaults.clone(),
                    ));
                }
            }
            BackendCommand::ClearFinished => {
                let cleared = self.state.clear_retired();
                debug!("Cleared {} finished tasks", cleared);
            }
            BackendCommand::Shutdown => {}
        }
    }

    async fn handle_worker_message(&mut self, message: WorkerMessage) {
        match message {
            WorkerMessage::Enqueue(task) => {
                self.state.enqueue(task);
            }
            WorkerMessage::Extracted { task_id, result } => {
                self.state.apply_extraction(task_id, result);
            }
            WorkerMessage::Engine { task_id, event } => match event {
                EngineEvent::Download(event) => self.state.apply_download_event(task_id, event),
                EngineEvent::Postprocess(event) => {
                    self.state.apply_postprocess_event(task_id, event)
                }
            },
            WorkerMessage::CredentialPromoted {
                task_id,
                url,
                source,
            } => {
                info!("Using {} cookies for all further requests", source);
                self.defaults.cookies_from_browser = Some(source);
                if let Some(id) = task_id {
                    self.state.set_credentials(id, source);
                }
                self.emit(BackendEvent::Login { url, source }).await;
            }
            WorkerMessage::Notice { operation, message } => {
                self.emit(BackendEvent::Notice { operation, message }).await;
            }
            WorkerMessage::Status(message) => self.state.set_app_status(&message),
            WorkerMessage::Retire(task_id) => {
                if self.state.retire(task_id) {
                    debug!("Retired task {}", task_id);
                }
            }
            WorkerMessage::Done => {
                self.outstanding = self.outstanding.saturating_sub(1);
            }
        }
    }

    fn on_tick(&mut self) {
        match self.state.tick() {
            Some(TickAction::BeginExtraction(request)) => {
                self.outstanding += 1;
                tokio::spawn(worker::run_extraction(self.context.clone(), request));
            }
            Some(TickAction::BeginDownload(request)) => {
                self.outstanding += 1;
                tokio::spawn(worker::run_download(self.context.clone(), request));
            }
            Some(TickAction::Dropped(id)) => {
                debug!("Dropped task {} after failed extraction", id);
            }
            None => {}
        }
    }

    /// Forward queue events and report idleness
    async fn flush(&mut self) {
        for event in self.state.drain_events() {
            self.emit(BackendEvent::Queue(event)).await;
        }

        if self.busy && self.outstanding == 0 && self.state.is_idle() {
            self.busy = false;
            info!("Queue is idle");
            self.emit(BackendEvent::Idle).await;
        }
    }

    async fn emit(&self, event: BackendEvent) {
        if self.sender.send(event).await.is_err() {
            debug!("Front-end dropped the event receiver");
        }
    }
}
