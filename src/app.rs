//! Backend wiring shared by the binary and the integration tests

use crate::backend::{BackendActor, BackendCommand, BackendConfig, BackendEvent, Prompter};
use crate::extractor::MediaEngine;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const CHANNEL_CAPACITY: usize = 256;

/// Front-end side of a running backend
pub struct BackendHandle {
    pub commands: mpsc::Sender<BackendCommand>,
    pub events: mpsc::Receiver<BackendEvent>,
    pub join: JoinHandle<()>,
}

impl BackendHandle {
    /// Ask the actor to stop and wait for it
    pub async fn shutdown(self) {
        let _ = self.commands.send(BackendCommand::Shutdown).await;
        let _ = self.join.await;
    }
}

/// Spawn the backend actor on the current tokio runtime
pub fn spawn_backend(
    config: BackendConfig,
    engine: Arc<dyn MediaEngine>,
    prompter: Arc<dyn Prompter>,
) -> BackendHandle {
    let (command_tx, command_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (event_tx, event_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let actor = BackendActor::new(config, engine, prompter, command_rx, event_tx);
    let join = tokio::spawn(actor.run());
    BackendHandle {
        commands: command_tx,
        events: event_rx,
        join,
    }
}
