use crate::auth::CredentialSource;
use crate::downloader::progress::EngineEvent;
use crate::format::Metadata;
use crate::queue::{DownloadTask, QueueEvent, TaskId};
use crate::resolver::DownloadMode;
use crate::utils::error::LoaderError;
use std::fmt;
use std::path::PathBuf;

/// Commands sent from the front-end to the backend
#[derive(Debug, Clone)]
pub enum BackendCommand {
    /// Resolve and queue URLs; they are handled one after another
    Submit {
        urls: Vec<String>,
        destination: PathBuf,
        mode: DownloadMode,
    },
    /// Forget tasks that already left the queue. Download workers retire their own
    /// task once the engine returns, so this only matters for tasks still post-processing.
    ClearFinished,
    Shutdown,
}

/// What was going on when a failure was reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    CheckingUrl,
    ExtractingInfo,
    Downloading,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::CheckingUrl => "checking URL",
            Operation::ExtractingInfo => "extracting info",
            Operation::Downloading => "downloading",
        })
    }
}

/// Events sent from the backend to the front-end
#[derive(Debug, Clone)]
pub enum BackendEvent {
    Queue(QueueEvent),
    /// A failure the user should see
    Notice { operation: Operation, message: String },
    /// A browser login worked and is now used for every later request
    Login { url: String, source: CredentialSource },
    /// Nothing queued, nothing running
    Idle,
}

/// Results marshalled from workers back to the actor
#[derive(Debug)]
pub enum WorkerMessage {
    Enqueue(DownloadTask),
    Extracted {
        task_id: TaskId,
        result: Result<Metadata, LoaderError>,
    },
    Engine {
        task_id: TaskId,
        event: EngineEvent,
    },
    CredentialPromoted {
        task_id: Option<TaskId>,
        url: String,
        source: CredentialSource,
    },
    Notice {
        operation: Operation,
        message: String,
    },
    Status(String),
    /// No further engine events will arrive for this task
    Retire(TaskId),
    /// The sending worker has finished
    Done,
}
