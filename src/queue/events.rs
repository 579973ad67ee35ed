use crate::queue::task::{DownloadTask, TaskId, TaskState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Events that describe changes in the download queue state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum QueueEvent {
    /// A new task was appended to the queue
    TaskAdded {
        task: DownloadTask,
        timestamp: DateTime<Utc>,
    },
    /// A task moved to another lifecycle state
    TaskStateChanged {
        task_id: TaskId,
        name: String,
        state: TaskState,
        status: String,
        timestamp: DateTime<Utc>,
    },
    /// Progress or status text changed without a state change
    TaskProgress {
        task_id: TaskId,
        progress: u8,
        status: String,
        timestamp: DateTime<Utc>,
    },
    /// A task left the queue
    TaskRemoved {
        task_id: TaskId,
        state: TaskState,
        timestamp: DateTime<Utc>,
    },
    /// Application-wide status line ("Ready", "Extracting playlist info...")
    AppStatus {
        message: String,
        timestamp: DateTime<Utc>,
    },
}

impl QueueEvent {
    pub fn task_id(&self) -> Option<TaskId> {
        match self {
            QueueEvent::TaskAdded { task, .. } => Some(task.id),
            QueueEvent::TaskStateChanged { task_id, .. }
            | QueueEvent::TaskProgress { task_id, .. }
            | QueueEvent::TaskRemoved { task_id, .. } => Some(*task_id),
            QueueEvent::AppStatus { .. } => None,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            QueueEvent::TaskAdded { timestamp, .. }
            | QueueEvent::TaskStateChanged { timestamp, .. }
            | QueueEvent::TaskProgress { timestamp, .. }
            | QueueEvent::TaskRemoved { timestamp, .. }
            | QueueEvent::AppStatus { timestamp, .. } => *timestamp,
        }
    }

    pub(crate) fn state_changed(task: &DownloadTask) -> Self {
        QueueEvent::TaskStateChanged {
            task_id: task.id,
            name: task.display_name().to_string(),
            state: task.state,
            status: task.status.clone(),
            timestamp: Utc::now(),
        }
    }

    pub(crate) fn progress(task: &DownloadTask) -> Self {
        QueueEvent::TaskProgress {
            task_id: task.id,
            progress: task.progress,
            status: task.status.clone(),
            timestamp: Utc::now(),
        }
    }
}
