pub mod events;
pub mod scheduler;
pub mod task;

pub use events::QueueEvent;
pub use scheduler::{SchedulerState, TickAction};
pub use task::{DownloadRequest, DownloadTask, ExtractRequest, TaskId, TaskState};
