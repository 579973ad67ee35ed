//! Serial queue scheduler
//!
//! Owned by exactly one writer (the backend actor). Worker results are applied here in
//! arrival order; every mutation that the presentation cares about is recorded as a
//! [`QueueEvent`] in an outbox drained by the owner.

use crate::auth::CredentialSource;
use crate::downloader::progress::{DownloadEvent, PostprocessEvent};
use crate::format::Metadata;
use crate::queue::events::QueueEvent;
use crate::queue::task::{DownloadRequest, DownloadTask, ExtractRequest, TaskId, TaskState};
use crate::utils::error::LoaderError;
use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use tracing::{debug, info, warn};

pub const STATUS_READY: &str = "Ready";

/// What a tick decided for the head of the queue
#[derive(Debug)]
pub enum TickAction {
    BeginExtraction(ExtractRequest),
    BeginDownload(DownloadRequest),
    /// Head could not be extracted and was popped
    Dropped(TaskId),
}

pub struct SchedulerState {
    queue: VecDeque<TaskId>,
    tasks: HashMap<TaskId, DownloadTask>,
    /// Task whose download stream currently holds the single-flight slot
    in_flight: Option<TaskId>,
    app_status: String,
    outbox: Vec<QueueEvent>,
}

impl Default for SchedulerState {
    fn default() -> Self {
        Self::new()
    }
}

impl SchedulerState {
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            tasks: HashMap::new(),
            in_flight: None,
            app_status: STATUS_READY.to_string(),
            outbox: Vec::new(),
        }
    }

    /// Append a task at the tail
    pub fn enqueue(&mut self, task: DownloadTask) -> TaskId {
        let id = task.id;
        info!("Added task {} ({}) to queue", id, task.display_name());
        self.outbox.push(QueueEvent::TaskAdded {
            task: task.clone(),
            timestamp: Utc::now(),
        });
        self.queue.push_back(id);
        self.tasks.insert(id, task);
        id
    }

    /// Advance the head of the queue by at most one step.
    ///
    /// Does nothing while a download holds the single-flight slot or while the head is
    /// still extracting.
    pub fn tick(&mut self) -> Option<TickAction> {
        if self.in_flight.is_some() {
            return None;
        }
        let head = *self.queue.front()?;

        let Some(task) = self.tasks.get_mut(&head) else {
            warn!("Queue head {} has no task entry, dropping it", head);
            self.queue.pop_front();
            return None;
        };

        match task.state {
            TaskState::Queued => {
                let request = task.begin_extraction()?;
                self.outbox.push(QueueEvent::state_changed(task));
                Some(TickAction::BeginExtraction(request))
            }
            TaskState::Extracted => {
                let request = task.begin_download()?;
                self.outbox.push(QueueEvent::state_changed(task));
                self.in_flight = Some(head);
                debug!("Task {} holds the download slot", head);
                Some(TickAction::BeginDownload(request))
            }
            TaskState::ExtractFailed => {
                self.remove(head);
                self.tasks.remove(&head);
                self.set_app_status(STATUS_READY);
                Some(TickAction::Dropped(head))
            }
            TaskState::Finished | TaskState::DownloadFailed => {
                self.remove(head);
                None
            }
            TaskState::Extracting | TaskState::Downloading => None,
        }
    }

    /// Remove `id` from the queue. Returns `false` when it was not queued.
    pub fn remove(&mut self, id: TaskId) -> bool {
        let Some(pos) = self.queue.iter().position(|queued| *queued == id) else {
            return false;
        };
        self.queue.remove(pos);
        let state = self
            .tasks
            .get(&id)
            .map(|task| task.state)
            .unwrap_or(TaskState::Queued);
        debug!("Removed task {} from queue ({})", id, state);
        self.outbox.push(QueueEvent::TaskRemoved {
            task_id: id,
            state,
            timestamp: Utc::now(),
        });
        true
    }

    /// Apply the result of an extraction worker
    pub fn apply_extraction(&mut self, id: TaskId, result: Result<Metadata, LoaderError>) {
        let Some(task) = self.tasks.get_mut(&id) else {
            debug!("Extraction result for unknown task {}", id);
            return;
        };
        if task.finish_extraction(result) {
            self.outbox.push(QueueEvent::state_changed(task));
        }
    }

    /// Apply a download-stream event. Terminal events release the slot (if held by this
    /// task) and remove the task from the queue.
    pub fn apply_download_event(&mut self, id: TaskId, event: DownloadEvent) {
        let Some(task) = self.tasks.get_mut(&id) else {
            debug!("Download event for unknown task {}", id);
            return;
        };

        let before = (task.progress, task.status.clone());
        if task.on_download_event(&event) {
            self.outbox.push(QueueEvent::state_changed(task));
        } else if before != (task.progress, task.status.clone()) {
            self.outbox.push(QueueEvent::progress(task));
        }

        if event.is_terminal() {
            if self.in_flight == Some(id) {
                self.in_flight = None;
                debug!("Task {} released the download slot", id);
            }
            self.remove(id);
        }
    }

    /// Apply a post-processing event. The terminal one removes the task; the download
    /// slot is never touched here.
    pub fn apply_postprocess_event(&mut self, id: TaskId, event: PostprocessEvent) {
        let Some(task) = self.tasks.get_mut(&id) else {
            debug!("Post-processing event for unknown task {}", id);
            return;
        };
        let before = task.status.clone();
        task.on_postprocess_event(&event);
        if task.status != before {
            self.outbox.push(QueueEvent::progress(task));
        }
        if event == PostprocessEvent::Finished {
            self.remove(id);
        }
    }

    /// Make a task's later engine calls use a browser session that already worked
    pub fn set_credentials(&mut self, id: TaskId, source: CredentialSource) {
        if let Some(task) = self.tasks.get_mut(&id) {
            task.options.cookies_from_browser = Some(source);
        }
    }

    pub fn set_app_status(&mut self, message: &str) {
        if self.app_status == message {
            return;
        }
        info!(target: "status", "{}", message);
        self.app_status = message.to_string();
        self.outbox.push(QueueEvent::AppStatus {
            message: message.to_string(),
            timestamp: Utc::now(),
        });
    }

    /// Take every event recorded since the last drain
    pub fn drain_events(&mut self) -> Vec<QueueEvent> {
        std::mem::take(&mut self.outbox)
    }

    /// Forget a task that left the queue and will get no further engine events.
    /// Returns `false` while it is still queued or holds the slot.
    pub fn retire(&mut self, id: TaskId) -> bool {
        if self.contains(id) || self.in_flight == Some(id) {
            return false;
        }
        self.tasks.remove(&id).is_some()
    }

    /// Forget tasks that have left the queue. Returns how many were dropped.
    pub fn clear_retired(&mut self) -> usize {
        let before = self.tasks.len();
        let queue = &self.queue;
        let in_flight = self.in_flight;
        self.tasks
            .retain(|id, _| queue.contains(id) || in_flight == Some(*id));
        before - self.tasks.len()
    }

    pub fn task(&self, id: TaskId) -> Option<&DownloadTask> {
        self.tasks.get(&id)
    }

    /// Queued tasks, head first
    pub fn queued(&self) -> impl Iterator<Item = &DownloadTask> {
        self.queue.iter().filter_map(|id| self.tasks.get(id))
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.queue.contains(&id)
    }

    pub fn in_flight(&self) -> Option<TaskId> {
        self.in_flight
    }

    pub fn is_downloading(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Nothing queued and no download holding the slot
    pub fn is_idle(&self) -> bool {
        self.queue.is_empty() && self.in_flight.is_none()
    }

    pub fn app_status(&self) -> &str {
        &self.app_status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::DownloadOptions;
    use crate::format::{FormatSummary, Formats};

    fn metadata() -> Metadata {
        Metadata {
            title: "Clip".into(),
            duration: "1:00".into(),
            size: 0,
            subtitles: vec![],
            formats: Formats::Best(FormatSummary::default()),
        }
    }

    fn task(url: &str) -> DownloadTask {
        DownloadTask::new(url, "/tmp", DownloadOptions::default())
    }

    fn extract(state: &mut SchedulerState) -> TaskId {
        match state.tick() {
            Some(TickAction::BeginExtraction(req)) => {
                state.apply_extraction(req.task_id, Ok(metadata()));
                req.task_id
            }
            other => panic!("expected extraction, got {:?}", other),
        }
    }

    #[test]
    fn head_moves_through_extraction_then_download() {
        let mut state = SchedulerState::new();
        let id = state.enqueue(task("a"));
        assert_eq!(extract(&mut state), id);
        assert!(matches!(state.tick(), Some(TickAction::BeginDownload(_))));
        assert_eq!(state.in_flight(), Some(id));
        assert!(state.tick().is_none(), "slot is held");
    }

    #[test]
    fn extracting_head_blocks_the_queue() {
        let mut state = SchedulerState::new();
        state.enqueue(task("a"));
        state.enqueue(task("b"));
        assert!(matches!(state.tick(), Some(TickAction::BeginExtraction(_))));
        assert!(state.tick().is_none());
        assert_eq!(state.queue_len(), 2);
    }

    #[test]
    fn failed_extraction_is_dropped_on_next_tick() {
        let mut state = SchedulerState::new();
        let id = state.enqueue(task("a"));
        let next = state.enqueue(task("b"));
        let Some(TickAction::BeginExtraction(req)) = state.tick() else {
            panic!("expected extraction");
        };
        state.apply_extraction(req.task_id, Err(LoaderError::Extraction("404".into())));
        assert!(matches!(state.tick(), Some(TickAction::Dropped(dropped)) if dropped == id));
        assert!(!state.contains(id));
        assert_eq!(state.app_status(), STATUS_READY);
        match state.tick() {
            Some(TickAction::BeginExtraction(req)) => assert_eq!(req.task_id, next),
            other => panic!("expected extraction of the next task, got {:?}", other),
        }
    }

    #[test]
    fn finish_releases_slot_and_removes_once() {
        let mut state = SchedulerState::new();
        let id = state.enqueue(task("a"));
        extract(&mut state);
        state.tick();
        state.drain_events();

        state.apply_download_event(id, DownloadEvent::Finished);
        assert!(state.in_flight().is_none());
        assert!(!state.contains(id));
        state.apply_postprocess_event(id, PostprocessEvent::Finished);
        state.apply_download_event(id, DownloadEvent::Finished);

        let removals = state
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, QueueEvent::TaskRemoved { .. }))
            .count();
        assert_eq!(removals, 1);
        assert!(!state.remove(id));
    }

    #[test]
    fn postprocessing_never_touches_the_slot() {
        let mut state = SchedulerState::new();
        let first = state.enqueue(task("a"));
        let second = state.enqueue(task("b"));
        extract(&mut state);
        state.tick();
        state.apply_download_event(first, DownloadEvent::Finished);

        extract(&mut state);
        assert!(matches!(state.tick(), Some(TickAction::BeginDownload(_))));
        assert_eq!(state.in_flight(), Some(second));

        state.apply_postprocess_event(first, PostprocessEvent::Processing);
        state.apply_postprocess_event(first, PostprocessEvent::Finished);
        assert_eq!(state.in_flight(), Some(second));
        assert_eq!(state.task(first).unwrap().status, "Finished");
    }

    #[test]
    fn terminal_event_for_another_task_keeps_the_slot() {
        let mut state = SchedulerState::new();
        let first = state.enqueue(task("a"));
        let stray = state.enqueue(task("b"));
        extract(&mut state);
        state.tick();
        state.apply_download_event(stray, DownloadEvent::Failed("boom".into()));
        assert_eq!(state.in_flight(), Some(first));
        assert!(!state.contains(stray));
    }

    #[test]
    fn progress_events_are_recorded() {
        let mut state = SchedulerState::new();
        let id = state.enqueue(task("a"));
        extract(&mut state);
        state.tick();
        state.drain_events();
        state.apply_download_event(
            id,
            DownloadEvent::Downloading {
                percent: "12.0%".into(),
                line: "12.0% of 3MiB".into(),
            },
        );
        let events = state.drain_events();
        assert!(matches!(
            events.as_slice(),
            [QueueEvent::TaskProgress { progress: 12, .. }]
        ));
    }

    #[test]
    fn tasks_are_forgotten_once_retired() {
        let mut state = SchedulerState::new();
        let id = state.enqueue(task("a"));
        extract(&mut state);
        state.tick();
        assert!(!state.retire(id), "slot holder stays");

        state.apply_download_event(id, DownloadEvent::Finished);
        state.apply_postprocess_event(id, PostprocessEvent::Finished);
        assert!(state.retire(id));
        assert!(state.task(id).is_none());
        assert!(!state.retire(id));
        assert_eq!(state.clear_retired(), 0);
    }

    #[test]
    fn dropped_heads_are_forgotten() {
        let mut state = SchedulerState::new();
        let id = state.enqueue(task("a"));
        let Some(TickAction::BeginExtraction(req)) = state.tick() else {
            panic!("expected extraction");
        };
        state.apply_extraction(req.task_id, Err(LoaderError::Extraction("404".into())));
        assert!(matches!(state.tick(), Some(TickAction::Dropped(_))));
        assert!(state.task(id).is_none());
    }

    #[test]
    fn retired_tasks_can_be_cleared() {
        let mut state = SchedulerState::new();
        let id = state.enqueue(task("a"));
        state.enqueue(task("b"));
        extract(&mut state);
        state.tick();
        state.apply_download_event(id, DownloadEvent::Finished);
        assert!(state.task(id).is_some());
        assert_eq!(state.clear_retired(), 1);
        assert!(state.task(id).is_none());
        assert_eq!(state.queue_len(), 1);
    }
}
