//! Background job tracking keyed by server task id.

use std::collections::BTreeMap;

use datanex_api_models::{Document, TaskState, TaskStatusResponse};
use serde::Serialize;

use super::Slice;

/// Server-side job as last observed by the console.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BackgroundTask {
    /// Server-assigned identifier.
    pub task_id: String,
    /// Last reported state.
    pub state: TaskState,
    /// Human-readable status line.
    pub status: Option<String>,
    /// Current step label.
    pub current: Option<String>,
    /// Progress percentage.
    pub progress: Option<f64>,
    /// Result payload once finished.
    pub result: Option<Document>,
    /// File the job operates on, when known.
    pub file_id: Option<String>,
}

impl BackgroundTask {
    /// Freshly queued task.
    #[must_use]
    pub fn pending(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            state: TaskState::Pending,
            status: None,
            current: None,
            progress: None,
            result: None,
            file_id: None,
        }
    }

    /// Attach the file the task operates on.
    #[must_use]
    pub fn for_file(mut self, file_id: impl Into<String>) -> Self {
        self.file_id = Some(file_id.into());
        self
    }

    /// Whether the task reached `SUCCESS` or `FAILURE`.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

/// Partial task update. `None` leaves a field untouched.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TaskPatch {
    /// Replacement state.
    pub state: Option<TaskState>,
    /// Replacement status line.
    pub status: Option<String>,
    /// Replacement step label.
    pub current: Option<String>,
    /// Replacement progress.
    pub progress: Option<f64>,
    /// Replacement result payload.
    pub result: Option<Document>,
}

impl From<TaskStatusResponse> for TaskPatch {
    fn from(response: TaskStatusResponse) -> Self {
        Self {
            state: Some(response.state),
            status: response.status,
            current: response.current,
            progress: response.progress,
            result: response.result,
        }
    }
}

/// Task slice keyed by task id.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TasksState {
    /// Tracked tasks.
    pub tasks: BTreeMap<String, BackgroundTask>,
}

impl TasksState {
    /// Task with the given id.
    #[must_use]
    pub fn get(&self, task_id: &str) -> Option<&BackgroundTask> {
        self.tasks.get(task_id)
    }

    /// Tasks that have not reached a terminal state.
    pub fn active(&self) -> impl Iterator<Item = &BackgroundTask> {
        self.tasks.values().filter(|task| !task.is_terminal())
    }
}

/// Insert or replace a task.
pub fn add_task(state: &mut TasksState, task: BackgroundTask) {
    state.tasks.insert(task.task_id.clone(), task);
}

/// Merge `patch` into the task, creating a pending entry first when absent.
pub fn update_task(state: &mut TasksState, task_id: &str, patch: TaskPatch) {
    let task = state
        .tasks
        .entry(task_id.to_string())
        .or_insert_with(|| BackgroundTask::pending(task_id));
    if let Some(next) = patch.state {
        task.state = next;
    }
    if patch.status.is_some() {
        task.status = patch.status;
    }
    if patch.current.is_some() {
        task.current = patch.current;
    }
    if patch.progress.is_some() {
        task.progress = patch.progress;
    }
    if patch.result.is_some() {
        task.result = patch.result;
    }
}

/// Drop a task. Returns `false` when it was not tracked.
pub fn remove_task(state: &mut TasksState, task_id: &str) -> bool {
    state.tasks.remove(task_id).is_some()
}

/// Retain only non-terminal tasks. Returns the number removed.
pub fn clear_completed_tasks(state: &mut TasksState) -> usize {
    let before = state.tasks.len();
    state.tasks = std::mem::take(&mut state.tasks)
        .into_iter()
        .filter(|(_, task)| !task.is_terminal())
        .collect();
    before - state.tasks.len()
}

/// Observable handle over [`TasksState`].
#[derive(Clone, Debug, Default)]
pub struct TaskStore {
    slice: Slice<TasksState>,
}

impl TaskStore {
    /// Copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> TasksState {
        self.slice.snapshot()
    }

    /// Receiver notified on every change.
    #[must_use]
    pub fn subscribe(&self) -> tokio::sync::watch::Receiver<TasksState> {
        self.slice.subscribe()
    }

    /// Copy of the task with `task_id`.
    #[must_use]
    pub fn get(&self, task_id: &str) -> Option<BackgroundTask> {
        self.slice.read(|state| state.get(task_id).cloned())
    }

    /// See [`add_task`].
    pub fn add_task(&self, task: BackgroundTask) {
        self.slice.update(|state| add_task(state, task));
    }

    /// See [`update_task`].
    pub fn update_task(&self, task_id: &str, patch: TaskPatch) {
        self.slice.update(|state| update_task(state, task_id, patch));
    }

    /// See [`remove_task`].
    pub fn remove_task(&self, task_id: &str) -> bool {
        self.slice.update_if(|state| remove_task(state, task_id))
    }

    /// See [`clear_completed_tasks`].
    pub fn clear_completed_tasks(&self) -> usize {
        let mut removed = 0;
        self.slice.update_if(|state| {
            removed = clear_completed_tasks(state);
            removed > 0
        });
        removed
    }
}
