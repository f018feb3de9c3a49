//! Local bookkeeping for uploads in flight.
//!
//! Successful uploads linger for [`UPLOAD_EVICTION_DELAY`] so the user sees the
//! outcome, then drop out on their own. Failed uploads stay until dismissed.

use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use super::{Slice, next_local_id};

/// How long a successful upload remains listed.
pub const UPLOAD_EVICTION_DELAY: Duration = Duration::from_secs(3);

/// Lifecycle of a local upload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    /// Bytes are being transferred.
    Uploading,
    /// Transfer finished; analysis was requested.
    Analyzing,
    /// Upload and analysis request succeeded.
    Success,
    /// Upload or analysis failed.
    Error,
}

/// One upload as shown in the upload list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UploadTask {
    /// Session-unique identifier.
    pub id: u64,
    /// Name of the file being uploaded.
    pub filename: String,
    /// Payload size in bytes.
    pub size: u64,
    /// Transfer progress (0–100).
    pub progress: u8,
    /// Current lifecycle status.
    pub status: UploadStatus,
    /// Failure message for [`UploadStatus::Error`].
    pub error: Option<String>,
}

/// Upload slice in start order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UploadsState {
    /// Tracked uploads.
    pub tasks: Vec<UploadTask>,
}

impl UploadsState {
    /// Upload with the given id.
    #[must_use]
    pub fn get(&self, id: u64) -> Option<&UploadTask> {
        self.tasks.iter().find(|task| task.id == id)
    }

    fn get_mut(&mut self, id: u64) -> Option<&mut UploadTask> {
        self.tasks.iter_mut().find(|task| task.id == id)
    }
}

/// Track a new upload.
pub fn begin(state: &mut UploadsState, task: UploadTask) {
    state.tasks.retain(|existing| existing.id != task.id);
    state.tasks.push(task);
}

/// Raise progress; lower values are ignored. Returns `true` when it moved.
pub fn set_progress(state: &mut UploadsState, id: u64, percent: u8) -> bool {
    let Some(task) = state.get_mut(id) else {
        return false;
    };
    let percent = percent.min(100);
    if task.status != UploadStatus::Uploading || percent <= task.progress {
        return false;
    }
    task.progress = percent;
    true
}

/// Move to `analyzing` with progress forced to 100.
pub fn mark_analyzing(state: &mut UploadsState, id: u64) -> bool {
    transition(state, id, |task| {
        task.progress = 100;
        task.status = UploadStatus::Analyzing;
    })
}

/// Move to `success`.
pub fn mark_success(state: &mut UploadsState, id: u64) -> bool {
    transition(state, id, |task| {
        task.progress = 100;
        task.status = UploadStatus::Success;
        task.error = None;
    })
}

/// Move to `error` with a message.
pub fn mark_error(state: &mut UploadsState, id: u64, message: impl Into<String>) -> bool {
    let message = message.into();
    transition(state, id, |task| {
        task.status = UploadStatus::Error;
        task.error = Some(message);
    })
}

/// Remove an upload from the list.
pub fn dismiss(state: &mut UploadsState, id: u64) -> bool {
    let before = state.tasks.len();
    state.tasks.retain(|task| task.id != id);
    state.tasks.len() != before
}

fn transition(state: &mut UploadsState, id: u64, apply: impl FnOnce(&mut UploadTask)) -> bool {
    state.get_mut(id).map(apply).is_some()
}

/// Observable handle over [`UploadsState`].
#[derive(Clone, Debug)]
pub struct UploadStore {
    slice: Slice<UploadsState>,
    eviction_delay: Duration,
}

impl Default for UploadStore {
    fn default() -> Self {
        Self::with_eviction_delay(UPLOAD_EVICTION_DELAY)
    }
}

impl UploadStore {
    /// Store that evicts successful uploads after `delay`.
    #[must_use]
    pub fn with_eviction_delay(delay: Duration) -> Self {
        Self {
            slice: Slice::default(),
            eviction_delay: delay,
        }
    }

    /// Copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> UploadsState {
        self.slice.snapshot()
    }

    /// Receiver notified on every change.
    #[must_use]
    pub fn subscribe(&self) -> tokio::sync::watch::Receiver<UploadsState> {
        self.slice.subscribe()
    }

    /// Copy of the upload with `id`.
    #[must_use]
    pub fn get(&self, id: u64) -> Option<UploadTask> {
        self.slice.read(|state| state.get(id).cloned())
    }

    /// Start tracking an upload and return its id.
    pub fn begin(&self, filename: impl Into<String>, size: u64) -> u64 {
        let task = UploadTask {
            id: next_local_id(),
            filename: filename.into(),
            size,
            progress: 0,
            status: UploadStatus::Uploading,
            error: None,
        };
        let id = task.id;
        self.slice.update(|state| begin(state, task));
        id
    }

    /// See [`set_progress`].
    pub fn set_progress(&self, id: u64, percent: u8) -> bool {
        self.slice.update_if(|state| set_progress(state, id, percent))
    }

    /// See [`mark_analyzing`].
    pub fn mark_analyzing(&self, id: u64) -> bool {
        self.slice.update_if(|state| mark_analyzing(state, id))
    }

    /// Mark success and schedule removal after the eviction delay.
    ///
    /// Removal needs a Tokio runtime; outside one the entry stays until dismissed.
    pub fn mark_success(&self, id: u64) -> bool {
        if !self.slice.update_if(|state| mark_success(state, id)) {
            return false;
        }
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let slice = self.slice.clone();
                let delay = self.eviction_delay;
                runtime.spawn(async move {
                    tokio::time::sleep(delay).await;
                    slice.update_if(|state| dismiss(state, id));
                });
            }
            Err(_) => debug!(upload_id = id, "no runtime; upload kept until dismissed"),
        }
        true
    }

    /// See [`mark_error`].
    pub fn mark_error(&self, id: u64, message: impl Into<String>) -> bool {
        self.slice.update_if(|state| mark_error(state, id, message))
    }

    /// See [`dismiss`].
    pub fn dismiss(&self, id: u64) -> bool {
        self.slice.update_if(|state| dismiss(state, id))
    }
}
