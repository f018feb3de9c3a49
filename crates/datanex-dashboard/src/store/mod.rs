//! Client-side state containers.
//!
//! # Design
//! - Each slice is a plain state struct plus pure transformation functions so
//!   reducers are testable without a runtime.
//! - Store handles wrap a `tokio::sync::watch` sender; cloning a handle shares
//!   the slice, and every mutation publishes a fresh snapshot to subscribers.
//! - Mutations are synchronous and total: unknown keys are no-ops, not errors.

pub mod files;
pub mod settings;
pub mod tasks;
pub mod ui;
pub mod uploads;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

pub use files::{FilePatch, FileStore, FilesState};
pub use settings::{Settings, SettingsState, SettingsStore};
pub use tasks::{BackgroundTask, TaskPatch, TaskStore, TasksState};
pub use ui::{Notification, NotificationLevel, Theme, UiState, UiStore};
pub use uploads::{UPLOAD_EVICTION_DELAY, UploadStatus, UploadStore, UploadTask, UploadsState};

/// Shared, observable state slice.
#[derive(Debug)]
pub struct Slice<S> {
    sender: Arc<watch::Sender<S>>,
}

impl<S> Clone for Slice<S> {
    fn clone(&self) -> Self {
        Self {
            sender: Arc::clone(&self.sender),
        }
    }
}

impl<S: Default> Default for Slice<S> {
    fn default() -> Self {
        Self::new(S::default())
    }
}

impl<S> Slice<S> {
    /// Slice seeded with `initial`.
    #[must_use]
    pub fn new(initial: S) -> Self {
        let (sender, _) = watch::channel(initial);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Receiver that observes every published snapshot.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<S> {
        self.sender.subscribe()
    }

    /// Apply `mutate` and notify subscribers.
    pub fn update(&self, mutate: impl FnOnce(&mut S)) {
        self.sender.send_modify(mutate);
    }

    /// Apply `mutate`, notifying subscribers only when it reports a change.
    pub fn update_if(&self, mutate: impl FnOnce(&mut S) -> bool) -> bool {
        self.sender.send_if_modified(mutate)
    }

    /// Read the current state without cloning it.
    pub fn read<R>(&self, view: impl FnOnce(&S) -> R) -> R {
        view(&self.sender.borrow())
    }
}

impl<S: Clone> Slice<S> {
    /// Copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> S {
        self.sender.borrow().clone()
    }
}

impl<S: Clone + Send + Sync + 'static> Slice<S> {
    /// Stream of snapshots, starting with the current one.
    #[must_use]
    pub fn changes(&self) -> WatchStream<S> {
        WatchStream::new(self.subscribe())
    }
}

static LAST_LOCAL_ID: AtomicU64 = AtomicU64::new(0);

/// Session-unique identifier seeded from the wall clock in milliseconds.
///
/// Ids are strictly increasing even when several are minted within the same
/// millisecond.
#[must_use]
pub fn next_local_id() -> u64 {
    let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0);
    let mut current = LAST_LOCAL_ID.load(Ordering::Relaxed);
    loop {
        let next = now.max(current.saturating_add(1));
        match LAST_LOCAL_ID.compare_exchange_weak(
            current,
            next,
            Ordering::SeqCst,
            Ordering::Relaxed,
        ) {
            Ok(_) => return next,
            Err(actual) => current = actual,
        }
    }
}
