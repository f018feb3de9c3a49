//! Uploaded file records and the current selection.

use std::collections::HashMap;

use datanex_api_models::{Document, FileStatus, RemoteFile};
use serde_json::{Map, Value};

use super::Slice;

/// File slice: ordered records, the selected record, and in-flight upload progress.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FilesState {
    /// Records, newest first. Ids are unique.
    pub files: Vec<RemoteFile>,
    /// Record currently opened for inspection.
    pub selected: Option<RemoteFile>,
    /// Upload progress (0–100) keyed by upload id.
    pub upload_progress: HashMap<String, u8>,
}

impl FilesState {
    /// Record with the given id.
    #[must_use]
    pub fn get(&self, file_id: &str) -> Option<&RemoteFile> {
        self.files.iter().find(|file| file.file_id == file_id)
    }

    /// Whether a record with the given id is tracked.
    #[must_use]
    pub fn contains(&self, file_id: &str) -> bool {
        self.get(file_id).is_some()
    }
}

/// Partial update merged into an existing record. `None` leaves a field untouched.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FilePatch {
    /// Replacement lifecycle status.
    pub status: Option<FileStatus>,
    /// Replacement filename.
    pub filename: Option<String>,
    /// Replacement row count.
    pub row_count: Option<u64>,
    /// Replacement column count.
    pub column_count: Option<u64>,
    /// Replacement quality score.
    pub quality_score: Option<u8>,
    /// Replacement category labels.
    pub categories: Option<Vec<String>>,
    /// Replacement tags.
    pub tags: Option<Vec<String>>,
    /// Metadata entries merged key by key.
    pub metadata: Option<Map<String, Value>>,
}

impl FilePatch {
    /// Patch that only changes the status.
    #[must_use]
    pub fn status(status: FileStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Patch built from a synchronous analysis result document.
    ///
    /// Recognised fields are lifted onto the record; anything else is ignored.
    #[must_use]
    pub fn from_analysis(document: &Document) -> Self {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let quality_score = document
            .get("quality_score")
            .and_then(Value::as_f64)
            .map(|score| score.clamp(0.0, 100.0).round() as u8);
        Self {
            status: Some(FileStatus::Completed),
            filename: None,
            row_count: document.get("row_count").and_then(Value::as_u64),
            column_count: document.get("column_count").and_then(Value::as_u64),
            quality_score,
            categories: string_list(document.get("categories")),
            tags: string_list(document.get("tags")),
            metadata: document.get("metadata").and_then(Value::as_object).cloned(),
        }
    }

    /// Merge the patch into `file`.
    pub fn apply(self, file: &mut RemoteFile) {
        if let Some(status) = self.status {
            file.status = status;
        }
        if let Some(filename) = self.filename {
            file.filename = filename;
        }
        if let Some(rows) = self.row_count {
            file.row_count = Some(rows);
        }
        if let Some(columns) = self.column_count {
            file.column_count = Some(columns);
        }
        if let Some(score) = self.quality_score {
            file.quality_score = Some(score);
        }
        if let Some(categories) = self.categories {
            file.categories = categories;
        }
        if let Some(tags) = self.tags {
            file.tags = tags;
        }
        if let Some(entries) = self.metadata {
            file.metadata.get_or_insert_with(Map::new).extend(entries);
        }
    }
}

fn string_list(value: Option<&Value>) -> Option<Vec<String>> {
    value.and_then(Value::as_array).map(|items| {
        items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect()
    })
}

/// Replace the list, keeping the first occurrence of any duplicated id.
pub fn set_files(state: &mut FilesState, files: Vec<RemoteFile>) {
    let mut unique: Vec<RemoteFile> = Vec::with_capacity(files.len());
    for file in files {
        if !unique.iter().any(|seen| seen.file_id == file.file_id) {
            unique.push(file);
        }
    }
    state.files = unique;
    refresh_selection(state);
}

/// Prepend a record, dropping any older record with the same id.
pub fn add_file(state: &mut FilesState, file: RemoteFile) {
    state.files.retain(|existing| existing.file_id != file.file_id);
    state.files.insert(0, file);
    refresh_selection(state);
}

/// Replace a record in place, or prepend it when unknown.
pub fn upsert_file(state: &mut FilesState, file: RemoteFile) {
    if let Some(existing) = state
        .files
        .iter_mut()
        .find(|existing| existing.file_id == file.file_id)
    {
        *existing = file;
        refresh_selection(state);
    } else {
        add_file(state, file);
    }
}

/// Merge `patch` into the record with `file_id`. Returns `false` when absent.
pub fn update_file(state: &mut FilesState, file_id: &str, patch: FilePatch) -> bool {
    let Some(file) = state.files.iter_mut().find(|file| file.file_id == file_id) else {
        return false;
    };
    patch.apply(file);
    refresh_selection(state);
    true
}

/// Remove the record with `file_id`, clearing the selection when it pointed there.
pub fn remove_file(state: &mut FilesState, file_id: &str) -> bool {
    let before = state.files.len();
    state.files.retain(|file| file.file_id != file_id);
    let removed = state.files.len() != before;
    let was_selected = state
        .selected
        .as_ref()
        .is_some_and(|selected| selected.file_id == file_id);
    if was_selected {
        state.selected = None;
    }
    removed || was_selected
}

/// Set or clear the selected record.
pub fn select_file(state: &mut FilesState, file: Option<RemoteFile>) {
    state.selected = file;
}

/// Record upload progress for `upload_id`, capped at 100.
pub fn set_upload_progress(state: &mut FilesState, upload_id: &str, percent: u8) {
    state
        .upload_progress
        .insert(upload_id.to_string(), percent.min(100));
}

/// Forget upload progress for `upload_id`.
pub fn clear_upload_progress(state: &mut FilesState, upload_id: &str) -> bool {
    state.upload_progress.remove(upload_id).is_some()
}

fn refresh_selection(state: &mut FilesState) {
    let Some(selected_id) = state.selected.as_ref().map(|file| file.file_id.clone()) else {
        return;
    };
    if let Some(fresh) = state.files.iter().find(|file| file.file_id == selected_id) {
        state.selected = Some(fresh.clone());
    }
}

/// Observable handle over [`FilesState`].
#[derive(Clone, Debug, Default)]
pub struct FileStore {
    slice: Slice<FilesState>,
}

impl FileStore {
    /// Copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> FilesState {
        self.slice.snapshot()
    }

    /// Receiver notified on every change.
    #[must_use]
    pub fn subscribe(&self) -> tokio::sync::watch::Receiver<FilesState> {
        self.slice.subscribe()
    }

    /// Underlying slice for stream-style observation.
    #[must_use]
    pub const fn slice(&self) -> &Slice<FilesState> {
        &self.slice
    }

    /// Copy of the record with `file_id`.
    #[must_use]
    pub fn get(&self, file_id: &str) -> Option<RemoteFile> {
        self.slice.read(|state| state.get(file_id).cloned())
    }

    /// See [`set_files`].
    pub fn set_files(&self, files: Vec<RemoteFile>) {
        self.slice.update(|state| set_files(state, files));
    }

    /// See [`add_file`].
    pub fn add_file(&self, file: RemoteFile) {
        self.slice.update(|state| add_file(state, file));
    }

    /// See [`upsert_file`].
    pub fn upsert_file(&self, file: RemoteFile) {
        self.slice.update(|state| upsert_file(state, file));
    }

    /// See [`update_file`].
    pub fn update_file(&self, file_id: &str, patch: FilePatch) -> bool {
        self.slice
            .update_if(|state| update_file(state, file_id, patch))
    }

    /// See [`remove_file`].
    pub fn remove_file(&self, file_id: &str) -> bool {
        self.slice.update_if(|state| remove_file(state, file_id))
    }

    /// See [`select_file`].
    pub fn select_file(&self, file: Option<RemoteFile>) {
        self.slice.update(|state| select_file(state, file));
    }

    /// See [`set_upload_progress`].
    pub fn set_upload_progress(&self, upload_id: &str, percent: u8) {
        self.slice
            .update(|state| set_upload_progress(state, upload_id, percent));
    }

    /// See [`clear_upload_progress`].
    pub fn clear_upload_progress(&self, upload_id: &str) -> bool {
        self.slice
            .update_if(|state| clear_upload_progress(state, upload_id))
    }
}
