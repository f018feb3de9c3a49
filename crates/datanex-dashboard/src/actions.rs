//! Page actions: validate input, call the service, and fold results into the stores.
//!
//! # Design
//! - Every action reports its outcome through a notification, preferring the
//!   server `detail` over the fallback message on failure.
//! - Validation happens first; rejected input never reaches the client.
//! - Destructive actions ask [`Confirm`] before issuing any request.

use std::num::NonZeroU32;
use std::sync::Arc;

use datanex_api_models::{
    CleanStrategy, DedupMethod, Document, FileListResponse, FileStatus, GasPrices, JobOutcome,
    KeepPolicy, RemoteFile, ScrapeMethod, ServiceStats, TaskState,
};
use datanex_client::{ApiClient, ApiError, ApiResult, FilePayload};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{ActionError, ActionResult};
use crate::store::{
    BackgroundTask, FilePatch, FileStore, SettingsStore, TaskPatch, TaskStore, UiStore,
    UploadStore,
};
use crate::validate::{self, ValidationError};

/// Prompt shown before deleting a file.
pub const DELETE_FILE_PROMPT: &str = "Are you sure you want to delete this file?";
/// Prompt shown before restoring default settings.
pub const RESET_SETTINGS_PROMPT: &str = "Are you sure you want to reset all settings?";
/// Number of files shown on the overview.
pub const RECENT_FILES: NonZeroU32 = NonZeroU32::MIN.saturating_add(4);

/// Yes/no prompt answered by the user.
pub trait Confirm: Send + Sync {
    /// Ask `prompt`; `true` means proceed.
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F> Confirm for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// Overview page data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardOverview {
    /// Service-wide counters.
    pub stats: ServiceStats,
    /// Most recent files.
    pub recent_files: Vec<RemoteFile>,
}

/// Job kinds that share the submit-and-track flow.
#[derive(Clone, Copy)]
struct JobLabels {
    started: &'static str,
    completed: &'static str,
    failed: &'static str,
}

const ANALYSIS: JobLabels = JobLabels {
    started: "Analysis started",
    completed: "Analysis completed",
    failed: "Analysis failed",
};
const CLEANING: JobLabels = JobLabels {
    started: "Data cleaning started",
    completed: "Data cleaning completed",
    failed: "Cleaning failed",
};
const DEDUPLICATION: JobLabels = JobLabels {
    started: "Deduplication started",
    completed: "Deduplication completed",
    failed: "Deduplication failed",
};

/// Console state plus the client used to reach the service.
#[derive(Clone)]
pub struct Dashboard {
    client: ApiClient,
    confirm: Arc<dyn Confirm>,
    files: FileStore,
    tasks: TaskStore,
    ui: UiStore,
    uploads: UploadStore,
    settings: SettingsStore,
}

impl Dashboard {
    /// Dashboard with fresh stores.
    #[must_use]
    pub fn new(client: ApiClient, confirm: Arc<dyn Confirm>) -> Self {
        Self {
            client,
            confirm,
            files: FileStore::default(),
            tasks: TaskStore::default(),
            ui: UiStore::default(),
            uploads: UploadStore::default(),
            settings: SettingsStore::default(),
        }
    }

    /// Replace the upload store, e.g. to change the eviction delay.
    #[must_use]
    pub fn with_uploads(mut self, uploads: UploadStore) -> Self {
        self.uploads = uploads;
        self
    }

    /// Client used for service calls.
    #[must_use]
    pub const fn client(&self) -> &ApiClient {
        &self.client
    }

    /// File records.
    #[must_use]
    pub const fn files(&self) -> &FileStore {
        &self.files
    }

    /// Background tasks.
    #[must_use]
    pub const fn tasks(&self) -> &TaskStore {
        &self.tasks
    }

    /// Shell state and notifications.
    #[must_use]
    pub const fn ui(&self) -> &UiStore {
        &self.ui
    }

    /// Uploads in flight.
    #[must_use]
    pub const fn uploads(&self) -> &UploadStore {
        &self.uploads
    }

    /// Local settings.
    #[must_use]
    pub const fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    /// Upload a file, request its analysis, and add it to the file store.
    ///
    /// The upload entry moves through `uploading`, `analyzing` and `success`,
    /// then leaves the list after the eviction delay. Failures leave it in
    /// `error` with the server detail or "Upload failed".
    ///
    /// # Errors
    ///
    /// Validation of the filename and size, or any client failure.
    pub async fn upload_and_analyze(&self, payload: FilePayload) -> ActionResult<RemoteFile> {
        let settings = self.settings.current();
        let filename = payload.filename().to_string();
        let size = payload.len();
        if let Err(err) = validate::upload_file(&filename, size, settings.max_file_size_bytes()) {
            return self.reject(err);
        }

        let upload_id = self.uploads.begin(filename.clone(), size);
        let progress_key = upload_id.to_string();
        let received = self
            .client
            .upload_file(payload)
            .drive(|percent| {
                self.uploads.set_progress(upload_id, percent);
                self.files.set_upload_progress(&progress_key, percent);
            })
            .await;
        self.files.clear_upload_progress(&progress_key);
        let receipt = match received {
            Ok(receipt) => receipt,
            Err(err) => return self.fail_upload(upload_id, &filename, err),
        };

        let mut file = RemoteFile::from(receipt);
        if settings.auto_analyze {
            self.uploads.mark_analyzing(upload_id);
            match self.client.analyze_file(&file.file_id).await {
                Ok(JobOutcome::Completed(document)) => {
                    FilePatch::from_analysis(&document).apply(&mut file);
                }
                Ok(JobOutcome::Queued(ticket)) => {
                    file.status = FileStatus::Processing;
                    self.tasks
                        .add_task(BackgroundTask::pending(ticket.task_id).for_file(&file.file_id));
                }
                Err(err) => return self.fail_upload(upload_id, &filename, err),
            }
        }

        self.files.add_file(file.clone());
        self.uploads.mark_success(upload_id);
        info!(file_id = %file.file_id, filename = %filename, size, "upload completed");
        self.ui.success(format!("{filename} uploaded successfully!"));
        Ok(file)
    }

    /// Fetch service counters and the most recent files concurrently.
    ///
    /// # Errors
    ///
    /// Either call failing.
    pub async fn load_dashboard(&self) -> ActionResult<DashboardOverview> {
        let (stats, recent) = tokio::join!(
            self.client.get_stats(),
            self.client.get_files(0, RECENT_FILES)
        );
        match (stats, recent) {
            (Ok(stats), Ok(recent)) => Ok(DashboardOverview {
                stats,
                recent_files: recent.files,
            }),
            (Err(err), _) | (_, Err(err)) => self.report(err, "Failed to load dashboard data"),
        }
    }

    /// Replace the file store with one page of the server listing.
    ///
    /// # Errors
    ///
    /// Client failure.
    pub async fn refresh_files(&self, skip: u32, limit: NonZeroU32) -> ActionResult<FileListResponse> {
        match self.client.get_files(skip, limit).await {
            Ok(page) => {
                self.files.set_files(page.files.clone());
                Ok(page)
            }
            Err(err) => self.report(err, "Failed to load files"),
        }
    }

    /// Fetch a file's full record and select it.
    ///
    /// # Errors
    ///
    /// Client failure, including an unknown id.
    pub async fn open_file(&self, file_id: &str) -> ActionResult<RemoteFile> {
        match self.client.get_file_info(file_id).await {
            Ok(file) => {
                self.files.upsert_file(file.clone());
                self.files.select_file(Some(file.clone()));
                Ok(file)
            }
            Err(err) => self.report(err, "Failed to load file details"),
        }
    }

    /// Delete a file after confirmation.
    ///
    /// # Errors
    ///
    /// [`ActionError::Declined`] when the prompt is refused (no request is
    /// issued), otherwise any client failure.
    pub async fn delete_file(&self, file_id: &str) -> ActionResult<()> {
        if !self.confirm.confirm(DELETE_FILE_PROMPT) {
            debug!(file_id, "file deletion declined");
            return Err(ActionError::Declined);
        }
        match self.client.delete_file(file_id).await {
            Ok(()) => {
                self.files.remove_file(file_id);
                self.ui.success("File deleted successfully");
                Ok(())
            }
            Err(err) => self.report(err, "Failed to delete file"),
        }
    }

    /// Request a full analysis of a file.
    ///
    /// # Errors
    ///
    /// Client failure.
    pub async fn start_analysis(&self, file_id: &str) -> ActionResult<JobOutcome> {
        let outcome = self.client.analyze_file(file_id).await;
        self.track_job(file_id, outcome, ANALYSIS, true)
    }

    /// Request data cleaning for a file.
    ///
    /// # Errors
    ///
    /// Client failure.
    pub async fn start_clean(&self, file_id: &str, strategy: CleanStrategy) -> ActionResult<JobOutcome> {
        let outcome = self.client.clean_data(file_id, strategy).await;
        self.track_job(file_id, outcome, CLEANING, false)
    }

    /// Request deduplication for a file.
    ///
    /// # Errors
    ///
    /// Client failure.
    pub async fn start_deduplicate(
        &self,
        file_id: &str,
        method: DedupMethod,
        keep: KeepPolicy,
    ) -> ActionResult<JobOutcome> {
        let outcome = self.client.deduplicate_data(file_id, method, keep).await;
        self.track_job(file_id, outcome, DEDUPLICATION, false)
    }

    /// Poll a task once and merge the response into the task store.
    ///
    /// The first transition into `SUCCESS` or `FAILURE` notifies the user and
    /// updates the status of the file the task belongs to.
    ///
    /// # Errors
    ///
    /// Client failure.
    pub async fn refresh_task(&self, task_id: &str) -> ActionResult<BackgroundTask> {
        let response = match self.client.get_task_status(task_id).await {
            Ok(response) => response,
            Err(err) => return self.report(err, "Failed to get task status"),
        };
        let was_terminal = self.tasks.get(task_id).is_some_and(|task| task.is_terminal());
        self.tasks.update_task(task_id, TaskPatch::from(response));
        let task = self
            .tasks
            .get(task_id)
            .unwrap_or_else(|| BackgroundTask::pending(task_id));

        if !was_terminal && task.is_terminal() {
            let file_status = if task.state == TaskState::Success {
                self.ui.success(format!("Task {task_id} completed"));
                FileStatus::Completed
            } else {
                self.ui.error(format!("Task {task_id} failed"));
                FileStatus::Failed
            };
            if let Some(file_id) = task.file_id.as_deref() {
                self.files.update_file(file_id, FilePatch::status(file_status));
            }
        }
        Ok(task)
    }

    /// Scrape one page.
    ///
    /// # Errors
    ///
    /// Blank URL or client failure.
    pub async fn scrape_single(&self, url: &str, method: ScrapeMethod) -> ActionResult<Document> {
        let url = match validate::url(url) {
            Ok(url) => url,
            Err(err) => return self.reject(err),
        };
        self.complete(
            self.client.scrape_url(&url, method),
            Some("Scraping completed successfully!".to_string()),
            "Scraping failed",
        )
        .await
    }

    /// Scrape every URL of a newline-separated list.
    ///
    /// # Errors
    ///
    /// Empty list, zero concurrency, or client failure.
    pub async fn scrape_many(
        &self,
        urls: &str,
        method: ScrapeMethod,
        max_concurrent: u32,
    ) -> ActionResult<Document> {
        let urls = match validate::url_list(urls) {
            Ok(urls) => urls,
            Err(err) => return self.reject(err),
        };
        let max_concurrent = match validate::max_concurrent(max_concurrent) {
            Ok(value) => value,
            Err(err) => return self.reject(err),
        };
        let success = format!("Scraped {} URLs successfully!", urls.len());
        self.complete(
            self.client.scrape_multiple(&urls, method, max_concurrent),
            Some(success),
            "Scraping failed",
        )
        .await
    }

    /// Crawl a site from `start_url`.
    ///
    /// # Errors
    ///
    /// Blank start URL, out-of-range limits, or client failure.
    pub async fn crawl(&self, start_url: &str, max_depth: u32, max_pages: u32) -> ActionResult<Document> {
        let checked = validate::start_url(start_url).and_then(|url| {
            let depth = validate::crawl_depth(max_depth)?;
            let pages = validate::crawl_pages(max_pages)?;
            Ok((url, depth, pages))
        });
        let (url, depth, pages) = match checked {
            Ok(checked) => checked,
            Err(err) => return self.reject(err),
        };
        self.complete(
            self.client.crawl_website(&url, depth, pages),
            Some("Website crawling completed!".to_string()),
            "Crawling failed",
        )
        .await
    }

    /// Extract HTML tables from a page.
    ///
    /// # Errors
    ///
    /// Blank URL or client failure.
    pub async fn extract_tables(&self, url: &str) -> ActionResult<Document> {
        let url = match validate::url(url) {
            Ok(url) => url,
            Err(err) => return self.reject(err),
        };
        self.complete(
            self.client.extract_tables(&url),
            Some("Tables extracted successfully!".to_string()),
            "Extraction failed",
        )
        .await
    }

    /// Analyse an account address.
    ///
    /// # Errors
    ///
    /// Malformed address or client failure.
    pub async fn lookup_address(&self, address: &str) -> ActionResult<Document> {
        let address = match validate::eth_address(address) {
            Ok(address) => address,
            Err(err) => return self.reject(err),
        };
        self.complete(
            self.client.analyze_blockchain_address(&address),
            Some("Address analyzed successfully!".to_string()),
            "Analysis failed",
        )
        .await
    }

    /// Fetch a transaction.
    ///
    /// # Errors
    ///
    /// Malformed hash or client failure.
    pub async fn lookup_transaction(&self, tx_hash: &str) -> ActionResult<Document> {
        let tx_hash = match validate::tx_hash(tx_hash) {
            Ok(hash) => hash,
            Err(err) => return self.reject(err),
        };
        self.complete(
            self.client.get_transaction(&tx_hash),
            Some("Transaction retrieved successfully!".to_string()),
            "Failed to get transaction",
        )
        .await
    }

    /// Fetch a block.
    ///
    /// # Errors
    ///
    /// Non-numeric input or client failure.
    pub async fn lookup_block(&self, block_number: &str) -> ActionResult<Document> {
        let block_number = match validate::block_number(block_number) {
            Ok(number) => number,
            Err(err) => return self.reject(err),
        };
        self.complete(
            self.client.get_block(block_number),
            Some("Block information retrieved!".to_string()),
            "Failed to get block",
        )
        .await
    }

    /// Current gas price tiers. Succeeds silently.
    ///
    /// # Errors
    ///
    /// Client failure.
    pub async fn gas_prices(&self) -> ActionResult<GasPrices> {
        self.complete(self.client.get_gas_prices(), None, "Failed to load gas prices")
            .await
    }

    /// Analyse a contract address.
    ///
    /// # Errors
    ///
    /// Malformed address or client failure.
    pub async fn lookup_contract(&self, address: &str) -> ActionResult<Document> {
        let address = match validate::contract_address(address) {
            Ok(address) => address,
            Err(err) => return self.reject(err),
        };
        self.complete(
            self.client.analyze_contract(&address),
            Some("Contract analyzed successfully!".to_string()),
            "Analysis failed",
        )
        .await
    }

    /// Commit the settings draft and apply its theme.
    pub fn save_settings(&self) {
        self.settings.save();
        self.ui.set_theme(self.settings.current().theme);
        self.ui.success("Settings saved successfully!");
    }

    /// Restore default settings after confirmation.
    ///
    /// # Errors
    ///
    /// [`ActionError::Declined`] when the prompt is refused.
    pub fn reset_settings(&self) -> ActionResult<()> {
        if !self.confirm.confirm(RESET_SETTINGS_PROMPT) {
            return Err(ActionError::Declined);
        }
        self.settings.reset();
        self.ui.set_theme(self.settings.current().theme);
        self.ui.success("Settings reset to defaults");
        Ok(())
    }

    fn track_job(
        &self,
        file_id: &str,
        outcome: ApiResult<JobOutcome>,
        labels: JobLabels,
        lifts_analysis: bool,
    ) -> ActionResult<JobOutcome> {
        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(err) => return self.report(err, labels.failed),
        };
        match &outcome {
            JobOutcome::Queued(ticket) => {
                self.tasks
                    .add_task(BackgroundTask::pending(ticket.task_id.clone()).for_file(file_id));
                self.files
                    .update_file(file_id, FilePatch::status(FileStatus::Processing));
                self.ui.info(labels.started);
            }
            JobOutcome::Completed(document) => {
                if lifts_analysis {
                    self.files
                        .update_file(file_id, FilePatch::from_analysis(document));
                }
                self.ui.success(labels.completed);
            }
        }
        Ok(outcome)
    }

    async fn complete<T>(
        &self,
        call: impl Future<Output = ApiResult<T>>,
        success: Option<String>,
        fallback: &str,
    ) -> ActionResult<T> {
        match call.await {
            Ok(value) => {
                if let Some(message) = success {
                    self.ui.success(message);
                }
                Ok(value)
            }
            Err(err) => self.report(err, fallback),
        }
    }

    fn fail_upload<T>(&self, upload_id: u64, filename: &str, err: ApiError) -> ActionResult<T> {
        self.uploads
            .mark_error(upload_id, err.user_message("Upload failed"));
        self.ui.error(format!("Failed to upload {filename}"));
        debug!(upload_id, error = %err, "upload failed");
        Err(err.into())
    }

    fn reject<T>(&self, err: ValidationError) -> ActionResult<T> {
        self.ui.error(err.to_string());
        Err(err.into())
    }

    fn report<T>(&self, err: ApiError, fallback: &str) -> ActionResult<T> {
        debug!(error = %err, status = ?err.status(), fallback, "action failed");
        self.ui.error(err.user_message(fallback));
        Err(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closures_act_as_confirmations() {
        let always = |_: &str| true;
        let never = |prompt: &str| prompt.is_empty();
        assert!(always.confirm(DELETE_FILE_PROMPT));
        assert!(!never.confirm(RESET_SETTINGS_PROMPT));
    }

    #[test]
    fn overview_shows_five_recent_files() {
        assert_eq!(RECENT_FILES.get(), 5);
    }
}
