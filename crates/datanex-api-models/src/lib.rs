#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
//! Shared HTTP DTOs for the Datanex analysis API.
//!
//! These types are used by the client, the dashboard stores and the CLI for
//! request/response encoding so the wire contract lives in one place. Payloads
//! the console never inspects (scrape, crawl and chain reports) stay as opaque
//! [`Document`] values.
use std::fmt::{self, Display, Formatter};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Opaque JSON document passed through verbatim.
pub type Document = Value;

/// Error body emitted by the service on 4xx/5xx responses.
///
/// `detail` is usually a string; request validation failures carry a list of
/// `{loc, msg, type}` entries instead.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorDetail {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Failure description as sent by the service.
    pub detail: Option<Value>,
}

impl ErrorDetail {
    /// Error body carrying a plain message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            detail: Some(Value::String(message.into())),
        }
    }

    /// Flatten the detail into a single human-readable message.
    #[must_use]
    pub fn message(&self) -> Option<String> {
        match self.detail.as_ref()? {
            Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
            Value::Array(entries) => {
                let parts: Vec<&str> = entries
                    .iter()
                    .filter_map(|entry| entry.get("msg").and_then(Value::as_str))
                    .collect();
                if parts.is_empty() {
                    None
                } else {
                    Some(parts.join("; "))
                }
            }
            _ => None,
        }
    }
}

/// Lifecycle status of an uploaded file.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    /// Stored but not yet processed.
    #[default]
    Uploaded,
    /// Analysis is running.
    Processing,
    /// Analysis finished.
    Completed,
    /// Processing failed.
    Failed,
}

impl FileStatus {
    /// Stable wire label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Uploaded => "uploaded",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

/// File type detected by the service.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    /// Comma separated values.
    Csv,
    /// Excel workbook.
    Excel,
    /// JSON document.
    Json,
    /// XML document.
    Xml,
    /// Parquet columnar file.
    Parquet,
    /// PDF document.
    Pdf,
    /// Word document.
    Docx,
    /// Plain text.
    Txt,
    /// HTML page.
    Html,
    /// SQL dump.
    Sql,
    /// Not yet detected or not recognised.
    #[default]
    #[serde(other)]
    Unknown,
}

impl FileType {
    /// Stable wire label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Excel => "excel",
            Self::Json => "json",
            Self::Xml => "xml",
            Self::Parquet => "parquet",
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Txt => "txt",
            Self::Html => "html",
            Self::Sql => "sql",
            Self::Unknown => "unknown",
        }
    }
}

/// Server-tracked uploaded artifact and its analysis state.
///
/// List endpoints return a subset of the fields; everything beyond the id and
/// filename is therefore optional or defaulted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemoteFile {
    /// Unique identifier assigned by the service.
    pub file_id: String,
    /// Original filename supplied at upload time.
    pub filename: String,
    #[serde(default, alias = "size", skip_serializing_if = "Option::is_none")]
    /// Size of the payload in bytes.
    pub file_size: Option<u64>,
    #[serde(default)]
    /// Detected file type.
    pub file_type: FileType,
    #[serde(default)]
    /// Lifecycle status.
    pub status: FileStatus,
    #[serde(
        default,
        deserialize_with = "deserialize_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    /// Creation timestamp.
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Row count for tabular payloads.
    pub row_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Column count for tabular payloads.
    pub column_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Arbitrary extracted metadata.
    pub metadata: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Quality score in the range 0–100.
    pub quality_score: Option<u8>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    /// Category labels produced by analysis.
    pub categories: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    /// Free-form tags produced by analysis.
    pub tags: Vec<String>,
}

impl RemoteFile {
    /// Minimal record with only the identity fields populated.
    #[must_use]
    pub fn new(file_id: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            file_id: file_id.into(),
            filename: filename.into(),
            file_size: None,
            file_type: FileType::Unknown,
            status: FileStatus::Uploaded,
            created_at: None,
            row_count: None,
            column_count: None,
            metadata: None,
            quality_score: None,
            categories: Vec::new(),
            tags: Vec::new(),
        }
    }

    /// Analysis summary when the service has scored the file.
    #[must_use]
    pub fn analysis(&self) -> Option<AnalysisSummary> {
        self.quality_score.map(|quality_score| AnalysisSummary {
            quality_score,
            categories: self.categories.clone(),
        })
    }
}

/// Quality score and category labels attached to an analysed file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnalysisSummary {
    /// Quality score in the range 0–100.
    pub quality_score: u8,
    /// Category labels.
    pub categories: Vec<String>,
}

/// Response of `POST /upload/file`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadReceipt {
    /// Identifier of the created file.
    pub file_id: String,
    /// Filename echoed by the service.
    pub filename: String,
    #[serde(default)]
    /// Stored payload size in bytes.
    pub size: u64,
    #[serde(default)]
    /// Initial lifecycle status.
    pub status: FileStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Background processing task spawned for the upload.
    pub task_id: Option<String>,
}

impl From<UploadReceipt> for RemoteFile {
    fn from(receipt: UploadReceipt) -> Self {
        let mut file = Self::new(receipt.file_id, receipt.filename);
        file.file_size = Some(receipt.size);
        file.status = receipt.status;
        file
    }
}

/// Response of `GET /upload/files`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FileListResponse {
    #[serde(default)]
    /// Number of entries in this page.
    pub total: u64,
    #[serde(default)]
    /// Offset applied by the service.
    pub skip: u32,
    #[serde(default)]
    /// Page size applied by the service.
    pub limit: u32,
    #[serde(default)]
    /// File summaries.
    pub files: Vec<RemoteFile>,
}

/// Strategy used when cleaning missing values.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CleanStrategy {
    /// Drop incomplete rows.
    #[default]
    Drop,
    /// Fill gaps with inferred values.
    Fill,
    /// Keep rows but flag them.
    Flag,
}

/// Duplicate detection method.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DedupMethod {
    /// Byte-identical rows only.
    Exact,
    /// Approximate string matching.
    Fuzzy,
    /// Embedding similarity.
    Semantic,
    /// Combination of the above.
    #[default]
    Hybrid,
}

/// Which duplicate survives deduplication.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum KeepPolicy {
    /// Keep the first occurrence.
    #[default]
    First,
    /// Keep the last occurrence.
    Last,
    /// Drop every duplicate.
    None,
}

/// Scraping backend selected for a request.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScrapeMethod {
    /// Plain HTTP fetch.
    #[default]
    Requests,
    /// Headless browser rendering.
    Playwright,
    /// Scrapy spider.
    Scrapy,
}

/// Body of `POST /analyze/full`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnalyzeRequest {
    /// Target file.
    pub file_id: String,
}

/// Body of `POST /analyze/clean`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CleanRequest {
    /// Target file.
    pub file_id: String,
    /// Cleaning strategy.
    pub strategy: CleanStrategy,
}

/// Body of `POST /analyze/deduplicate`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeduplicateRequest {
    /// Target file.
    pub file_id: String,
    /// Detection method.
    pub method: DedupMethod,
    /// Survivor policy.
    pub keep: KeepPolicy,
}

/// Ticket returned when the service queues a job instead of answering inline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobTicket {
    /// Identifier to poll via `GET /analyze/task/{id}`.
    pub task_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Server acknowledgement message.
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// File the job operates on.
    pub file_id: Option<String>,
}

/// Result of submitting an analysis or data-quality job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum JobOutcome {
    /// Job was queued; poll the ticket's task id.
    Queued(JobTicket),
    /// Job completed synchronously with the given result document.
    Completed(Document),
}

impl JobOutcome {
    /// Task identifier when the job was queued.
    #[must_use]
    pub fn task_id(&self) -> Option<&str> {
        match self {
            Self::Queued(ticket) => Some(ticket.task_id.as_str()),
            Self::Completed(_) => None,
        }
    }
}

/// State label reported for a background task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskState {
    /// Waiting to be executed (or unknown to the worker).
    Pending,
    /// Running and reporting progress.
    Progress,
    /// Finished successfully.
    Success,
    /// Finished with an error.
    Failure,
    /// Any other state label, preserved verbatim.
    Other(String),
}

impl TaskState {
    /// Whether the task has reached a final state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failure)
    }

    /// Wire label for the state.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "PENDING",
            Self::Progress => "PROGRESS",
            Self::Success => "SUCCESS",
            Self::Failure => "FAILURE",
            Self::Other(label) => label.as_str(),
        }
    }
}

impl From<String> for TaskState {
    fn from(value: String) -> Self {
        match value.as_str() {
            "PENDING" => Self::Pending,
            "PROGRESS" => Self::Progress,
            "SUCCESS" => Self::Success,
            "FAILURE" => Self::Failure,
            _ => Self::Other(value),
        }
    }
}

impl From<TaskState> for String {
    fn from(value: TaskState) -> Self {
        match value {
            TaskState::Other(label) => label,
            other => other.as_str().to_string(),
        }
    }
}

impl Display for TaskState {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Response of `GET /analyze/task/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskStatusResponse {
    /// Current task state.
    pub state: TaskState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Human-readable status line.
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Current step label while in progress.
    pub current: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Progress percentage while in progress.
    pub progress: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Result payload once successful.
    pub result: Option<Document>,
}

/// Body of `POST /scrape/url`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScrapeUrlRequest {
    /// Page to fetch.
    pub url: String,
    /// Scraping backend.
    pub method: ScrapeMethod,
}

/// Body of `POST /scrape/multiple`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScrapeMultipleRequest {
    /// Pages to fetch.
    pub urls: Vec<String>,
    /// Scraping backend.
    pub method: ScrapeMethod,
    /// Upper bound on concurrent fetches performed by the service.
    pub max_concurrent: u32,
}

/// Body of `POST /scrape/crawl`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CrawlRequest {
    /// Entry point of the crawl.
    pub start_url: String,
    /// Maximum link depth.
    pub max_depth: u32,
    /// Maximum number of pages.
    pub max_pages: u32,
}

/// Body of the address-based blockchain endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AddressRequest {
    /// Hex encoded account or contract address.
    pub address: String,
}

/// Body of `POST /blockchain/transaction`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransactionRequest {
    /// Hex encoded transaction hash.
    pub tx_hash: String,
}

/// Body of `POST /blockchain/block`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlockRequest {
    /// Block height.
    pub block_number: u64,
}

/// Gas price tiers in gwei. Missing tiers render as unavailable.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GasPrices {
    #[serde(default)]
    /// Slow tier.
    pub low: Option<f64>,
    #[serde(default)]
    /// Standard tier.
    pub medium: Option<f64>,
    #[serde(default)]
    /// Fast tier.
    pub high: Option<f64>,
    #[serde(flatten)]
    /// Any additional fields reported by the service.
    pub extra: Map<String, Value>,
}

/// Response of `GET /stats`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceStats {
    #[serde(default)]
    /// Files tracked by the service.
    pub total_files: u64,
    #[serde(default)]
    /// Analyses recorded.
    pub total_analyses: u64,
    #[serde(default)]
    /// Background tasks recorded.
    pub total_tasks: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Service name.
    pub service: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Service version.
    pub version: Option<String>,
}

/// Response of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthStatus {
    /// `healthy` or `unhealthy`.
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Database connectivity label.
    pub database: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Service name.
    pub service: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Failure description when unhealthy.
    pub error: Option<String>,
}

impl HealthStatus {
    /// Whether the service reported itself healthy.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

/// Accepts RFC 3339 timestamps and naive ISO-8601 timestamps (read as UTC).
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    raw.map(|value| {
        parse_timestamp(&value)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{value}'")))
    })
    .transpose()
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .ok()
        .or_else(|| value.parse::<NaiveDateTime>().ok().map(|naive| naive.and_utc()))
}
