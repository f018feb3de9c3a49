//! Multipart upload payloads and the progress event stream.
//!
//! # Design
//! - Progress is produced by the request body itself: each chunk handed to the
//!   transport advances the percentage, so events arrive in transfer order.
//! - Percentages never decrease and a successful upload always reports 100
//!   before its terminal event.
//! - Dropping the stream stops observation; the request still completes.

use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::task::{Context, Poll};

use datanex_api_models::UploadReceipt;
use futures_util::Stream;
use reqwest::Body;
use reqwest::multipart::{Form, Part};
use tokio::sync::mpsc;

use crate::error::{ApiError, ApiResult};

/// Size of each body chunk handed to the transport.
const UPLOAD_CHUNK_BYTES: usize = 64 * 1024;

/// File contents queued for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePayload {
    filename: String,
    bytes: Vec<u8>,
}

impl FilePayload {
    /// Payload with an explicit filename.
    #[must_use]
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }

    /// Read a payload from disk, keeping the final path component as filename.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Payload`] when the file cannot be read.
    pub async fn from_path(path: &Path) -> ApiResult<Self> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| ApiError::Payload {
                path: path.to_path_buf(),
                source,
            })?;
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("upload")
            .to_string();
        Ok(Self::new(filename, bytes))
    }

    /// Filename sent with the multipart part.
    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Payload size in bytes.
    #[must_use]
    pub fn len(&self) -> u64 {
        u64::try_from(self.bytes.len()).unwrap_or(u64::MAX)
    }

    /// Whether the payload carries no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// MIME type inferred from the filename extension.
    #[must_use]
    pub fn content_type(&self) -> &'static str {
        let extension = Path::new(&self.filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("csv") => "text/csv",
            Some("xlsx") => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            Some("xls") => "application/vnd.ms-excel",
            Some("json") => "application/json",
            Some("xml") => "application/xml",
            Some("pdf") => "application/pdf",
            Some("txt") => "text/plain",
            _ => "application/octet-stream",
        }
    }

    pub(crate) fn into_form(self, reporter: Arc<ProgressReporter>) -> ApiResult<Form> {
        let length = self.len();
        let content_type = self.content_type();
        let body = progress_body(self.bytes, reporter);
        let part = Part::stream_with_length(body, length)
            .file_name(self.filename)
            .mime_str(content_type)
            .map_err(|source| ApiError::Transport { source })?;
        Ok(Form::new().part("file", part))
    }
}

/// Event produced while an upload is in flight.
#[derive(Debug)]
pub enum UploadEvent {
    /// Percentage of the payload handed to the transport (0–100).
    Progress(u8),
    /// Terminal event carrying the service response or the failure.
    Finished(ApiResult<UploadReceipt>),
}

/// Ordered stream of [`UploadEvent`]s for one upload.
#[derive(Debug)]
pub struct UploadStream {
    receiver: mpsc::UnboundedReceiver<UploadEvent>,
}

impl UploadStream {
    pub(crate) fn channel(total: u64) -> (Self, Arc<ProgressReporter>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let _ = sender.send(UploadEvent::Progress(0));
        let reporter = Arc::new(ProgressReporter {
            sender,
            last: AtomicU8::new(0),
            total,
        });
        (Self { receiver }, reporter)
    }

    /// Wait for the next event; `None` once the terminal event was consumed.
    pub async fn next_event(&mut self) -> Option<UploadEvent> {
        self.receiver.recv().await
    }

    /// Consume the stream, invoking `on_progress` for every progress event.
    ///
    /// # Errors
    ///
    /// Returns the upload failure, or [`ApiError::UploadAborted`] when the
    /// stream closed without a terminal event.
    pub async fn drive(mut self, mut on_progress: impl FnMut(u8)) -> ApiResult<UploadReceipt> {
        while let Some(event) = self.receiver.recv().await {
            match event {
                UploadEvent::Progress(percent) => on_progress(percent),
                UploadEvent::Finished(outcome) => return outcome,
            }
        }
        Err(ApiError::UploadAborted)
    }

    /// Consume the stream, ignoring progress.
    ///
    /// # Errors
    ///
    /// Same as [`UploadStream::drive`].
    pub async fn finish(self) -> ApiResult<UploadReceipt> {
        self.drive(|_| {}).await
    }
}

impl Stream for UploadStream {
    type Item = UploadEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

/// Producer side of an [`UploadStream`].
#[derive(Debug)]
pub(crate) struct ProgressReporter {
    sender: mpsc::UnboundedSender<UploadEvent>,
    last: AtomicU8,
    total: u64,
}

impl ProgressReporter {
    fn report_bytes(&self, sent: u64) {
        self.report(percent_of(sent, self.total));
    }

    pub(crate) fn report(&self, percent: u8) {
        let percent = percent.min(100);
        let previous = self.last.fetch_max(percent, Ordering::SeqCst);
        if percent > previous {
            let _ = self.sender.send(UploadEvent::Progress(percent));
        }
    }

    pub(crate) fn finish(&self, outcome: ApiResult<UploadReceipt>) {
        let _ = self.sender.send(UploadEvent::Finished(outcome));
    }
}

fn progress_body(bytes: Vec<u8>, reporter: Arc<ProgressReporter>) -> Body {
    Body::wrap_stream(payload_chunks(bytes, reporter))
}

/// Chunks are copied out of `bytes` one at a time as the transport polls.
fn payload_chunks(
    bytes: Vec<u8>,
    reporter: Arc<ProgressReporter>,
) -> impl Stream<Item = Result<Vec<u8>, std::io::Error>> + Send + 'static {
    futures_util::stream::unfold(0_usize, move |offset| {
        let next = (offset < bytes.len()).then(|| {
            let end = offset.saturating_add(UPLOAD_CHUNK_BYTES).min(bytes.len());
            reporter.report_bytes(u64::try_from(end).unwrap_or(u64::MAX));
            (Ok::<_, std::io::Error>(bytes[offset..end].to_vec()), end)
        });
        async move { next }
    })
}

fn percent_of(sent: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    let sent = sent.min(total);
    let scaled = (u128::from(sent) * 100 + u128::from(total) / 2) / u128::from(total);
    u8::try_from(scaled).unwrap_or(100)
}
