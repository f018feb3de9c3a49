//! Sample records and mock-server wiring.

use std::sync::Arc;

use datanex_api_models::{FileStatus, RemoteFile};
use datanex_client::{ApiClient, ApiResult, ClientConfig};
use httpmock::MockServer;
use serde_json::{Value, json};

use crate::mocks::AuthFakes;

/// Build a client pointed at `server` using the supplied fakes.
///
/// # Errors
///
/// Returns an error if the mock server URL cannot be used as a base URL.
pub fn client_for(server: &MockServer, fakes: &AuthFakes) -> ApiResult<ApiClient> {
    ApiClient::new(
        &ClientConfig::new(server.base_url()),
        fakes.tokens.clone(),
        fakes.redirect.clone(),
    )
}

/// Full file record as returned by `GET /upload/file/{id}`.
#[must_use]
pub fn file_record_json(file_id: &str, filename: &str) -> Value {
    json!({
        "file_id": file_id,
        "filename": filename,
        "file_type": "csv",
        "file_size": 1_024,
        "status": "completed",
        "row_count": 10,
        "column_count": 3,
        "categories": ["sales"],
        "tags": [],
        "quality_score": 92,
        "created_at": "2024-05-01T08:00:00.000001",
        "metadata": {"delimiter": ","}
    })
}

/// File summary as returned inside `GET /upload/files`.
#[must_use]
pub fn file_summary_json(file_id: &str, filename: &str) -> Value {
    json!({
        "file_id": file_id,
        "filename": filename,
        "file_type": "csv",
        "status": "uploaded",
        "created_at": "2024-05-01T08:00:00"
    })
}

/// Typed file record with the given id and status.
#[must_use]
pub fn remote_file(file_id: &str, status: FileStatus) -> RemoteFile {
    let mut file = RemoteFile::new(file_id, format!("{file_id}.csv"));
    file.status = status;
    file.file_size = Some(2_048);
    file
}
