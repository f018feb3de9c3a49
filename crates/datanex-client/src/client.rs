//! Request plumbing and one method per service endpoint.

use std::num::NonZeroU32;
use std::sync::Arc;

use datanex_api_models::{
    AddressRequest, AnalyzeRequest, BlockRequest, CleanRequest, CleanStrategy, CrawlRequest,
    DedupMethod, DeduplicateRequest, Document, ErrorDetail, FileListResponse, GasPrices,
    HealthStatus, JobOutcome, KeepPolicy, RemoteFile, ScrapeMethod, ScrapeMultipleRequest,
    ScrapeUrlRequest, ServiceStats, TaskStatusResponse, TransactionRequest, UploadReceipt,
};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::auth::{LoginRedirect, TokenStore};
use crate::config::ClientConfig;
use crate::error::{ApiError, ApiResult};
use crate::upload::{FilePayload, ProgressReporter, UploadStream};

/// Single point of outbound communication with the analysis service.
///
/// Every request carries `Authorization: Bearer <token>` when the token store
/// holds one. A 401 answer clears the token and fires the login redirect before
/// the call fails with [`ApiError::AuthExpired`].
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
    tokens: Arc<dyn TokenStore>,
    redirect: Arc<dyn LoginRedirect>,
}

impl ApiClient {
    /// Build a client for `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidUrl`] when the base URL cannot address HTTP
    /// paths and [`ApiError::Transport`] when the HTTP client cannot be built.
    pub fn new(
        config: &ClientConfig,
        tokens: Arc<dyn TokenStore>,
        redirect: Arc<dyn LoginRedirect>,
    ) -> ApiResult<Self> {
        let raw = config.base_url.trim();
        let base_url = Url::parse(raw).map_err(|source| ApiError::InvalidUrl {
            url: raw.to_string(),
            source,
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl {
                url: raw.to_string(),
                source: url::ParseError::RelativeUrlWithCannotBeABaseBase,
            });
        }

        let mut default_headers = HeaderMap::new();
        default_headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .timeout(config.timeout)
            .default_headers(default_headers)
            .build()
            .map_err(|source| ApiError::Transport { source })?;

        Ok(Self {
            http,
            base_url,
            tokens,
            redirect,
        })
    }

    /// Base URL requests are resolved against.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Start a multipart upload of `payload` to `POST /upload/file`.
    ///
    /// The returned stream yields non-decreasing progress percentages, ending at
    /// 100 on success, followed by exactly one terminal event. Must be called
    /// from within a Tokio runtime.
    #[must_use]
    pub fn upload_file(&self, payload: FilePayload) -> UploadStream {
        let (stream, reporter) = UploadStream::channel(payload.len());
        let client = self.clone();
        tokio::spawn(async move {
            let outcome = client.send_upload(payload, Arc::clone(&reporter)).await;
            if outcome.is_ok() {
                reporter.report(100);
            }
            reporter.finish(outcome);
        });
        stream
    }

    /// Page through uploaded files via `GET /upload/files`.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] when the request fails or is rejected.
    pub async fn get_files(&self, skip: u32, limit: NonZeroU32) -> ApiResult<FileListResponse> {
        let request = self
            .http
            .get(self.endpoint(&["upload", "files"]))
            .query(&[("skip", skip), ("limit", limit.get())]);
        self.fetch("files.list", request).await
    }

    /// Fetch the full record for `file_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] for unknown ids.
    pub async fn get_file_info(&self, file_id: &str) -> ApiResult<RemoteFile> {
        let request = self.http.get(self.endpoint(&["upload", "file", file_id]));
        self.fetch("files.info", request).await
    }

    /// Delete `file_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] when the file is already gone.
    pub async fn delete_file(&self, file_id: &str) -> ApiResult<()> {
        let request = self.http.delete(self.endpoint(&["upload", "file", file_id]));
        self.execute("files.delete", request).await?;
        Ok(())
    }

    /// Trigger full analysis of `file_id`.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] when the request fails or is rejected.
    pub async fn analyze_file(&self, file_id: &str) -> ApiResult<JobOutcome> {
        let body = AnalyzeRequest {
            file_id: file_id.to_string(),
        };
        self.post("analyze.full", &["analyze", "full"], &body).await
    }

    /// Submit a cleaning job for `file_id`.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] when the request fails or is rejected.
    pub async fn clean_data(&self, file_id: &str, strategy: CleanStrategy) -> ApiResult<JobOutcome> {
        let body = CleanRequest {
            file_id: file_id.to_string(),
            strategy,
        };
        self.post("analyze.clean", &["analyze", "clean"], &body).await
    }

    /// Submit a deduplication job for `file_id`.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] when the request fails or is rejected.
    pub async fn deduplicate_data(
        &self,
        file_id: &str,
        method: DedupMethod,
        keep: KeepPolicy,
    ) -> ApiResult<JobOutcome> {
        let body = DeduplicateRequest {
            file_id: file_id.to_string(),
            method,
            keep,
        };
        self.post("analyze.deduplicate", &["analyze", "deduplicate"], &body)
            .await
    }

    /// Poll the status of a background task.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] when the request fails or is rejected.
    pub async fn get_task_status(&self, task_id: &str) -> ApiResult<TaskStatusResponse> {
        let request = self.http.get(self.endpoint(&["analyze", "task", task_id]));
        self.fetch("analyze.task", request).await
    }

    /// Scrape a single page.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] when the request fails or is rejected.
    pub async fn scrape_url(&self, url: &str, method: ScrapeMethod) -> ApiResult<Document> {
        let body = ScrapeUrlRequest {
            url: url.to_string(),
            method,
        };
        self.post("scrape.url", &["scrape", "url"], &body).await
    }

    /// Scrape several pages in one batch.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] when the request fails or is rejected.
    pub async fn scrape_multiple(
        &self,
        urls: &[String],
        method: ScrapeMethod,
        max_concurrent: u32,
    ) -> ApiResult<Document> {
        let body = ScrapeMultipleRequest {
            urls: urls.to_vec(),
            method,
            max_concurrent,
        };
        self.post("scrape.multiple", &["scrape", "multiple"], &body)
            .await
    }

    /// Crawl a site starting from `start_url`.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] when the request fails or is rejected.
    pub async fn crawl_website(
        &self,
        start_url: &str,
        max_depth: u32,
        max_pages: u32,
    ) -> ApiResult<Document> {
        let body = CrawlRequest {
            start_url: start_url.to_string(),
            max_depth,
            max_pages,
        };
        self.post("scrape.crawl", &["scrape", "crawl"], &body).await
    }

    /// Extract HTML tables from `url`.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] when the request fails or is rejected.
    pub async fn extract_tables(&self, url: &str) -> ApiResult<Document> {
        let request = self
            .http
            .post(self.endpoint(&["scrape", "extract-tables"]))
            .query(&[("url", url)]);
        self.fetch("scrape.extract_tables", request).await
    }

    /// Analyse an account address.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] when the request fails or is rejected.
    pub async fn analyze_blockchain_address(&self, address: &str) -> ApiResult<Document> {
        let body = AddressRequest {
            address: address.to_string(),
        };
        self.post(
            "blockchain.analyze_address",
            &["blockchain", "analyze-address"],
            &body,
        )
        .await
    }

    /// Look up a transaction by hash.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] when the request fails or is rejected.
    pub async fn get_transaction(&self, tx_hash: &str) -> ApiResult<Document> {
        let body = TransactionRequest {
            tx_hash: tx_hash.to_string(),
        };
        self.post("blockchain.transaction", &["blockchain", "transaction"], &body)
            .await
    }

    /// Look up a block by height.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] when the request fails or is rejected.
    pub async fn get_block(&self, block_number: u64) -> ApiResult<Document> {
        let body = BlockRequest { block_number };
        self.post("blockchain.block", &["blockchain", "block"], &body)
            .await
    }

    /// Current gas price tiers.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] when the request fails or is rejected.
    pub async fn get_gas_prices(&self) -> ApiResult<GasPrices> {
        let request = self.http.get(self.endpoint(&["blockchain", "gas-prices"]));
        self.fetch("blockchain.gas_prices", request).await
    }

    /// Analyse a contract address.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] when the request fails or is rejected.
    pub async fn analyze_contract(&self, address: &str) -> ApiResult<Document> {
        let body = AddressRequest {
            address: address.to_string(),
        };
        self.post(
            "blockchain.analyze_contract",
            &["blockchain", "analyze-contract"],
            &body,
        )
        .await
    }

    /// Aggregate service counters.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] when the request fails or is rejected.
    pub async fn get_stats(&self) -> ApiResult<ServiceStats> {
        let request = self.http.get(self.endpoint(&["stats"]));
        self.fetch("stats", request).await
    }

    /// Liveness probe. A 503 carrying a health body resolves as an unhealthy
    /// status rather than an error.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] when the request fails or is rejected.
    pub async fn health_check(&self) -> ApiResult<HealthStatus> {
        const OPERATION: &str = "health";
        let request = self.authorize(self.http.get(self.endpoint(&["health"])));
        let response = request
            .send()
            .await
            .map_err(|source| ApiError::Network {
                operation: OPERATION,
                source,
            })?;
        if response.status().is_success() || response.status() == StatusCode::SERVICE_UNAVAILABLE {
            return decode(OPERATION, response).await;
        }
        Err(self.classify(OPERATION, response).await)
    }

    async fn send_upload(
        &self,
        payload: FilePayload,
        reporter: Arc<ProgressReporter>,
    ) -> ApiResult<UploadReceipt> {
        let filename = payload.filename().to_string();
        let form = payload.into_form(reporter)?;
        let request = self
            .http
            .post(self.endpoint(&["upload", "file"]))
            .multipart(form);
        let receipt: UploadReceipt = self.fetch("upload.file", request).await?;
        tracing::info!(
            file_id = %receipt.file_id,
            filename = %filename,
            size = receipt.size,
            "upload accepted"
        );
        Ok(receipt)
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.tokens.load() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn post<B, T>(&self, operation: &'static str, segments: &[&str], body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.http.post(self.endpoint(segments)).json(body);
        self.fetch(operation, request).await
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> ApiResult<T> {
        let response = self.execute(operation, request).await?;
        decode(operation, response).await
    }

    async fn execute(&self, operation: &'static str, request: RequestBuilder) -> ApiResult<Response> {
        tracing::debug!(operation, "sending request");
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|source| ApiError::Network { operation, source })?;
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(self.classify(operation, response).await)
        }
    }

    async fn classify(&self, operation: &'static str, response: Response) -> ApiError {
        let status = response.status();
        let bytes = response.bytes().await.unwrap_or_default();
        let detail = serde_json::from_slice::<ErrorDetail>(&bytes)
            .ok()
            .and_then(|body| body.message());

        match status {
            StatusCode::UNAUTHORIZED => {
                self.expire_session(operation);
                ApiError::AuthExpired { operation, detail }
            }
            StatusCode::NOT_FOUND => ApiError::NotFound { operation, detail },
            _ => {
                tracing::debug!(operation, status = status.as_u16(), "request rejected");
                ApiError::Server {
                    operation,
                    status: status.as_u16(),
                    detail,
                }
            }
        }
    }

    fn expire_session(&self, operation: &'static str) {
        tracing::warn!(operation, "service rejected credentials; clearing stored token");
        if let Err(err) = self.tokens.clear() {
            tracing::warn!(error = %err, "failed to clear stored token");
        }
        self.redirect.redirect_to_login();
    }
}

async fn decode<T: DeserializeOwned>(operation: &'static str, response: Response) -> ApiResult<T> {
    response
        .json::<T>()
        .await
        .map_err(|source| ApiError::Decode { operation, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MemoryTokenStore;

    struct Silent;

    impl LoginRedirect for Silent {
        fn redirect_to_login(&self) {}
    }

    fn client_for(base: &str) -> ApiResult<ApiClient> {
        ApiClient::new(
            &ClientConfig::new(base),
            Arc::new(MemoryTokenStore::default()),
            Arc::new(Silent),
        )
    }

    #[test]
    fn endpoint_keeps_base_path_prefix() {
        let client = client_for("https://host.example/api/").expect("client");
        assert_eq!(
            client.endpoint(&["upload", "file", "abc"]).as_str(),
            "https://host.example/api/upload/file/abc"
        );
        let bare = client_for("http://localhost:8000").expect("client");
        assert_eq!(
            bare.endpoint(&["stats"]).as_str(),
            "http://localhost:8000/stats"
        );
    }

    #[test]
    fn endpoint_escapes_identifiers() {
        let client = client_for("http://localhost:8000").expect("client");
        assert_eq!(
            client.endpoint(&["analyze", "task", "a/b c"]).as_str(),
            "http://localhost:8000/analyze/task/a%2Fb%20c"
        );
    }

    #[test]
    fn invalid_base_urls_are_rejected() {
        assert!(matches!(
            client_for("not a url"),
            Err(ApiError::InvalidUrl { .. })
        ));
        assert!(matches!(
            client_for("mailto:ops@example.com"),
            Err(ApiError::InvalidUrl { .. })
        ));
    }
}
