//! Client configuration resolved from explicit values or the environment.

use std::time::Duration;

/// Service endpoint used when nothing else is configured.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";
/// Request timeout applied when nothing else is configured.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
/// Environment variable consulted for the service endpoint.
pub const ENV_API_URL: &str = "DATANEX_API_URL";

/// Settings used to construct an [`ApiClient`](crate::ApiClient).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the service; validated when the client is built.
    pub base_url: String,
    /// Per-request timeout enforced by the transport.
    pub timeout: Duration,
}

impl ClientConfig {
    /// Configuration pointing at `base_url` with the default timeout.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Resolve the base URL from `DATANEX_API_URL`, falling back to the local
    /// development endpoint.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Override the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let base_url = lookup(ENV_API_URL)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        Self::new(base_url)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}
