//! # Design
//!
//! - One error type for every client operation so callers match on the failure
//!   class (transport, auth, missing resource, server rejection).
//! - Messages are constant; the server `detail` and the operation name live in
//!   fields so callers can pick what to show.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias for client operations.
pub type ApiResult<T> = Result<T, ApiError>;

/// Failures surfaced by [`ApiClient`](crate::ApiClient) operations.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The configured base URL or a derived endpoint did not parse.
    #[error("invalid service url")]
    InvalidUrl {
        /// Offending URL text.
        url: String,
        /// Underlying parse error.
        source: url::ParseError,
    },
    /// Building the HTTP transport failed.
    #[error("failed to build http client")]
    Transport {
        /// Underlying reqwest error.
        source: reqwest::Error,
    },
    /// The request never produced a response.
    #[error("request failed to reach the service")]
    Network {
        /// Operation being performed.
        operation: &'static str,
        /// Underlying reqwest error.
        source: reqwest::Error,
    },
    /// The service answered 401; the stored token has been cleared.
    #[error("authentication expired")]
    AuthExpired {
        /// Operation being performed.
        operation: &'static str,
        /// Server-provided detail message.
        detail: Option<String>,
    },
    /// The service answered 404.
    #[error("resource not found")]
    NotFound {
        /// Operation being performed.
        operation: &'static str,
        /// Server-provided detail message.
        detail: Option<String>,
    },
    /// The service answered with another 4xx/5xx status.
    #[error("service rejected the request")]
    Server {
        /// Operation being performed.
        operation: &'static str,
        /// HTTP status code.
        status: u16,
        /// Server-provided detail message.
        detail: Option<String>,
    },
    /// The response body did not match the expected shape.
    #[error("failed to decode service response")]
    Decode {
        /// Operation being performed.
        operation: &'static str,
        /// Underlying reqwest error.
        source: reqwest::Error,
    },
    /// The upload task stopped before reporting a result.
    #[error("upload ended without a result")]
    UploadAborted,
    /// The local upload payload could not be read.
    #[error("failed to read upload payload")]
    Payload {
        /// File that could not be read.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
}

impl ApiError {
    /// Server-provided detail message, when the service sent one.
    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::AuthExpired { detail, .. }
            | Self::NotFound { detail, .. }
            | Self::Server { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }

    /// Message suitable for a notification: the server detail when present,
    /// otherwise `fallback`.
    #[must_use]
    pub fn user_message(&self, fallback: &str) -> String {
        self.detail().unwrap_or(fallback).to_string()
    }

    /// HTTP status associated with the failure, when a response arrived.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::AuthExpired { .. } => Some(401),
            Self::NotFound { .. } => Some(404),
            Self::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the failure was an authentication expiry.
    #[must_use]
    pub const fn is_auth_expired(&self) -> bool {
        matches!(self, Self::AuthExpired { .. })
    }
}
