#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]

//! Typed HTTP client for the Datanex analysis API.
//!
//! Layout:
//! - `config.rs`: base URL and timeout resolution
//! - `auth.rs`: bearer token storage and the login redirect hook
//! - `client.rs`: request plumbing and one method per endpoint
//! - `upload.rs`: multipart upload with a progress event stream
//! - `error.rs`: failure normalisation

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod upload;

pub use auth::{FileTokenStore, LoginRedirect, MemoryTokenStore, TokenStore, TokenStoreError};
pub use client::ApiClient;
pub use config::{ClientConfig, DEFAULT_API_URL, DEFAULT_TIMEOUT_SECS, ENV_API_URL};
pub use error::{ApiError, ApiResult};
pub use upload::{FilePayload, UploadEvent, UploadStream};
