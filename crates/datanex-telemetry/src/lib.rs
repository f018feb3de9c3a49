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

//! Logging setup shared by Datanex console binaries.
//!
//! Layout:
//! - `init.rs`: subscriber installation and logging configuration
//! - `context.rs`: spans that tag every event with the running command

pub mod context;
pub mod init;

pub use context::command_span;
pub use init::{
    DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, build_sha, init_logging, log_format_from_label,
};
