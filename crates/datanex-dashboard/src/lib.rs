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

//! Client-side state for the Datanex console.
//!
//! Layout:
//! - `store/`: observable slices for files, tasks, uploads, UI and settings
//! - `validate.rs`: input checks run before any request
//! - `actions.rs`: page actions combining client calls with store updates
//! - `error.rs`: action failures

pub mod actions;
pub mod error;
pub mod store;
pub mod validate;

pub use actions::{Confirm, Dashboard, DashboardOverview};
pub use error::{ActionError, ActionResult};
pub use validate::ValidationError;
