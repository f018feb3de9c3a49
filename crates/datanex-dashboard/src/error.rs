//! Failures surfaced by page actions.

use datanex_client::ApiError;
use thiserror::Error;

use crate::validate::ValidationError;

/// Result alias for page actions.
pub type ActionResult<T> = Result<T, ActionError>;

/// Why an action did not complete.
#[derive(Debug, Error)]
pub enum ActionError {
    /// Input was rejected before any request was issued.
    #[error("input rejected")]
    Validation(#[from] ValidationError),
    /// The service call failed.
    #[error("service call failed")]
    Api {
        /// Underlying client failure.
        #[from]
        source: ApiError,
    },
    /// The user declined a confirmation prompt.
    #[error("action declined")]
    Declined,
}

impl ActionError {
    /// Client failure, when the service was reached.
    #[must_use]
    pub const fn api(&self) -> Option<&ApiError> {
        match self {
            Self::Api { source } => Some(source),
            _ => None,
        }
    }

    /// Whether the failure came from local validation.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
