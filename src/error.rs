//! Error types for provider calls and search runs

use std::time::Duration;
use thiserror::Error;

/// Failures talking to the catalog or pricing service
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// Transport-level failure
    #[error("Request failed: {0}")]
    Request(String),

    /// Service answered with a non-success status
    #[error("Service error (status {status}): {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, if any
        body: String,
    },

    /// The per-call deadline elapsed
    #[error("Call timed out after {0:?}")]
    Timeout(Duration),
}

impl ProviderError {
    /// Map a transport error, recognising the client's own deadline
    pub fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout(timeout)
        } else {
            Self::Request(err.to_string())
        }
    }
}

/// Errors a search run surfaces to the presentation layer
#[derive(Debug, Clone, Error)]
pub enum SearchError {
    /// Rejected before a run was started
    #[error("Invalid search parameters: {0}")]
    InvalidParams(String),

    /// Pricing could not be fetched, so the run has no canonical set
    #[error("Pricing failed: {0}")]
    Pricing(#[from] ProviderError),
}
