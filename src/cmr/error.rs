//! Typed errors for CMR searches
//!
//! Every variant renders with the same `Failed to search CMR collections:`
//! prefix so callers can surface the message to the model unchanged.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CmrError {
    /// The request never produced a response (connection refused, DNS, ...)
    #[error("Failed to search CMR collections: {0}")]
    Network(String),

    /// No response within the configured timeout
    #[error("Failed to search CMR collections: request timed out after {0}s")]
    Timeout(u64),

    /// CMR answered with a non-2xx status
    #[error("Failed to search CMR collections: CMR returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    /// The body was not a CMR search response
    #[error("Failed to search CMR collections: invalid response body: {0}")]
    Decode(String),

    /// The search URL could not be built from the configured base URL
    #[error("Failed to search CMR collections: invalid base URL: {0}")]
    InvalidUrl(String),
}

impl CmrError {
    /// Classify a reqwest failure
    pub fn from_request_error(e: reqwest::Error, timeout_secs: u64) -> Self {
        if e.is_timeout() {
            CmrError::Timeout(timeout_secs)
        } else if e.is_decode() {
            CmrError::Decode(e.to_string())
        } else {
            CmrError::Network(e.to_string())
        }
    }
}
