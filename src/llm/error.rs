//! Typed errors for LLM operations

use thiserror::Error;

/// LLM operation errors, classified by HTTP status or transport failure
///
/// Nothing in the chat loop retries; the variants exist so the chat
/// backend can report a precise reason in the stream's `error` event.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Missing or rejected credentials (HTTP 401/403, or no API key)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Quota exceeded (HTTP 429)
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Malformed request (HTTP 400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Server-side error (HTTP 5xx)
    #[error("Service error: {0}")]
    ServiceError(String),

    /// Connection refused, timeout, broken stream
    #[error("Network error: {0}")]
    Network(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl LlmError {
    /// Convert HTTP status code and error text into typed LlmError
    pub fn from_http_status(status: reqwest::StatusCode, error_text: String) -> Self {
        match status.as_u16() {
            401 | 403 => LlmError::Unauthorized(error_text),
            429 => LlmError::RateLimited(error_text),
            400 => LlmError::BadRequest(error_text),
            500..=599 => LlmError::ServiceError(error_text),
            _ => LlmError::Other(anyhow::anyhow!("HTTP {}: {}", status, error_text)),
        }
    }

    /// Convert network/connection errors into typed LlmError
    pub fn from_network_error(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LlmError::Network(format!("Request timeout: {}", e))
        } else if e.is_connect() {
            LlmError::Network(format!("Connection failed: {}", e))
        } else if let Some(status) = e.status() {
            Self::from_http_status(status, e.to_string())
        } else {
            LlmError::Other(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_http_status() {
        let err = LlmError::from_http_status(
            reqwest::StatusCode::UNAUTHORIZED,
            "Invalid token".to_string(),
        );
        assert!(matches!(err, LlmError::Unauthorized(_)));

        let err =
            LlmError::from_http_status(reqwest::StatusCode::FORBIDDEN, "No access".to_string());
        assert!(matches!(err, LlmError::Unauthorized(_)));

        let err = LlmError::from_http_status(
            reqwest::StatusCode::TOO_MANY_REQUESTS,
            "Rate limit exceeded".to_string(),
        );
        assert!(matches!(err, LlmError::RateLimited(_)));

        let err = LlmError::from_http_status(
            reqwest::StatusCode::BAD_GATEWAY,
            "upstream down".to_string(),
        );
        assert!(matches!(err, LlmError::ServiceError(_)));

        let err = LlmError::from_http_status(reqwest::StatusCode::NOT_FOUND, "no".to_string());
        assert!(err.to_string().contains("404"));
    }

    #[test]
    fn test_convert_to_anyhow() {
        let anyhow_err: anyhow::Error = LlmError::RateLimited("slow down".to_string()).into();
        assert_eq!(anyhow_err.to_string(), "Rate limited: slow down");
    }
}
