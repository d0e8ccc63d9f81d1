use reqwest::StatusCode;
use thiserror::Error;

/// Errors that can occur when talking to the metrics API
#[derive(Error, Debug)]
pub enum MetricsApiError {
    /// Invalid request parameters (HTTP 400)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Invalid or missing API key (HTTP 401)
    #[error("Invalid API key - authentication failed")]
    Unauthorized,

    /// Forbidden - permission denied (HTTP 403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Workspace or resource not found (HTTP 404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Upstream throttling (HTTP 429)
    #[error("Rate limit exceeded - too many requests")]
    RateLimitExceeded,

    /// Server error from the metrics API (5xx)
    #[error("Server error ({0}): {1}")]
    ServerError(StatusCode, String),

    /// Request exceeded the configured timeout
    #[error("Request timeout after {0}s")]
    Timeout(u64),

    /// Network or connection error
    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    /// Response body was not valid JSON
    #[error("Invalid JSON response: {0}")]
    InvalidJson(String),

    /// Unknown or unexpected status
    #[error("Unexpected status ({0}): {1}")]
    Unexpected(StatusCode, String),
}

impl MetricsApiError {
    /// Classify a non-success response
    pub fn from_status(status: StatusCode, body: String) -> Self {
        match status.as_u16() {
            400 => Self::InvalidRequest(body),
            401 => Self::Unauthorized,
            403 => Self::Forbidden(body),
            404 => Self::NotFound(body),
            429 => Self::RateLimitExceeded,
            500..=599 => Self::ServerError(status, body),
            _ => Self::Unexpected(status, body),
        }
    }

    /// Map a transport-level failure, separating timeouts
    pub fn from_transport(err: reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            Self::Timeout(timeout_secs)
        } else {
            Self::Network(err)
        }
    }

    /// Returns true if a later identical request might succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimitExceeded | Self::ServerError(_, _) | Self::Timeout(_) | Self::Network(_)
        )
    }
}
