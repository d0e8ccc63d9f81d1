//! Domain errors for the brandpulse data layer.

use thiserror::Error;

/// Errors surfaced by the data service.
///
/// Every variant carries owned strings so the error is `Clone`: a single
/// coalesced fetch failure is delivered to every waiter on that key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Upstream request failed: {0}")]
    Upstream(String),

    #[error("Unexpected payload shape: {0}")]
    UnexpectedShape(String),

    #[error("Rate limited: retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },
}

impl ServiceError {
    /// Stable machine-readable code used in response envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Upstream(_) => "UPSTREAM_ERROR",
            Self::UnexpectedShape(_) => "UNEXPECTED_SHAPE",
            Self::RateLimited { .. } => "RATE_LIMITED",
        }
    }

    /// Wrap an upstream failure, keeping the full context chain as text.
    pub fn upstream(err: &anyhow::Error) -> Self {
        Self::Upstream(format!("{err:#}"))
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        Self::UnexpectedShape(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(ServiceError::NotFound("x".into()).code(), "NOT_FOUND");
        assert_eq!(
            ServiceError::ServiceUnavailable("off".into()).code(),
            "SERVICE_UNAVAILABLE"
        );
        assert_eq!(ServiceError::Upstream("boom".into()).code(), "UPSTREAM_ERROR");
        assert_eq!(
            ServiceError::RateLimited { retry_after_ms: 10 }.code(),
            "RATE_LIMITED"
        );
    }

    #[test]
    fn test_upstream_keeps_context_chain() {
        let err = anyhow::anyhow!("connection refused").context("Failed to fetch narratives");
        let wrapped = ServiceError::upstream(&err);
        assert_eq!(
            wrapped,
            ServiceError::Upstream("Failed to fetch narratives: connection refused".into())
        );
    }
}
