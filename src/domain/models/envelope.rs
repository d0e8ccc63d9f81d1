//! Uniform response wrapper returned by every data service operation.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::domain::errors::ServiceError;

/// Error details carried inside a [`ResponseEnvelope`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl From<&ServiceError> for ErrorInfo {
    fn from(err: &ServiceError) -> Self {
        let (message, details) = match err {
            ServiceError::ServiceUnavailable(reason) => {
                ("Metrics service is unavailable".to_string(), Some(reason.clone()))
            }
            ServiceError::NotFound(what) => (format!("Not found: {what}"), None),
            ServiceError::Upstream(detail) => {
                ("Upstream metrics request failed".to_string(), Some(detail.clone()))
            }
            ServiceError::UnexpectedShape(detail) => {
                ("Upstream payload had an unexpected shape".to_string(), Some(detail.clone()))
            }
            ServiceError::RateLimited { retry_after_ms } => (
                "Too many requests to the metrics provider".to_string(),
                Some(format!("retry after {retry_after_ms}ms")),
            ),
        };

        Self {
            code: err.code().to_string(),
            message,
            details,
        }
    }
}

/// `{data, error, cached, timestamp}`.
///
/// Domain failures are reported through `error`; the envelope itself is
/// always a successful response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope<T> {
    pub data: Option<T>,
    pub error: Option<ErrorInfo>,
    pub cached: bool,
    /// Unix epoch milliseconds at which the envelope was produced.
    pub timestamp: i64,
}

impl<T> ResponseEnvelope<T> {
    pub fn ok(data: T, cached: bool) -> Self {
        Self {
            data: Some(data),
            error: None,
            cached,
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    pub fn err(error: &ServiceError) -> Self {
        Self {
            data: None,
            error: Some(ErrorInfo::from(error)),
            cached: false,
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

impl<T> From<Result<(T, bool), ServiceError>> for ResponseEnvelope<T> {
    fn from(result: Result<(T, bool), ServiceError>) -> Self {
        match result {
            Ok((data, cached)) => Self::ok(data, cached),
            Err(err) => Self::err(&err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_envelope_has_no_data() {
        let env: ResponseEnvelope<u32> =
            ResponseEnvelope::err(&ServiceError::NotFound("brand 'acme'".into()));
        assert!(env.data.is_none());
        assert!(!env.cached);
        let error = env.error.expect("error should be set");
        assert_eq!(error.code, "NOT_FOUND");
        assert!(error.message.contains("acme"));
    }

    #[test]
    fn test_upstream_details_are_retained() {
        let env: ResponseEnvelope<u32> =
            ResponseEnvelope::err(&ServiceError::Upstream("HTTP 502".into()));
        let error = env.error.unwrap();
        assert_eq!(error.details.as_deref(), Some("HTTP 502"));
    }

    #[test]
    fn test_serializes_null_fields() {
        let env = ResponseEnvelope::ok(vec![1, 2], true);
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["data"], serde_json::json!([1, 2]));
        assert!(json["error"].is_null());
        assert_eq!(json["cached"], true);
        assert!(json["timestamp"].as_i64().unwrap() > 0);
    }
}
