//! Error handling for the blogsmith HTTP layer

use std::time::Duration;

use axum::{
    extract::rejection::JsonRejection,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Standard error response format for all HTTP errors
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<serde_json::Value>,
    pub trace_id: String,
}

/// Application error types that map to HTTP responses
#[derive(Error, Debug)]
pub enum AppError {
    #[error("validation error: {message}")]
    Validation {
        details: Vec<serde_json::Value>,
        code: String,
        message: String,
    },

    #[error("bad request: {message}")]
    BadRequest { message: String, code: String },

    #[error("forbidden: {message}")]
    Forbidden { message: String, code: String },

    #[error("too many requests: {message}")]
    TooManyRequests {
        message: String,
        code: String,
        retry_after: Duration,
    },

    /// A collaborator failed; `message` is what the client sees, `source`
    /// stays in the logs.
    #[error("upstream failure: {source:#}")]
    Upstream {
        message: String,
        code: String,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Create a validation error
    pub fn validation(details: Vec<serde_json::Value>, message: impl Into<String>) -> Self {
        Self::Validation {
            details,
            code: "validation_error".to_string(),
            message: message.into(),
        }
    }

    /// Create a bad request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
            code: "bad_request".to_string(),
        }
    }

    /// Create an error for a request whose origin is not allowed
    pub fn origin_not_allowed() -> Self {
        Self::Forbidden {
            message: "Origin not allowed".to_string(),
            code: "origin_not_allowed".to_string(),
        }
    }

    /// Create a rate limit error
    pub fn too_many_requests(message: impl Into<String>, retry_after: Duration) -> Self {
        Self::TooManyRequests {
            message: message.into(),
            code: "rate_limited".to_string(),
            retry_after,
        }
    }

    /// Create an upstream failure with a fixed client-facing message
    pub fn upstream(message: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Self::Upstream {
            message: message.into(),
            code: "upstream_error".to_string(),
            source: source.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            AppError::Forbidden { .. } => StatusCode::FORBIDDEN,
            AppError::TooManyRequests { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::Upstream { .. } | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::bad_request(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let trace_id = Uuid::now_v7();
        let status = self.status();

        match &self {
            AppError::Upstream { source, .. } => tracing::error!(
                trace_id = %trace_id,
                status_code = %status.as_u16(),
                error = %format!("{source:#}"),
                "upstream request failed"
            ),
            AppError::Internal(e) => tracing::error!(
                trace_id = %trace_id,
                status_code = %status.as_u16(),
                error = %format!("{e:#}"),
                "internal error"
            ),
            other => tracing::warn!(
                trace_id = %trace_id,
                status_code = %status.as_u16(),
                error = %other,
                "request rejected"
            ),
        }

        let mut retry_after = None;
        let (code, message, details) = match self {
            AppError::Validation {
                details,
                code,
                message,
            } => (code, message, details),
            AppError::BadRequest { message, code } | AppError::Forbidden { message, code } => {
                (code, message, Vec::new())
            }
            AppError::TooManyRequests {
                message,
                code,
                retry_after: wait,
            } => {
                retry_after = Some(wait);
                (code, message, Vec::new())
            }
            AppError::Upstream { message, code, .. } => (code, message, Vec::new()),
            AppError::Internal(_) => (
                "internal_error".to_string(),
                "An internal server error occurred".to_string(),
                Vec::new(),
            ),
        };

        let body = ErrorBody {
            error: message,
            code,
            details,
            trace_id: trace_id.to_string(),
        };

        let mut response = (status, Json(body)).into_response();
        if let Some(wait) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(ceil_secs(wait)));
        }
        response
    }
}

/// Whole seconds, rounded up, for `Retry-After` style headers.
pub fn ceil_secs(duration: Duration) -> u64 {
    let secs = duration.as_secs();
    if duration.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_validation_error() {
        let details = vec![serde_json::json!({"field": "topic", "error": "required"})];
        let error = AppError::validation(details.clone(), "Validation failed");

        match error {
            AppError::Validation {
                details: d,
                code,
                message,
            } => {
                assert_eq!(d, details);
                assert_eq!(code, "validation_error");
                assert_eq!(message, "Validation failed");
            }
            _ => panic!("Expected Validation error"),
        }
    }

    #[tokio::test]
    async fn test_too_many_requests_sets_retry_after() {
        let error = AppError::too_many_requests("slow down", Duration::from_millis(12_300));
        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "13");

        let body = body_json(response).await;
        assert_eq!(body["error"], "slow down");
        assert_eq!(body["code"], "rate_limited");
    }

    #[tokio::test]
    async fn test_upstream_error_hides_source() {
        let error = AppError::upstream(
            "Failed to generate blog post",
            anyhow::anyhow!("connection refused to 10.0.0.7"),
        );
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["error"], "Failed to generate blog post");
        assert_eq!(body["code"], "upstream_error");
        assert!(body.get("details").is_none());
        assert!(!body.to_string().contains("10.0.0.7"));
    }

    #[tokio::test]
    async fn test_internal_error_mapping() {
        let error = AppError::Internal(anyhow::anyhow!("lock poisoned"));
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["error"], "An internal server error occurred");
        assert!(body["trace_id"].as_str().is_some());
    }

    #[test]
    fn test_ceil_secs() {
        assert_eq!(ceil_secs(Duration::from_secs(60)), 60);
        assert_eq!(ceil_secs(Duration::from_millis(1)), 1);
        assert_eq!(ceil_secs(Duration::ZERO), 0);
    }
}
