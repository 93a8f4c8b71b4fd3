use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Unified application error type following OpenAI error format.
///
/// Policy denials and provider exhaustion carry the `request_id` so callers
/// can correlate a failure with its audit trail.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Policy denied: {reason}")]
    PolicyDenied { reason: String, request_id: String },

    #[error("all_providers_failed")]
    Exhausted {
        last_error: Option<String>,
        request_id: String,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

/// OpenAI-compatible error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Serialize)]
struct ErrorDetail {
    message: String,
    r#type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_error: Option<String>,
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::PolicyDenied { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Exhausted { .. } => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &str {
        match self {
            Self::BadRequest(_) => "invalid_request_error",
            Self::PolicyDenied { .. } => "rate_limit_error",
            Self::Exhausted { .. } => "api_error",
            Self::Internal(_) => "server_error",
        }
    }

    fn error_code(&self) -> Option<&str> {
        match self {
            Self::PolicyDenied { .. } => Some("policy_denied"),
            Self::Exhausted { .. } => Some("all_providers_failed"),
            _ => None,
        }
    }

    fn request_id(&self) -> Option<&str> {
        match self {
            Self::PolicyDenied { request_id, .. } | Self::Exhausted { request_id, .. } => {
                Some(request_id)
            }
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let last_error = match &self {
            Self::Exhausted { last_error, .. } => last_error.clone(),
            _ => None,
        };
        let body = ErrorResponse {
            error: ErrorDetail {
                message: self.to_string(),
                r#type: self.error_type().to_string(),
                code: self.error_code().map(String::from),
                request_id: self.request_id().map(String::from),
                last_error,
            },
        };
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_denied_status() {
        let err = AppError::PolicyDenied {
            reason: "rate_limit_exceeded".into(),
            request_id: "req-1".into(),
        };
        assert_eq!(err.status_code(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(err.error_code(), Some("policy_denied"));
        assert_eq!(err.request_id(), Some("req-1"));
    }

    #[test]
    fn test_exhausted_status() {
        let err = AppError::Exhausted {
            last_error: Some("upstream timeout".into()),
            request_id: "req-2".into(),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.to_string(), "all_providers_failed");
    }

    #[test]
    fn test_bad_request_body_shape() {
        let err = AppError::BadRequest("unknown route: nope".into());
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_exhausted_body_carries_correlation_fields() {
        let err = AppError::Exhausted {
            last_error: Some("provider_not_configured: ghost".into()),
            request_id: "req-3".into(),
        };
        let response = err.into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["code"], "all_providers_failed");
        assert_eq!(body["error"]["request_id"], "req-3");
        assert_eq!(body["error"]["last_error"], "provider_not_configured: ghost");
    }
}
