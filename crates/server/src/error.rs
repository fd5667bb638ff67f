//! JSON error responses.

use axum::Json;
use axum::extract::multipart::MultipartError;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use storescope_core::ScopeError;
use tracing::{error, warn};

/// Error returned by every handler; rendered as `{"error": "..."}`.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unavailable(String),
    Scope(ScopeError),
    Internal(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Scope(err) => match err {
                ScopeError::InvalidUrl(_) => StatusCode::BAD_REQUEST,
                ScopeError::Image(_) => StatusCode::UNPROCESSABLE_ENTITY,
                ScopeError::MissingApiKey { .. } => StatusCode::SERVICE_UNAVAILABLE,
                ScopeError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
                ScopeError::HttpError(_) | ScopeError::HttpStatus { .. } | ScopeError::Api { .. } => {
                    StatusCode::BAD_GATEWAY
                }
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::BadRequest(m) | ApiError::Unavailable(m) | ApiError::Internal(m) => m.clone(),
            ApiError::Scope(err) => err.to_string(),
        }
    }
}

impl From<ScopeError> for ApiError {
    fn from(err: ScopeError) -> Self {
        ApiError::Scope(err)
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::BadRequest(format!("Invalid multipart body: {}", err.body_text()))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.message();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %message, "request failed");
        } else {
            warn!(status = status.as_u16(), error = %message, "request rejected");
        }
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_errors_map_to_status() {
        let cases = [
            (ScopeError::InvalidUrl("x".into()), StatusCode::BAD_REQUEST),
            (ScopeError::MissingApiKey { service: "serpapi" }, StatusCode::SERVICE_UNAVAILABLE),
            (ScopeError::Timeout { timeout: 10 }, StatusCode::GATEWAY_TIMEOUT),
            (ScopeError::HttpStatus { url: "u".into(), status: 404 }, StatusCode::BAD_GATEWAY),
            (ScopeError::Image("bad".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (ScopeError::Vision("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status(), expected);
        }
    }

    #[test]
    fn test_message_uses_error_display() {
        let err = ApiError::from(ScopeError::InvalidUrl("ftp://x".into()));
        assert_eq!(err.message(), "Invalid URL: ftp://x");
        assert_eq!(ApiError::bad_request("nope").message(), "nope");
    }
}
