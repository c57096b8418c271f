//! Service error type and its JSON rendering.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Errors surfaced to API clients.
///
/// Message-carrying variants hold exactly the text the client sees. Unit
/// variants render a fixed message so internal detail never leaks: session
/// and reset-token failures all read "token invalid", store failures read
/// "internal server error" and are logged with the cause at the call site.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    BadRequest(String),

    #[error("token invalid")]
    Unauthorized,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    UnprocessableEntity(String),

    #[error("internal server error")]
    Internal,

    #[error("request error")]
    BadGateway,
}

impl AuthError {
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::UnprocessableEntity(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BadGateway => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = json!({
            "code": status.as_u16(),
            "status": false,
            "message": self.to_string(),
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AuthError::BadRequest("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AuthError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AuthError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AuthError::UnprocessableEntity("x".into()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AuthError::Internal.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(AuthError::BadGateway.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_fixed_messages_leak_no_detail() {
        assert_eq!(AuthError::Unauthorized.to_string(), "token invalid");
        assert_eq!(AuthError::Internal.to_string(), "internal server error");
        assert_eq!(AuthError::BadGateway.to_string(), "request error");
    }

    #[test]
    fn test_message_variants_carry_text() {
        let err = AuthError::BadRequest("name is required".into());
        assert_eq!(err.to_string(), "name is required");
    }
}
