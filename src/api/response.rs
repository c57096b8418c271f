//! Response envelope shared by every route.
//!
//! Successes always travel as HTTP 200 with `status: true`. Errors carry
//! their status in both the HTTP code and the envelope, see
//! [`crate::auth::error::AuthError`].

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub code: u16,
    pub status: bool,
    pub message: String,
    /// Skipped entirely when a route has no payload to attach.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl ApiResponse<()> {
    /// Envelope carrying a message and no payload.
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            code: StatusCode::OK.as_u16(),
            status: true,
            message: message.into(),
            data: None,
        }
    }
}

impl<T> ApiResponse<T> {
    /// Envelope carrying a message and a payload.
    #[must_use]
    pub fn with_data(message: impl Into<String>, data: T) -> Self {
        Self {
            code: StatusCode::OK.as_u16(),
            status: true,
            message: message.into(),
            data: Some(data),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_without_data_has_three_fields() {
        let value = serde_json::to_value(ApiResponse::message("ok")).unwrap();
        assert_eq!(
            value,
            json!({"code": 200, "status": true, "message": "ok"})
        );
    }

    #[test]
    fn test_envelope_with_data_carries_payload() {
        let value =
            serde_json::to_value(ApiResponse::with_data("success", json!({"id": "user-1"})))
                .unwrap();
        assert_eq!(
            value,
            json!({
                "code": 200,
                "status": true,
                "message": "success",
                "data": {"id": "user-1"},
            })
        );
    }

    #[tokio::test]
    async fn test_envelope_renders_as_http_200() {
        let response = ApiResponse::message("ok").into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
