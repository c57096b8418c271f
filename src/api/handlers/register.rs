//! Account creation endpoint.

use axum::{Json, extract::Extension};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::instrument;

use crate::api::response::ApiResponse;
use crate::auth::error::AuthError;
use crate::auth::service::{self, RegisterRequest, RegisterResponse};
use crate::auth::state::AuthState;

#[utoipa::path(
    post,
    path = "/register",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Account created", body = ApiResponse<RegisterResponse>),
        (status = 400, description = "Validation failed, identifier already registered, or unknown role"),
        (status = 422, description = "Insert raced a concurrent duplicate")
    ),
    tag = "auth"
)]
#[instrument(skip(pool, state, payload))]
pub async fn register(
    pool: Extension<PgPool>,
    state: Extension<Arc<AuthState>>,
    payload: Option<Json<RegisterRequest>>,
) -> Result<ApiResponse<RegisterResponse>, AuthError> {
    let Some(Json(request)) = payload else {
        return Err(AuthError::BadRequest("missing payload".to_string()));
    };

    let user = service::register(&pool, &state, request).await?;

    Ok(ApiResponse::with_data("success", user))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::state::AuthConfig;
    use crate::mail::LogMailer;
    use crate::replica::publisher::LogPublisher;
    use anyhow::Result;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use secrecy::SecretString;
    use sqlx::postgres::PgPoolOptions;

    fn auth_state() -> Arc<AuthState> {
        let config = AuthConfig::new(SecretString::from("test-secret".to_string()));
        Arc::new(AuthState::new(
            config,
            Arc::new(LogMailer),
            Arc::new(LogPublisher),
        ))
    }

    #[tokio::test]
    async fn test_register_missing_payload() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let response = register(Extension(pool), Extension(auth_state()), None)
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn test_register_rejects_invalid_body_before_storage() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let payload = serde_json::from_value(serde_json::json!({
            "name": "Jane Doe",
            "username": "jane",
            "email": "not-an-email",
            "password": "hunter2",
            "role_id": "role-1",
        }))?;
        let response = register(Extension(pool), Extension(auth_state()), Some(Json(payload)))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }
}
