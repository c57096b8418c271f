//! Login endpoint, sets the session cookie on success.

use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, header::SET_COOKIE},
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{error, instrument};

use crate::api::handlers::session_cookie;
use crate::api::response::ApiResponse;
use crate::auth::error::AuthError;
use crate::auth::service::{self, LoginRequest, LoginResponse};
use crate::auth::state::AuthState;

#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Credentials accepted, session cookie set", body = ApiResponse<LoginResponse>),
        (status = 400, description = "Missing identifier or invalid credentials")
    ),
    tag = "auth"
)]
#[instrument(skip(pool, state, payload))]
pub async fn login(
    pool: Extension<PgPool>,
    state: Extension<Arc<AuthState>>,
    payload: Option<Json<LoginRequest>>,
) -> Result<(HeaderMap, ApiResponse<LoginResponse>), AuthError> {
    let Some(Json(request)) = payload else {
        return Err(AuthError::BadRequest("missing payload".to_string()));
    };

    let (session_token, user) = service::login(&pool, &state, request).await?;

    let mut headers = HeaderMap::new();
    match session_cookie(&state, &session_token) {
        Ok(cookie) => {
            headers.insert(SET_COOKIE, cookie);
        }
        Err(err) => {
            error!("failed to build session cookie: {err}");
            return Err(AuthError::Internal);
        }
    }

    Ok((headers, ApiResponse::with_data("success", user)))
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
    async fn test_login_missing_payload() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let response = login(Extension(pool), Extension(auth_state()), None)
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn test_login_without_identifier_never_reaches_storage() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let payload: LoginRequest = serde_json::from_value(serde_json::json!({
            "password": "hunter2",
        }))?;
        let response = login(Extension(pool), Extension(auth_state()), Some(Json(payload)))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }
}
