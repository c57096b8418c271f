//! Reset-token peek endpoint, validates without consuming.

use axum::extract::{Extension, Query};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::instrument;

use crate::api::handlers::reset_password::ResetTokenQuery;
use crate::api::response::ApiResponse;
use crate::auth::error::AuthError;
use crate::auth::service;
use crate::auth::state::AuthState;

#[utoipa::path(
    post,
    path = "/check-token",
    params(ResetTokenQuery),
    responses(
        (status = 200, description = "Token is valid and unexpired"),
        (status = 400, description = "Token is invalid or expired")
    ),
    tag = "auth"
)]
#[instrument(skip(pool, state, query))]
pub async fn check_token(
    pool: Extension<PgPool>,
    state: Extension<Arc<AuthState>>,
    query: Query<ResetTokenQuery>,
) -> Result<ApiResponse<()>, AuthError> {
    service::check_token(&pool, &state, &query.email, &query.token).await?;

    Ok(ApiResponse::message("success"))
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
    async fn test_check_token_rejects_undecodable_wire_form() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let query = Query(ResetTokenQuery {
            email: "jane@example.com".to_string(),
            token: "%%%not-base64%%%".to_string(),
        });
        let response = check_token(Extension(pool), Extension(auth_state()), query)
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }
}
