//! Reset-token consume endpoint.
//!
//! `email` and `token` arrive as query parameters because the client lands
//! here from the link in the reset mail; the new password pair travels in
//! the JSON body.

use axum::{
    Json,
    extract::{Extension, Query},
};
use serde::Deserialize;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::instrument;
use utoipa::IntoParams;

use crate::api::response::ApiResponse;
use crate::auth::error::AuthError;
use crate::auth::service::{self, ResetPasswordRequest};
use crate::auth::state::AuthState;

#[derive(Debug, Deserialize, IntoParams)]
pub struct ResetTokenQuery {
    /// Email the reset token was issued for.
    #[serde(default)]
    pub email: String,
    /// Wire form of the reset token from the mail link.
    #[serde(default)]
    pub token: String,
}

#[utoipa::path(
    post,
    path = "/reset-password",
    params(ResetTokenQuery),
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password replaced and token consumed"),
        (status = 400, description = "Missing parameters, password mismatch, or invalid token"),
        (status = 404, description = "Token owner no longer exists")
    ),
    tag = "auth"
)]
#[instrument(skip(pool, state, query, payload))]
pub async fn reset_password(
    pool: Extension<PgPool>,
    state: Extension<Arc<AuthState>>,
    query: Query<ResetTokenQuery>,
    payload: Option<Json<ResetPasswordRequest>>,
) -> Result<ApiResponse<()>, AuthError> {
    if query.token.is_empty() {
        return Err(AuthError::BadRequest("token is missing".to_string()));
    }
    if query.email.is_empty() {
        return Err(AuthError::BadRequest("email is missing".to_string()));
    }

    let Some(Json(request)) = payload else {
        return Err(AuthError::BadRequest("missing payload".to_string()));
    };

    service::reset_password(&pool, &state, &query.email, &query.token, request).await?;

    Ok(ApiResponse::message("Reset successfully"))
}
