//! Reset-token issue endpoint.

use axum::{Json, extract::Extension};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::instrument;

use crate::api::response::ApiResponse;
use crate::auth::error::AuthError;
use crate::auth::service::{self, ForgetPasswordRequest};
use crate::auth::state::AuthState;

#[utoipa::path(
    post,
    path = "/forget-password",
    request_body = ForgetPasswordRequest,
    responses(
        (status = 200, description = "Reset mail dispatched"),
        (status = 404, description = "Email is not registered"),
        (status = 502, description = "Mail side channel failed, token stays valid")
    ),
    tag = "auth"
)]
#[instrument(skip(pool, state, payload))]
pub async fn forget_password(
    pool: Extension<PgPool>,
    state: Extension<Arc<AuthState>>,
    payload: Option<Json<ForgetPasswordRequest>>,
) -> Result<ApiResponse<()>, AuthError> {
    let Some(Json(request)) = payload else {
        return Err(AuthError::BadRequest("missing payload".to_string()));
    };

    service::forget_password(&pool, &state, request).await?;

    Ok(ApiResponse::message("Reset password has been sent"))
}
