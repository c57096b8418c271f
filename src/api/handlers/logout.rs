//! Logout endpoint, requires a live session and expires the cookie.

use axum::{
    extract::Extension,
    http::{HeaderMap, header::SET_COOKIE},
};
use std::sync::Arc;
use tracing::debug;

use crate::api::handlers::{authenticate, clear_session_cookie};
use crate::api::response::ApiResponse;
use crate::auth::error::AuthError;
use crate::auth::state::AuthState;

#[utoipa::path(
    post,
    path = "/logout",
    responses(
        (status = 200, description = "Session cookie cleared"),
        (status = 401, description = "No valid session")
    ),
    tag = "auth"
)]
pub async fn logout(
    headers: HeaderMap,
    state: Extension<Arc<AuthState>>,
) -> Result<(HeaderMap, ApiResponse<()>), AuthError> {
    let claims = authenticate(&headers, &state)?;
    debug!(sub = %claims.sub, "logout");

    // Sessions are stateless, expiring the cookie is all there is to do.
    let mut response_headers = HeaderMap::new();
    if let Ok(cookie) = clear_session_cookie(state.config()) {
        response_headers.insert(SET_COOKIE, cookie);
    }

    Ok((response_headers, ApiResponse::message("success")))
}
