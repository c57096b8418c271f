//! Route handlers for the credential lifecycle API.
//!
//! Handlers parse the wire shapes and delegate every rule to
//! [`crate::auth::service`]. The session cookie helpers live here because
//! only the HTTP surface knows about cookies.

pub mod check_token;
pub mod forget_password;
pub mod health;
pub mod login;
pub mod logout;
pub mod register;
pub mod reset_password;

use axum::http::{
    HeaderMap, HeaderValue,
    header::{COOKIE, InvalidHeaderValue},
};
use tracing::debug;

use crate::auth::error::AuthError;
use crate::auth::state::{AuthConfig, AuthState};
use crate::auth::token::SessionClaims;

const SESSION_COOKIE_NAME: &str = "token";

/// Build an `HttpOnly` cookie carrying the session token.
///
/// The cookie outlives the token on purpose so an expired session still
/// reaches the server and fails verification there.
pub(crate) fn session_cookie(
    state: &AuthState,
    token: &str,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let ttl_seconds = state.config().cookie_ttl_seconds();
    // Only mark the cookie secure when the public base URL is HTTPS.
    let secure = state.config().session_cookie_secure();
    let mut cookie = format!(
        "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={ttl_seconds}"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

pub(crate) fn clear_session_cookie(config: &AuthConfig) -> Result<HeaderValue, InvalidHeaderValue> {
    let secure = config.session_cookie_secure();
    let mut cookie = format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

/// Resolve the session cookie into verified claims.
///
/// # Errors
/// Returns `Unauthorized` when the cookie is missing or the token fails
/// verification; the reason stays in the logs.
pub(crate) fn authenticate(
    headers: &HeaderMap,
    state: &AuthState,
) -> Result<SessionClaims, AuthError> {
    let Some(token) = extract_session_token(headers) else {
        return Err(AuthError::Unauthorized);
    };
    state.verify_session(&token).map_err(|err| {
        debug!("session verification failed: {err}");
        AuthError::Unauthorized
    })
}

fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    let header = headers.get(COOKIE)?;
    let value = header.to_str().ok()?;
    for pair in value.split(';') {
        let trimmed = pair.trim();
        let mut parts = trimmed.splitn(2, '=');
        let key = parts.next()?.trim();
        let val = parts.next()?.trim();
        if key == SESSION_COOKIE_NAME {
            return Some(val.to_string());
        }
    }
    None
}
