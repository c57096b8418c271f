//! Credential lifecycle flows: register, login, forget, reset, check.
//!
//! Handlers stay thin adapters, every rule lives here. Each flow validates
//! before touching storage, fails on the first broken rule and maps store
//! failures to an opaque internal error with the cause in the logs.

use anyhow::Error;
use chrono::Utc;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{debug, error};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::error::AuthError;
use crate::auth::password::{hash_password, verify_password};
use crate::auth::reset::{
    create_reset_token, delete_reset_token, encode_wire_token, validate_reset_request,
};
use crate::auth::state::AuthState;
use crate::mail::reset_password_message;
use crate::replica::publisher::publish_user;
use crate::replica::UserEventKind;
use crate::users::model::User;
use crate::users::repo::{is_unique_violation, RoleRepo, UserKey, UserRepo};

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub role_id: String,
}

/// Login accepts exactly one identifier in practice, but tolerates several:
/// username wins over email, email over phone, and the chosen identifier
/// never widens to another on a miss.
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ForgetPasswordRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ResetPasswordRequest {
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub password_confirm: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RoleResponse {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RegisterResponse {
    pub id: String,
    pub name: String,
    pub username: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: RoleResponse,
    pub created_at: chrono::DateTime<Utc>,
    pub updated_at: chrono::DateTime<Utc>,
}

impl RegisterResponse {
    fn from_user(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            username: user.username,
            email: user.email,
            phone: user.phone,
            role: RoleResponse {
                id: user.role_id,
                name: user.role_name.unwrap_or_default(),
            },
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub id: String,
    pub role_id: String,
}

fn storage_error(err: Error) -> AuthError {
    error!("storage failure: {err:#}");
    AuthError::Internal
}

fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email))
}

fn validate_register(request: &RegisterRequest) -> Result<(), AuthError> {
    for (value, message) in [
        (&request.name, "name is required"),
        (&request.username, "username is required"),
        (&request.email, "email is required"),
        (&request.password, "password is required"),
        (&request.role_id, "role_id is required"),
    ] {
        if value.trim().is_empty() {
            return Err(AuthError::BadRequest(message.to_string()));
        }
    }

    if !valid_email(&request.email) {
        return Err(AuthError::BadRequest("email is invalid".to_string()));
    }

    if !request.phone.is_empty() {
        if !request.phone.chars().all(|c| c.is_ascii_digit()) {
            return Err(AuthError::BadRequest("phone should be numeric".to_string()));
        }
        if request.phone.len() < 10 || request.phone.len() > 13 {
            return Err(AuthError::BadRequest(
                "phone should be 10-13 digits".to_string(),
            ));
        }
    }

    Ok(())
}

/// Create a user: structural checks, then uniqueness probes in a fixed
/// order (email, username, phone), then role resolution, then insert.
///
/// A concurrent register can still race the probes into the unique index,
/// that surfaces as `UnprocessableEntity` with the store's message. After
/// the insert the row is re-read so the response carries the joined role
/// name, then a create event is published fire-and-forget.
///
/// # Errors
/// Returns `BadRequest` for any failed rule, `UnprocessableEntity` for an
/// insert race and `Internal` when the store is unreachable.
pub async fn register(
    pool: &PgPool,
    state: &AuthState,
    request: RegisterRequest,
) -> Result<RegisterResponse, AuthError> {
    validate_register(&request)?;

    if UserRepo::exists_by(pool, UserKey::Email, &request.email)
        .await
        .map_err(storage_error)?
    {
        return Err(AuthError::BadRequest("email already registered".to_string()));
    }

    if UserRepo::exists_by(pool, UserKey::Username, &request.username)
        .await
        .map_err(storage_error)?
    {
        return Err(AuthError::BadRequest(
            "username already registered".to_string(),
        ));
    }

    if !request.phone.is_empty()
        && UserRepo::exists_by(pool, UserKey::Phone, &request.phone)
            .await
            .map_err(storage_error)?
    {
        return Err(AuthError::BadRequest("phone already registered".to_string()));
    }

    let role = RoleRepo::find_by_id(pool, &request.role_id)
        .await
        .map_err(storage_error)?;
    if role.is_none() {
        return Err(AuthError::BadRequest("role not found".to_string()));
    }

    let digest = hash_password(&request.password).map_err(storage_error)?;
    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4().to_string(),
        name: request.name,
        username: request.username,
        email: request.email,
        password: digest,
        phone: (!request.phone.is_empty()).then_some(request.phone),
        role_id: request.role_id,
        role_name: None,
        created_at: now,
        updated_at: now,
    };

    if let Err(err) = UserRepo::insert(pool, &user).await {
        if let Some(db_err) = err.downcast_ref::<sqlx::Error>() {
            if is_unique_violation(db_err) {
                debug!("registration raced a concurrent duplicate");
                return Err(AuthError::UnprocessableEntity(db_err.to_string()));
            }
        }
        return Err(storage_error(err));
    }

    let Some(user) = UserRepo::find_by(pool, UserKey::Id, &user.id)
        .await
        .map_err(storage_error)?
    else {
        error!(id = %user.id, "registered user missing on re-read");
        return Err(AuthError::Internal);
    };

    publish_user(state.publisher(), UserEventKind::Created, &user);
    debug!(id = %user.id, "user registered");

    Ok(RegisterResponse::from_user(user))
}

/// Authenticate one identifier and return a session token with the login
/// projection.
///
/// Identifier misses and password mismatches both surface as the same
/// "invalid credentials" message, the logs keep them distinct.
///
/// # Errors
/// Returns `BadRequest` when no identifier is supplied or the credentials
/// do not match, `Internal` when the store is unreachable.
pub async fn login(
    pool: &PgPool,
    state: &AuthState,
    request: LoginRequest,
) -> Result<(String, LoginResponse), AuthError> {
    let (key, value) = if !request.username.is_empty() {
        (UserKey::Username, request.username.as_str())
    } else if !request.email.is_empty() {
        (UserKey::Email, request.email.as_str())
    } else if !request.phone.is_empty() {
        (UserKey::Phone, request.phone.as_str())
    } else {
        return Err(AuthError::BadRequest(
            "username, email, or phone are missing".to_string(),
        ));
    };

    let user = UserRepo::find_by(pool, key, value)
        .await
        .map_err(storage_error)?;
    let Some(user) = user else {
        debug!(key = key.column(), "login identifier not found");
        return Err(AuthError::BadRequest("invalid credentials".to_string()));
    };

    if !verify_password(&request.password, &user.password) {
        debug!(id = %user.id, "login password mismatch");
        return Err(AuthError::BadRequest("invalid credentials".to_string()));
    }

    let session_token = state.issue_session(&user.id, &user.role_id).map_err(|err| {
        error!("failed to issue session token: {err}");
        AuthError::Internal
    })?;

    debug!(id = %user.id, "login succeeded");

    Ok((
        session_token,
        LoginResponse {
            id: user.id,
            role_id: user.role_id,
        },
    ))
}

/// Issue a reset token for a known email and dispatch the reset mail.
///
/// The token is created before the mail goes out and stays live if delivery
/// fails, reissuing supersedes it, so the client can simply retry.
///
/// # Errors
/// Returns `NotFound` for an unknown email, `BadGateway` when the mail side
/// channel fails and `Internal` when the store is unreachable.
pub async fn forget_password(
    pool: &PgPool,
    state: &AuthState,
    request: ForgetPasswordRequest,
) -> Result<(), AuthError> {
    let user = UserRepo::find_by(pool, UserKey::Email, &request.email)
        .await
        .map_err(storage_error)?;
    if user.is_none() {
        debug!("password reset requested for unknown email");
        return Err(AuthError::NotFound(
            "email not match for the record".to_string(),
        ));
    }

    let raw_token = create_reset_token(pool, &request.email)
        .await
        .map_err(storage_error)?;

    let message = reset_password_message(
        state.config().reset_url_base(),
        &request.email,
        &encode_wire_token(&raw_token),
    );
    if let Err(err) = state.mailer().send(&message).await {
        error!("failed to deliver reset mail: {err:#}");
        return Err(AuthError::BadGateway);
    }

    debug!("reset mail dispatched");

    Ok(())
}

/// Consume a reset token: set the new password, delete the token, publish
/// the update.
///
/// # Errors
/// Returns `BadRequest` for a missing or mismatched password pair and for
/// any invalid or expired token, `NotFound` when the owning user is gone,
/// `Internal` when the store is unreachable.
pub async fn reset_password(
    pool: &PgPool,
    state: &AuthState,
    email: &str,
    wire_token: &str,
    request: ResetPasswordRequest,
) -> Result<(), AuthError> {
    if request.password.is_empty() {
        return Err(AuthError::BadRequest("password is required".to_string()));
    }
    if request.password_confirm.is_empty() {
        return Err(AuthError::BadRequest(
            "password_confirm is required".to_string(),
        ));
    }
    if request.password != request.password_confirm {
        return Err(AuthError::BadRequest("password didn't match".to_string()));
    }

    let record = validate_reset_request(pool, state.config(), email, wire_token).await?;

    let user = UserRepo::find_by(pool, UserKey::Email, &record.email)
        .await
        .map_err(storage_error)?;
    let Some(mut user) = user else {
        debug!("reset token owner no longer exists");
        return Err(AuthError::NotFound(
            "email not match for the record".to_string(),
        ));
    };

    user.password = hash_password(&request.password).map_err(storage_error)?;
    user.updated_at = Utc::now();

    UserRepo::update_password(pool, &user.id, &user.password, user.updated_at)
        .await
        .map_err(storage_error)?;

    publish_user(state.publisher(), UserEventKind::Updated, &user);

    delete_reset_token(pool, &record.token)
        .await
        .map_err(storage_error)?;

    debug!(id = %user.id, "password reset completed");

    Ok(())
}

/// Validate a reset token without consuming it, the peek the client uses
/// before showing the password form.
///
/// # Errors
/// Returns `BadRequest` for any invalid or expired token and `Internal`
/// when the store is unreachable.
pub async fn check_token(
    pool: &PgPool,
    state: &AuthState,
    email: &str,
    wire_token: &str,
) -> Result<(), AuthError> {
    validate_reset_request(pool, state.config(), email, wire_token).await?;

    Ok(())
}
