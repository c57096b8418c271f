//! Reset token lifecycle: create, validate, consume.
//!
//! Per email there is at most one live token, enforced by a unique index.
//! Issuing a new one upserts over the old row, so two concurrent requests
//! can never leave two live tokens behind. Tokens are stored raw and travel
//! base64-encoded in the reset link, the encoding exists only because the
//! token rides in a URL query parameter.

use anyhow::{Context, Result};
use base64ct::{Base64, Encoding};
use chrono::{DateTime, Utc};
use rand::{distributions::Alphanumeric, Rng};
use sqlx::{postgres::PgRow, FromRow, PgPool, Row};
use tokio::time::timeout;
use tracing::{debug, error, Instrument};

use crate::auth::error::AuthError;
use crate::auth::state::AuthConfig;
use crate::users::repo::DB_TIMEOUT;

const RESET_TOKEN_LEN: usize = 30;

/// A pending reset token row.
#[derive(Debug, Clone)]
pub struct ResetTokenRecord {
    pub token: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for ResetTokenRecord {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            token: row.try_get("tokens")?,
            email: row.try_get("email")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// Create a new high-entropy reset token, lowercase alphanumeric.
#[must_use]
pub fn generate_reset_token() -> String {
    let token: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(RESET_TOKEN_LEN)
        .map(char::from)
        .collect();

    token.to_lowercase()
}

/// Encode a raw token into its wire form for reset links.
#[must_use]
pub fn encode_wire_token(raw_token: &str) -> String {
    Base64::encode_string(raw_token.as_bytes())
}

/// Decode a wire token back to its raw stored form. Returns `None` for
/// anything that is not valid base64 over UTF-8 text.
#[must_use]
pub fn decode_wire_token(wire_token: &str) -> Option<String> {
    Base64::decode_vec(wire_token)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
}

/// Persist a fresh reset token for `email`, superseding any pending one.
/// Returns the raw token for the mail side channel.
///
/// The unique index on `email` is the conflict arbiter: concurrent issues
/// for the same address serialize on it and the later write wins.
///
/// # Errors
/// Returns an error if the upsert fails or times out.
pub(crate) async fn create_reset_token(pool: &PgPool, email: &str) -> Result<String> {
    let raw_token = generate_reset_token();

    let query = r"
        INSERT INTO reset_token (tokens, email, created_at)
        VALUES ($1, $2, $3)
        ON CONFLICT (email) DO UPDATE SET
            tokens = EXCLUDED.tokens,
            created_at = EXCLUDED.created_at
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );

    timeout(
        DB_TIMEOUT,
        sqlx::query(query)
            .bind(&raw_token)
            .bind(email)
            .bind(Utc::now())
            .execute(pool)
            .instrument(span),
    )
    .await
    .context("reset token upsert timed out")?
    .context("failed to store reset token")?;

    Ok(raw_token)
}

async fn find_reset_token(pool: &PgPool, raw_token: &str) -> Result<Option<ResetTokenRecord>> {
    let query = "SELECT tokens, email, created_at FROM reset_token WHERE tokens = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );

    timeout(
        DB_TIMEOUT,
        sqlx::query_as::<_, ResetTokenRecord>(query)
            .bind(raw_token)
            .fetch_optional(pool)
            .instrument(span),
    )
    .await
    .context("reset token select timed out")?
    .context("failed to fetch reset token")
}

/// Delete a consumed token, the pending to consumed transition.
///
/// # Errors
/// Returns an error if the delete fails or times out.
pub(crate) async fn delete_reset_token(pool: &PgPool, raw_token: &str) -> Result<()> {
    let query = "DELETE FROM reset_token WHERE tokens = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );

    timeout(
        DB_TIMEOUT,
        sqlx::query(query).bind(raw_token).execute(pool).instrument(span),
    )
    .await
    .context("reset token delete timed out")?
    .context("failed to delete reset token")?;

    Ok(())
}

/// True once a token's age exceeds the TTL. A token exactly as old as the
/// TTL still validates.
fn reset_token_expired(created_at: DateTime<Utc>, now: DateTime<Utc>, ttl_seconds: i64) -> bool {
    now.signed_duration_since(created_at).num_seconds() > ttl_seconds
}

/// Shared decode-and-match validation for the consume and peek endpoints.
///
/// Every failure renders the same "token invalid" message, the logs
/// distinguish decode failures, mismatches and expiry.
///
/// # Errors
/// Returns `BadRequest` for any invalid or expired token and `Internal` when
/// the store is unreachable.
pub(crate) async fn validate_reset_request(
    pool: &PgPool,
    config: &AuthConfig,
    email: &str,
    wire_token: &str,
) -> Result<ResetTokenRecord, AuthError> {
    let Some(raw_token) = decode_wire_token(wire_token) else {
        debug!("reset token is not valid base64");
        return Err(AuthError::BadRequest("token invalid".to_string()));
    };

    let record = match find_reset_token(pool, &raw_token).await {
        Ok(record) => record,
        Err(err) => {
            error!("failed to look up reset token: {err:#}");
            return Err(AuthError::Internal);
        }
    };

    let Some(record) = record else {
        debug!("reset token not found");
        return Err(AuthError::BadRequest("token invalid".to_string()));
    };

    if record.token != raw_token || record.email != email {
        debug!("reset token does not match the request");
        return Err(AuthError::BadRequest("token invalid".to_string()));
    }

    let now = Utc::now();
    if reset_token_expired(record.created_at, now, config.reset_token_ttl_seconds()) {
        let age = now.signed_duration_since(record.created_at);
        debug!(age_seconds = age.num_seconds(), "reset token expired");
        return Err(AuthError::BadRequest("token invalid".to_string()));
    }

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_db::TestDb;
    use chrono::Duration;
    use secrecy::SecretString;

    #[test]
    fn test_generated_tokens_are_lowercase_alphanumeric() {
        let token = generate_reset_token();

        assert_eq!(token.len(), RESET_TOKEN_LEN);
        assert!(token
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[test]
    fn test_generated_tokens_differ() {
        assert_ne!(generate_reset_token(), generate_reset_token());
    }

    #[test]
    fn test_wire_codec_round_trips() {
        let raw = generate_reset_token();
        let wire = encode_wire_token(&raw);

        assert_ne!(wire, raw);
        assert_eq!(decode_wire_token(&wire).as_deref(), Some(raw.as_str()));
    }

    #[test]
    fn test_wire_codec_uses_standard_padded_base64() {
        // 30-char tokens land on a 3-byte boundary, 40 chars and no padding
        assert_eq!(
            encode_wire_token("zyho8qni3b0y6iwyrtlrjd0htclnmp"),
            "enlobzhxbmkzYjB5Nml3eXJ0bHJqZDBodGNsbm1w"
        );
        // shorter input shows the standard alphabet pads with '='
        assert_eq!(encode_wire_token("abcd"), "YWJjZA==");
        assert_eq!(decode_wire_token("YWJjZA==").as_deref(), Some("abcd"));
    }

    #[test]
    fn test_decode_rejects_junk() {
        assert!(decode_wire_token("not base64!").is_none());
        assert!(decode_wire_token("====").is_none());
    }

    #[test]
    fn test_token_at_ttl_boundary_still_validates() {
        let created_at = Utc::now();
        let ttl = 1800;

        assert!(!reset_token_expired(created_at, created_at, ttl));
        assert!(!reset_token_expired(
            created_at,
            created_at + Duration::seconds(ttl),
            ttl
        ));
        assert!(reset_token_expired(
            created_at,
            created_at + Duration::seconds(ttl + 1),
            ttl
        ));
    }

    #[tokio::test]
    async fn test_reissued_token_supersedes_previous() -> Result<()> {
        let Ok(db) = TestDb::new().await else {
            return Ok(());
        };

        let email = format!("{}@example.com", generate_reset_token());

        let first = create_reset_token(&db.pool, &email).await?;
        let second = create_reset_token(&db.pool, &email).await?;
        assert_ne!(first, second);
        assert!(find_reset_token(&db.pool, &first).await?.is_none());

        let (left, right) = tokio::join!(
            create_reset_token(&db.pool, &email),
            create_reset_token(&db.pool, &email)
        );
        let left = left?;
        let right = right?;

        let live = sqlx::query_as::<_, ResetTokenRecord>(
            "SELECT tokens, email, created_at FROM reset_token WHERE email = $1",
        )
        .bind(&email)
        .fetch_all(&db.pool)
        .await?;

        assert_eq!(live.len(), 1);
        assert!(live[0].token == left || live[0].token == right);

        Ok(())
    }

    #[tokio::test]
    async fn test_consumed_token_cannot_be_reused() -> Result<()> {
        let Ok(db) = TestDb::new().await else {
            return Ok(());
        };

        let config = AuthConfig::new(SecretString::from("test-secret".to_string()));
        let email = format!("{}@example.com", generate_reset_token());
        let raw = create_reset_token(&db.pool, &email).await?;
        let wire = encode_wire_token(&raw);

        assert!(validate_reset_request(&db.pool, &config, &email, &wire)
            .await
            .is_ok());

        delete_reset_token(&db.pool, &raw).await?;

        let reuse = validate_reset_request(&db.pool, &config, &email, &wire).await;
        assert!(matches!(
            reuse,
            Err(AuthError::BadRequest(message)) if message == "token invalid"
        ));

        Ok(())
    }
}
