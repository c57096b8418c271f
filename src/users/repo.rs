//! Postgres access for users and roles.
//!
//! Every query runs under a `db.query` span and a hard timeout so a stuck
//! connection surfaces as an error instead of hanging a request.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::time::Duration;
use tokio::time::timeout;
use tracing::Instrument;

use crate::users::model::{Role, User};

/// Upper bound for a single statement, matching the per-call budget the rest
/// of the service assumes.
pub(crate) const DB_TIMEOUT: Duration = Duration::from_secs(10);

const USER_COLUMNS: &str = r"
    users.id, users.name, users.username, users.email, users.password,
    users.phone, users.role_id, roles.name AS role_name,
    users.created_at, users.updated_at";

/// Identifier a user row can be addressed by. Each key maps to a distinct
/// unique column, callers pick the column and never widen to another one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserKey {
    Id,
    Username,
    Email,
    Phone,
}

impl UserKey {
    pub(crate) const fn column(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Username => "username",
            Self::Email => "email",
            Self::Phone => "phone",
        }
    }
}

/// True when the error is a Postgres unique constraint violation (SQLSTATE 23505).
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

pub struct UserRepo;

impl UserRepo {
    /// Fetches a user by one of its unique identifiers, role name joined in.
    ///
    /// # Errors
    /// Returns an error if the query fails or times out.
    pub async fn find_by(pool: &PgPool, key: UserKey, value: &str) -> Result<Option<User>> {
        let query = format!(
            "SELECT {USER_COLUMNS}
            FROM users
            LEFT JOIN roles ON roles.id = users.role_id
            WHERE users.{} = $1",
            key.column()
        );
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query.as_str()
        );

        timeout(
            DB_TIMEOUT,
            sqlx::query_as::<_, User>(&query)
                .bind(value)
                .fetch_optional(pool)
                .instrument(span),
        )
        .await
        .context("users select timed out")?
        .context("failed to fetch user")
    }

    /// True when a user row exists for the given identifier.
    ///
    /// # Errors
    /// Returns an error if the query fails or times out.
    pub async fn exists_by(pool: &PgPool, key: UserKey, value: &str) -> Result<bool> {
        let query = format!(
            "SELECT EXISTS(SELECT 1 FROM users WHERE {} = $1)",
            key.column()
        );
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query.as_str()
        );

        timeout(
            DB_TIMEOUT,
            sqlx::query_scalar::<_, bool>(&query)
                .bind(value)
                .fetch_one(pool)
                .instrument(span),
        )
        .await
        .context("users exists probe timed out")?
        .context("failed to probe user existence")
    }

    /// Inserts a new user row. A concurrent insert of the same identifier
    /// surfaces as a unique violation, see [`is_unique_violation`].
    ///
    /// # Errors
    /// Returns an error if the insert fails or times out.
    pub async fn insert(pool: &PgPool, user: &User) -> Result<()> {
        let query = r"
            INSERT INTO users
                (id, name, username, email, password, phone, role_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
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
                .bind(&user.id)
                .bind(&user.name)
                .bind(&user.username)
                .bind(&user.email)
                .bind(&user.password)
                .bind(&user.phone)
                .bind(&user.role_id)
                .bind(user.created_at)
                .bind(user.updated_at)
                .execute(pool)
                .instrument(span),
        )
        .await
        .context("users insert timed out")?
        .context("failed to insert user")?;

        Ok(())
    }

    /// Inserts a replicated user row, replacing an existing row with the same
    /// id. Reapplying the same event is a no-op, which keeps the consumer
    /// idempotent.
    ///
    /// # Errors
    /// Returns an error if the upsert fails or times out.
    pub async fn upsert(pool: &PgPool, user: &User) -> Result<()> {
        let query = r"
            INSERT INTO users
                (id, name, username, email, password, phone, role_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                username = EXCLUDED.username,
                email = EXCLUDED.email,
                password = EXCLUDED.password,
                phone = EXCLUDED.phone,
                role_id = EXCLUDED.role_id,
                created_at = EXCLUDED.created_at,
                updated_at = EXCLUDED.updated_at
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
                .bind(&user.id)
                .bind(&user.name)
                .bind(&user.username)
                .bind(&user.email)
                .bind(&user.password)
                .bind(&user.phone)
                .bind(&user.role_id)
                .bind(user.created_at)
                .bind(user.updated_at)
                .execute(pool)
                .instrument(span),
        )
        .await
        .context("users upsert timed out")?
        .context("failed to upsert user")?;

        Ok(())
    }

    /// Updates every column of an existing row by id. Returns false when no
    /// row matched, callers treat that as a skip rather than a failure.
    ///
    /// # Errors
    /// Returns an error if the update fails or times out.
    pub async fn update(pool: &PgPool, user: &User) -> Result<bool> {
        let query = r"
            UPDATE users SET
                name = $2,
                username = $3,
                email = $4,
                password = $5,
                phone = $6,
                role_id = $7,
                created_at = $8,
                updated_at = $9
            WHERE id = $1
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );

        let result = timeout(
            DB_TIMEOUT,
            sqlx::query(query)
                .bind(&user.id)
                .bind(&user.name)
                .bind(&user.username)
                .bind(&user.email)
                .bind(&user.password)
                .bind(&user.phone)
                .bind(&user.role_id)
                .bind(user.created_at)
                .bind(user.updated_at)
                .execute(pool)
                .instrument(span),
        )
        .await
        .context("users update timed out")?
        .context("failed to update user")?;

        Ok(result.rows_affected() > 0)
    }

    /// Replaces the password digest and refreshes `updated_at`.
    ///
    /// # Errors
    /// Returns an error if the update fails or times out.
    pub async fn update_password(
        pool: &PgPool,
        id: &str,
        digest: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        let query = "UPDATE users SET password = $1, updated_at = $2 WHERE id = $3";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );

        timeout(
            DB_TIMEOUT,
            sqlx::query(query)
                .bind(digest)
                .bind(updated_at)
                .bind(id)
                .execute(pool)
                .instrument(span),
        )
        .await
        .context("password update timed out")?
        .context("failed to update password")?;

        Ok(())
    }

    /// Deletes a row by id. Returns false when the row was already gone.
    ///
    /// # Errors
    /// Returns an error if the delete fails or times out.
    pub async fn delete(pool: &PgPool, id: &str) -> Result<bool> {
        let query = "DELETE FROM users WHERE id = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE",
            db.statement = query
        );

        let result = timeout(
            DB_TIMEOUT,
            sqlx::query(query).bind(id).execute(pool).instrument(span),
        )
        .await
        .context("users delete timed out")?
        .context("failed to delete user")?;

        Ok(result.rows_affected() > 0)
    }
}

pub struct RoleRepo;

impl RoleRepo {
    /// Fetches a role by id. Users carry role ids without a foreign key, so
    /// callers must handle the miss.
    ///
    /// # Errors
    /// Returns an error if the query fails or times out.
    pub async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Role>> {
        let query = "SELECT id, name FROM roles WHERE id = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );

        timeout(
            DB_TIMEOUT,
            sqlx::query_as::<_, Role>(query)
                .bind(id)
                .fetch_optional(pool)
                .instrument(span),
        )
        .await
        .context("roles select timed out")?
        .context("failed to fetch role")
    }
}
