//! Postgres harness for store-backed tests.
//!
//! Tests that need a live database connect to `CUSTOS_TEST_DSN` and apply
//! `sql/schema.sql` before running. Callers skip when the pool cannot be
//! built, so the suite stays green on machines without Postgres.

use anyhow::{bail, Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

const SCHEMA_SQL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/sql/schema.sql"));

pub(crate) struct TestDb {
    pub(crate) pool: PgPool,
}

impl TestDb {
    pub(crate) async fn new() -> Result<Self> {
        let Ok(dsn) = std::env::var("CUSTOS_TEST_DSN") else {
            eprintln!("Skipping integration test: CUSTOS_TEST_DSN is not set");
            bail!("CUSTOS_TEST_DSN is not set");
        };

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(&dsn)
            .await
            .context("failed to connect test pool")?;

        apply_schema(&pool).await?;

        Ok(Self { pool })
    }
}

/// The DDL is `IF NOT EXISTS` throughout, but concurrent creation of the
/// same table still races in Postgres, so setup serializes on an advisory
/// lock.
async fn apply_schema(pool: &PgPool) -> Result<()> {
    let mut conn = pool.acquire().await.context("failed to acquire connection")?;

    sqlx::query("SELECT pg_advisory_lock(420817)")
        .execute(&mut *conn)
        .await
        .context("failed to take schema lock")?;

    let applied = sqlx::raw_sql(SCHEMA_SQL).execute(&mut *conn).await;

    sqlx::query("SELECT pg_advisory_unlock(420817)")
        .execute(&mut *conn)
        .await
        .context("failed to release schema lock")?;

    applied.context("failed to apply schema")?;

    Ok(())
}
