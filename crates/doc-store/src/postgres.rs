use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;

use crate::{
    Result, ScanFilter,
    store::{BaseStore, RecordStream},
};

/// PostgreSQL-backed base store.
///
/// Every record is a JSONB row keyed by `(kind, key)`. Equality scans use
/// JSONB containment, which the GIN index on `body` serves.
#[derive(Clone)]
pub struct PostgresBaseStore {
    pool: PgPool,
}

impl PostgresBaseStore {
    /// Creates a new PostgreSQL base store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }
}

#[async_trait]
impl BaseStore for PostgresBaseStore {
    async fn put(&self, kind: &str, key: &str, record: Value) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO records (kind, key, body)
            VALUES ($1, $2, $3)
            ON CONFLICT (kind, key) DO UPDATE SET body = EXCLUDED.body
            "#,
        )
        .bind(kind)
        .bind(key)
        .bind(&record)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, kind: &str, key: &str) -> Result<Option<Value>> {
        let body: Option<Value> =
            sqlx::query_scalar("SELECT body FROM records WHERE kind = $1 AND key = $2")
                .bind(kind)
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        Ok(body)
    }

    async fn delete(&self, kind: &str, key: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM records WHERE kind = $1 AND key = $2")
            .bind(kind)
            .bind(key)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn scan(&self, kind: &str, filter: &ScanFilter) -> Result<RecordStream> {
        use futures_util::stream;

        // The statement is a single snapshot; rows are materialized so the
        // returned stream does not borrow the pool.
        let bodies: Vec<Value> = if filter.is_empty() {
            sqlx::query_scalar("SELECT body FROM records WHERE kind = $1 ORDER BY key")
                .bind(kind)
                .fetch_all(&self.pool)
                .await?
        } else {
            sqlx::query_scalar(
                "SELECT body FROM records WHERE kind = $1 AND body @> $2 ORDER BY key",
            )
            .bind(kind)
            .bind(filter.as_json())
            .fetch_all(&self.pool)
            .await?
        };

        Ok(Box::pin(stream::iter(bodies.into_iter().map(Ok))))
    }
}
