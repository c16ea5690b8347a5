//! Postgres-backed journal.
//!
//! Rows are stored as JSONB in a single `kopontren_records` table keyed by
//! `(table_name, id)`. Each commit runs in one SQL transaction.
//!
//! ## Error Mapping
//!
//! | SQLx Error | StoreError |
//! |------------|------------|
//! | Database (any code) | `Journal` with the operation and database message |
//! | PoolClosed | `Journal` |
//! | Other | `Journal` |
//! | Row decode failure on load | `Corrupt` |

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use tracing::{instrument, Span};
use uuid::Uuid;

use super::journal::Journal;
use super::{Change, StoreError, StoredRow};

#[derive(Debug, Clone)]
pub struct PostgresJournal {
    pool: PgPool,
}

impl PostgresJournal {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and make sure the records table exists.
    #[instrument(skip(url), err)]
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        let journal = Self::new(pool);
        journal.ensure_schema().await?;
        Ok(journal)
    }

    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS kopontren_records (
                table_name TEXT NOT NULL,
                id UUID NOT NULL,
                body JSONB NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                PRIMARY KEY (table_name, id)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        Ok(())
    }
}

#[async_trait]
impl Journal for PostgresJournal {
    #[instrument(skip(self), fields(row_count = tracing::field::Empty), err)]
    async fn load(&self) -> Result<Vec<StoredRow>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT table_name, id, body
            FROM kopontren_records
            ORDER BY table_name, id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("load", e))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let decode = |e: sqlx::Error| StoreError::Corrupt(format!("failed to decode record row: {e}"));
            out.push(StoredRow {
                table: row.try_get::<String, _>("table_name").map_err(decode)?,
                id: row.try_get::<Uuid, _>("id").map_err(decode)?,
                body: row.try_get::<JsonValue, _>("body").map_err(decode)?,
            });
        }
        Span::current().record("row_count", out.len());
        Ok(out)
    }

    #[instrument(skip(self, changes), fields(change_count = changes.len()), err)]
    async fn commit(&self, changes: &[Change]) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        for change in changes {
            match &change.body {
                Some(body) => {
                    sqlx::query(
                        r#"
                        INSERT INTO kopontren_records (table_name, id, body, updated_at)
                        VALUES ($1, $2, $3, now())
                        ON CONFLICT (table_name, id)
                        DO UPDATE SET body = EXCLUDED.body, updated_at = now()
                        "#,
                    )
                    .bind(change.table)
                    .bind(change.id)
                    .bind(body)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| map_sqlx_error("upsert_record", e))?;
                }
                None => {
                    sqlx::query("DELETE FROM kopontren_records WHERE table_name = $1 AND id = $2")
                        .bind(change.table)
                        .bind(change.id)
                        .execute(&mut *tx)
                        .await
                        .map_err(|e| map_sqlx_error("delete_record", e))?;
                }
            }
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(())
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let code = db_err.code().map(|c| c.to_string()).unwrap_or_default();
            StoreError::Journal(format!(
                "database error in {operation} ({code}): {}",
                db_err.message()
            ))
        }
        sqlx::Error::PoolClosed => StoreError::Journal(format!("connection pool closed in {operation}")),
        other => StoreError::Journal(format!("sqlx error in {operation}: {other}")),
    }
}
