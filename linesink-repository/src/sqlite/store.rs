//! SQLite record store implementation.
//!
//! Provides the concrete [`RecordStore`] over a sqlx connection pool.
//! SQLite transactions are serializable, which is the isolation level the
//! exactly-once protocol assumes: the transaction is the only thing
//! serializing concurrent writers to the same record or checkpoint row.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::errors::StoreError;
use crate::interfaces::{ApplyOutcome, RecordStore};
use crate::retry::{with_retry, RetryPolicy};
use crate::sqlite::executor::{TxExecutor, UnitOutcome};
use crate::sqlite::schema;
use linesink_shared::{LineRecord, PartitionCheckpoint};

const SELECT_LAST_OFFSET: &str =
    "SELECT last_offset FROM partition_offsets WHERE partition_id = ?1";

const UPSERT_LINE: &str = "\
INSERT INTO file_lines (source, line, length) VALUES (?1, ?2, ?3)
ON CONFLICT (source, line) DO UPDATE SET length = excluded.length";

const UPSERT_OFFSET: &str = "\
INSERT INTO partition_offsets (partition_id, last_offset) VALUES (?1, ?2)
ON CONFLICT (partition_id) DO UPDATE SET last_offset = excluded.last_offset";

const SELECT_RECORDS: &str =
    "SELECT source, line, length FROM file_lines ORDER BY source, line";

/// SQLite-backed record store.
pub struct SqliteStore {
    executor: TxExecutor,
}

impl SqliteStore {
    /// Connect to the database at `url`, creating the file if missing.
    ///
    /// # Arguments
    ///
    /// * `url` - A sqlx SQLite URL (e.g. "sqlite://linesink.db")
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| StoreError::connection(e.to_string()))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(5))
            .connect_with(options)
            .await
            .map_err(StoreError::from)?;

        info!(url = %url, "Connected SQLite record store");

        Ok(Self::with_pool(pool))
    }

    /// Open a private in-memory store.
    ///
    /// The pool is pinned to a single connection: every pooled connection
    /// would otherwise see its own empty in-memory database.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(StoreError::from)?;

        Ok(Self::with_pool(pool))
    }

    /// Build a store over an existing pool with the default retry policy.
    pub fn with_pool(pool: SqlitePool) -> Self {
        Self::with_policy(pool, RetryPolicy::default())
    }

    /// Build a store over an existing pool with a custom retry policy.
    pub fn with_policy(pool: SqlitePool, policy: RetryPolicy) -> Self {
        Self {
            executor: TxExecutor::new(pool, policy),
        }
    }

    fn pool(&self) -> &SqlitePool {
        self.executor.pool()
    }

    async fn execute_schema(&self, statements: &[&str]) -> Result<(), StoreError> {
        for statement in statements {
            let statement: &str = statement;
            with_retry(self.executor.policy(), move || async move {
                sqlx::query(statement)
                    .execute(self.pool())
                    .await
                    .map_err(StoreError::from)
            })
            .await
            .map_err(|e| StoreError::schema(e.to_string()))?;
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn create_schema(&self) -> Result<(), StoreError> {
        self.execute_schema(&[schema::CREATE_FILE_LINES, schema::CREATE_PARTITION_OFFSETS])
            .await?;
        info!("Created record store schema");
        Ok(())
    }

    async fn drop_schema(&self) -> Result<(), StoreError> {
        self.execute_schema(&[schema::DROP_FILE_LINES, schema::DROP_PARTITION_OFFSETS])
            .await?;
        info!("Dropped record store schema");
        Ok(())
    }

    async fn apply(
        &self,
        record: &LineRecord,
        partition_id: i64,
        position: i64,
    ) -> Result<ApplyOutcome, StoreError> {
        let outcome = self
            .executor
            .run(|mut tx| async move {
                let row: Option<(i64,)> = sqlx::query_as(SELECT_LAST_OFFSET)
                    .bind(partition_id)
                    .fetch_optional(&mut *tx)
                    .await?;
                let last_offset = row.map(|(offset,)| offset).unwrap_or(0);

                // Redelivery of an already durable message: leave the store
                // untouched and let the caller re-acknowledge.
                if position <= last_offset {
                    return Ok((tx, UnitOutcome::Discard(ApplyOutcome::AlreadyApplied)));
                }

                sqlx::query(UPSERT_LINE)
                    .bind(&record.source)
                    .bind(record.line)
                    .bind(record.length)
                    .execute(&mut *tx)
                    .await?;

                // Same transaction as the record write: this co-location is
                // the exactly-once mechanism.
                sqlx::query(UPSERT_OFFSET)
                    .bind(partition_id)
                    .bind(position)
                    .execute(&mut *tx)
                    .await?;

                Ok((tx, UnitOutcome::Commit(ApplyOutcome::Applied)))
            })
            .await?;

        match outcome {
            ApplyOutcome::Applied => debug!(
                source = %record.source,
                line = record.line,
                partition_id,
                position,
                "Applied line record"
            ),
            ApplyOutcome::AlreadyApplied => debug!(
                partition_id,
                position, "Skipped already applied position"
            ),
        }

        Ok(outcome)
    }

    async fn checkpoint(
        &self,
        partition_id: i64,
    ) -> Result<Option<PartitionCheckpoint>, StoreError> {
        let row: Option<(i64,)> = with_retry(self.executor.policy(), move || async move {
            sqlx::query_as(SELECT_LAST_OFFSET)
                .bind(partition_id)
                .fetch_optional(self.pool())
                .await
                .map_err(StoreError::from)
        })
        .await?;

        Ok(row.map(|(last_offset,)| PartitionCheckpoint {
            partition_id,
            last_offset,
        }))
    }

    async fn list_records(&self) -> Result<Vec<LineRecord>, StoreError> {
        let rows: Vec<(String, i64, i64)> = with_retry(self.executor.policy(), move || async move {
            sqlx::query_as(SELECT_RECORDS)
                .fetch_all(self.pool())
                .await
                .map_err(StoreError::from)
        })
        .await?;

        Ok(rows
            .into_iter()
            .map(|(source, line, length)| LineRecord::new(source, line, length))
            .collect())
    }

    async fn health_check(&self) -> Result<bool, StoreError> {
        let one: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(self.pool())
            .await
            .map_err(StoreError::from)?;
        Ok(one == 1)
    }
}
