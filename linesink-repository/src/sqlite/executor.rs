//! Retry-wrapped transaction executor.
//!
//! Every store mutation runs through [`TxExecutor::run`]: the executor
//! begins a transaction, hands it to the unit of work, and commits or rolls
//! back based on the unit's decision. On a transient failure anywhere in
//! that sequence the whole unit is re-run against a fresh transaction, so
//! units must be idempotent and free of side effects outside the
//! transaction.

use std::future::Future;

use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::errors::StoreError;
use crate::retry::{with_retry, RetryPolicy};

/// Decision returned by a unit of work.
#[derive(Debug)]
pub enum UnitOutcome<T> {
    /// Commit the transaction, then return the value.
    Commit(T),
    /// Roll the transaction back (nothing to persist), then return the
    /// value. Used when the unit decides the work was already done.
    Discard(T),
}

/// Executes units of work against the store with automatic retry on
/// transient failure.
pub struct TxExecutor {
    pool: SqlitePool,
    policy: RetryPolicy,
}

impl TxExecutor {
    /// Create an executor over a connection pool with the given retry
    /// policy.
    pub fn new(pool: SqlitePool, policy: RetryPolicy) -> Self {
        Self { pool, policy }
    }

    /// The pool this executor runs against.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// The retry policy applied to every unit of work.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run one unit of work inside a transaction.
    ///
    /// The unit receives a fresh transaction per attempt and must return it
    /// together with a [`UnitOutcome`] deciding commit or rollback. An `Err`
    /// from the unit drops the transaction, which rolls it back; if the
    /// error is retryable the unit is re-run from scratch until the retry
    /// budget is exhausted.
    pub async fn run<T, F, Fut>(&self, unit: F) -> Result<T, StoreError>
    where
        F: Fn(Transaction<'static, Sqlite>) -> Fut,
        Fut: Future<Output = Result<(Transaction<'static, Sqlite>, UnitOutcome<T>), StoreError>>,
    {
        let unit = &unit;
        with_retry(&self.policy, move || async move {
            let tx = self.pool.begin().await.map_err(StoreError::from)?;
            let (tx, outcome) = unit(tx).await?;
            match outcome {
                UnitOutcome::Commit(value) => {
                    tx.commit().await.map_err(StoreError::from)?;
                    Ok(value)
                }
                UnitOutcome::Discard(value) => {
                    tx.rollback().await.map_err(StoreError::from)?;
                    Ok(value)
                }
            }
        })
        .await
    }
}
