//! Record store trait definition.
//!
//! This module defines the abstract interface to the transactional store,
//! allowing different backend implementations (SQLite, mock, etc.). It is
//! the only surface other components use; transaction lifecycle management
//! stays behind it.

use async_trait::async_trait;

use crate::errors::StoreError;
use linesink_shared::{LineRecord, PartitionCheckpoint};

/// What happened when a message was offered to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The record and its checkpoint were written and committed.
    Applied,
    /// The message position was at or below the partition checkpoint; the
    /// store was left untouched.
    AlreadyApplied,
}

/// Abstract interface to the transactional record store.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync` to allow use across async tasks.
///
/// # Exactly-once contract
///
/// [`apply`](RecordStore::apply) runs the whole dedup/checkpoint state
/// machine for one message in a single transaction: checkpoint lookup,
/// duplicate check, record upsert, checkpoint upsert, commit. Callers only
/// acknowledge the message to the log after `apply` returns.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Create the record and checkpoint tables if they do not exist.
    async fn create_schema(&self) -> Result<(), StoreError>;

    /// Drop the record and checkpoint tables.
    async fn drop_schema(&self) -> Result<(), StoreError>;

    /// Apply one message to the store.
    ///
    /// Inside one serializable transaction: reads the checkpoint for
    /// `partition_id` (absent row reads as `0`), reports
    /// [`ApplyOutcome::AlreadyApplied`] without writing when
    /// `position <= last_offset`, and otherwise upserts `record` and
    /// advances the checkpoint to `position` before committing.
    ///
    /// Transient failures are retried internally with a fresh transaction
    /// per attempt.
    async fn apply(
        &self,
        record: &LineRecord,
        partition_id: i64,
        position: i64,
    ) -> Result<ApplyOutcome, StoreError>;

    /// Read the checkpoint row for a partition, if one exists.
    async fn checkpoint(&self, partition_id: i64)
        -> Result<Option<PartitionCheckpoint>, StoreError>;

    /// List all line records, ordered by source and line number.
    async fn list_records(&self) -> Result<Vec<LineRecord>, StoreError>;

    /// Check that the store is reachable.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - If the store answered the probe
    /// * `Err(StoreError)` - If the probe could not be executed
    async fn health_check(&self) -> Result<bool, StoreError>;
}
