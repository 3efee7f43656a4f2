//! # Linesink Repository
//!
//! This crate provides traits and implementations for the transactional
//! record store: the line-record table, the per-partition offset
//! checkpoints, and the retry-wrapped transaction executor every store
//! access goes through.

pub mod errors;
pub mod interfaces;
pub mod retry;
pub mod sqlite;

pub use errors::StoreError;
pub use interfaces::{ApplyOutcome, RecordStore};
pub use retry::{with_retry, RetryPolicy};
pub use sqlite::SqliteStore;
