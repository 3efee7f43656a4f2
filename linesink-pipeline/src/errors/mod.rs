//! Error types for the linesink pipeline.

use linesink_repository::StoreError;
use linesink_shared::PayloadError;
use thiserror::Error;

/// Errors that can occur in the linesink pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Kafka-level error (producer, consumer, or admin).
    #[error("Kafka error: {0}")]
    KafkaError(String),

    /// Error encoding or decoding a message payload.
    #[error("Payload error: {0}")]
    PayloadError(#[from] PayloadError),

    /// Error from the record store.
    #[error("Store error: {0}")]
    StoreError(#[from] StoreError),

    /// A background task failed or could not be joined.
    #[error("Task error: {0}")]
    TaskError(String),

    /// Error reading the line source.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl PipelineError {
    /// Create a Kafka error.
    pub fn kafka(msg: impl Into<String>) -> Self {
        Self::KafkaError(msg.into())
    }

    /// Create a task error.
    pub fn task(msg: impl Into<String>) -> Self {
        Self::TaskError(msg.into())
    }
}

impl From<rdkafka::error::KafkaError> for PipelineError {
    fn from(err: rdkafka::error::KafkaError) -> Self {
        Self::KafkaError(err.to_string())
    }
}
