//! Log boundary for the pipeline.
//!
//! Defines the producer- and consumer-side interfaces to the partitioned,
//! at-least-once message log, plus the Kafka implementations. Partitions
//! and positions are assigned by the log, never by this system.

mod admin;
mod kafka;
#[cfg(test)]
pub(crate) mod memory;

pub use admin::{delete_topic, ensure_topic, TopicSpec};
pub use kafka::{KafkaSink, KafkaSource};

use std::time::Duration;

use async_trait::async_trait;

use crate::errors::PipelineError;

/// A message handed to the log for appending.
#[derive(Debug, Clone)]
pub struct OutboundMessage {
    /// Partitioning key; the log maps equal keys to the same partition.
    pub key: String,
    /// Caller-assigned sequence number, monotonic within a stream.
    pub sequence: i64,
    /// Encoded payload bytes.
    pub payload: Vec<u8>,
}

/// A message delivered by the log.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    /// Topic the message was read from.
    pub topic: String,
    /// Partition the log assigned on append.
    pub partition_id: i64,
    /// One-based position of the message within its partition, assigned by
    /// the log on append and immutable thereafter. This is the value the
    /// consumer checkpoints.
    pub position: i64,
    /// Encoded payload bytes.
    pub payload: Vec<u8>,
}

/// Producer-side log interface.
#[async_trait]
pub trait MessageSink: Send + Sync {
    /// Enqueue a message for delivery.
    ///
    /// Fire-and-forget: the send is buffered and delivery is only confirmed
    /// by a later [`flush`](MessageSink::flush).
    async fn send(&self, message: OutboundMessage) -> Result<(), PipelineError>;

    /// Block until every buffered message has been delivered.
    async fn flush(&self) -> Result<(), PipelineError>;
}

/// Consumer-side log interface.
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Wait up to `timeout` for the next message.
    ///
    /// `Ok(None)` means the poll timed out with nothing to deliver; it is
    /// not an error.
    async fn receive(&self, timeout: Duration) -> Result<Option<InboundMessage>, PipelineError>;

    /// Acknowledge a delivered message back to the log.
    ///
    /// Must only be called once the message's effects are durable: an
    /// unacknowledged message is redelivered, an acknowledged one may still
    /// be redelivered by an at-least-once log.
    async fn acknowledge(&self, message: &InboundMessage) -> Result<(), PipelineError>;
}
