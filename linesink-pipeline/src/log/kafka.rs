//! Kafka implementations of the log boundary.
//!
//! The sink wraps a `FutureProducer`, the source a `StreamConsumer` with
//! auto-commit disabled: offsets are only committed through
//! [`MessageSource::acknowledge`], after the store transaction is durable.

use std::time::Duration;

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::message::{Header, Message, OwnedHeaders};
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::{Offset, TopicPartitionList};
use tracing::info;

use crate::errors::PipelineError;
use crate::log::{InboundMessage, MessageSink, MessageSource, OutboundMessage};

const FLUSH_TIMEOUT: Duration = Duration::from_secs(10);

/// Kafka producer for line messages.
pub struct KafkaSink {
    producer: FutureProducer,
    topic: String,
}

impl KafkaSink {
    /// Create a new Kafka sink writing to `topic`.
    ///
    /// # Arguments
    ///
    /// * `brokers` - Kafka broker addresses (comma-separated)
    /// * `topic` - Topic to append to
    pub fn new(brokers: &str, topic: &str) -> Result<Self, PipelineError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("compression.type", "zstd")
            .set("message.timeout.ms", "5000")
            .create()?;

        info!(brokers = %brokers, topic = %topic, "Created Kafka producer");

        Ok(Self {
            producer,
            topic: topic.to_string(),
        })
    }
}

#[async_trait]
impl MessageSink for KafkaSink {
    async fn send(&self, message: OutboundMessage) -> Result<(), PipelineError> {
        let sequence = message.sequence.to_string();
        let record = FutureRecord::to(&self.topic)
            .key(&message.key)
            .payload(&message.payload)
            .headers(OwnedHeaders::new().insert(Header {
                key: "sequence",
                value: Some(&sequence),
            }));

        // Enqueue only; delivery is confirmed by the final flush.
        self.producer
            .send_result(record)
            .map_err(|(e, _)| PipelineError::from(e))?;

        Ok(())
    }

    async fn flush(&self) -> Result<(), PipelineError> {
        self.producer.flush(FLUSH_TIMEOUT)?;
        Ok(())
    }
}

/// Kafka consumer for line messages.
pub struct KafkaSource {
    consumer: StreamConsumer,
}

impl KafkaSource {
    /// Create a new Kafka source subscribed to `topic`.
    ///
    /// # Arguments
    ///
    /// * `brokers` - Kafka broker addresses (comma-separated)
    /// * `group_id` - Consumer group ID
    /// * `topic` - Topic to consume
    pub fn new(brokers: &str, group_id: &str, topic: &str) -> Result<Self, PipelineError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("group.id", group_id)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "earliest")
            .set("session.timeout.ms", "6000")
            .create()?;

        consumer.subscribe(&[topic])?;

        info!(
            brokers = %brokers,
            group_id = %group_id,
            topic = %topic,
            "Created Kafka consumer"
        );

        Ok(Self { consumer })
    }
}

#[async_trait]
impl MessageSource for KafkaSource {
    async fn receive(&self, timeout: Duration) -> Result<Option<InboundMessage>, PipelineError> {
        match tokio::time::timeout(timeout, self.consumer.recv()).await {
            // Empty poll: nothing arrived within the timeout.
            Err(_) => Ok(None),
            Ok(Err(e)) => Err(PipelineError::from(e)),
            Ok(Ok(message)) => {
                let payload = message.payload().map(<[u8]>::to_vec).unwrap_or_default();
                Ok(Some(InboundMessage {
                    topic: message.topic().to_string(),
                    partition_id: i64::from(message.partition()),
                    // One-based position, i.e. Kafka's committed-offset
                    // convention of "number of messages consumed".
                    position: message.offset() + 1,
                    payload,
                }))
            }
        }
    }

    async fn acknowledge(&self, message: &InboundMessage) -> Result<(), PipelineError> {
        let mut tpl = TopicPartitionList::new();
        tpl.add_partition_offset(
            &message.topic,
            message.partition_id as i32,
            Offset::Offset(message.position),
        )?;

        self.consumer.commit(&tpl, CommitMode::Async)?;

        Ok(())
    }
}
