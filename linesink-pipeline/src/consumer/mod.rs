//! Checkpointed consumer: applies log messages to the store exactly once.
//!
//! Every delivered message runs through the store's dedup/checkpoint state
//! machine (lookup, duplicate check, apply, commit) and is acknowledged to
//! the log only after the store transaction is durable. Redeliveries are
//! detected against the per-partition checkpoint and neutralized without
//! touching already-correct state.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};

use crate::errors::PipelineError;
use crate::log::{InboundMessage, MessageSource};
use linesink_repository::{ApplyOutcome, RecordStore};
use linesink_shared::{LinePayload, LineRecord};

/// Configuration for the checkpointed consumer.
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    /// Upper bound on one log poll.
    pub poll_timeout: Duration,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            poll_timeout: Duration::from_secs(1),
        }
    }
}

/// Consumer that pulls messages from the log and applies them to the store.
pub struct CheckpointedConsumer {
    source: Arc<dyn MessageSource>,
    store: Arc<dyn RecordStore>,
    config: ConsumerConfig,
}

impl CheckpointedConsumer {
    /// Create a consumer with the default configuration.
    pub fn new(source: Arc<dyn MessageSource>, store: Arc<dyn RecordStore>) -> Self {
        Self::with_config(source, store, ConsumerConfig::default())
    }

    /// Create a consumer with a custom configuration.
    pub fn with_config(
        source: Arc<dyn MessageSource>,
        store: Arc<dyn RecordStore>,
        config: ConsumerConfig,
    ) -> Self {
        Self {
            source,
            store,
            config,
        }
    }

    /// Run the poll loop until `stop` flips to true.
    ///
    /// The stop signal is only observed between messages: a message that is
    /// being processed is carried through commit and acknowledgment before
    /// the loop exits. A message that fails terminally is logged and left
    /// unacknowledged for redelivery; the loop moves on to the next one.
    #[instrument(skip(self, stop))]
    pub async fn run(&self, stop: watch::Receiver<bool>) {
        info!("Read worker started");

        while !*stop.borrow() {
            match self.source.receive(self.config.poll_timeout).await {
                Ok(Some(message)) => {
                    if let Err(e) = self.process(&message).await {
                        error!(
                            partition_id = message.partition_id,
                            position = message.position,
                            error = %e,
                            "Failed to process message"
                        );
                    }
                }
                // Empty poll: fall through to the stop check.
                Ok(None) => {}
                Err(e) => error!(error = %e, "Log receive error"),
            }
        }

        info!("Read worker stopped");
    }

    /// Process one delivered message through the dedup/checkpoint state
    /// machine.
    async fn process(&self, message: &InboundMessage) -> Result<(), PipelineError> {
        let payload = match LinePayload::decode(&message.payload) {
            Ok(payload) => payload,
            Err(e) => {
                // Skip-and-ack: an undecodable payload would fail the same
                // way on every redelivery, so it is acknowledged and dropped
                // with the checkpoint left untouched.
                warn!(
                    partition_id = message.partition_id,
                    position = message.position,
                    error = %e,
                    "Skipping undecodable payload"
                );
                self.source.acknowledge(message).await?;
                return Ok(());
            }
        };

        let record = LineRecord::from_payload(&payload);
        let outcome = self
            .store
            .apply(&record, message.partition_id, message.position)
            .await?;

        match outcome {
            ApplyOutcome::Applied => debug!(
                source = %record.source,
                line = record.line,
                partition_id = message.partition_id,
                position = message.position,
                "Applied message"
            ),
            ApplyOutcome::AlreadyApplied => debug!(
                partition_id = message.partition_id,
                position = message.position,
                "Redelivered message skipped"
            ),
        }

        // The store commit is durable at this point; only now does the log
        // learn the message is done.
        self.source.acknowledge(message).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::memory::MemoryLog;
    use linesink_repository::SqliteStore;

    fn test_config() -> ConsumerConfig {
        ConsumerConfig {
            poll_timeout: Duration::from_millis(10),
        }
    }

    async fn test_store() -> Arc<SqliteStore> {
        let store = SqliteStore::in_memory().await.unwrap();
        store.create_schema().await.unwrap();
        Arc::new(store)
    }

    /// Run the consumer until the log is drained, then stop it.
    async fn drain(log: Arc<MemoryLog>, store: Arc<SqliteStore>) {
        let consumer =
            CheckpointedConsumer::with_config(log.clone(), store.clone(), test_config());
        let (stop_tx, stop_rx) = watch::channel(false);

        let handle = tokio::spawn(async move { consumer.run(stop_rx).await });

        while !log.is_drained() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;

        stop_tx.send(true).unwrap();
        handle.await.unwrap();
    }

    fn line_message(line: i64, text: &str) -> Vec<u8> {
        LinePayload::new("f.txt", line, text).encode().unwrap()
    }

    #[tokio::test]
    async fn test_applies_delivered_lines() {
        let log = Arc::new(MemoryLog::new());
        let store = test_store().await;

        log.push(0, 1, line_message(1, "a"));
        log.push(0, 2, line_message(2, "bb"));
        log.push(0, 3, line_message(3, "ccc"));

        drain(log.clone(), store.clone()).await;

        assert_eq!(
            store.list_records().await.unwrap(),
            vec![
                LineRecord::new("f.txt", 1, 1),
                LineRecord::new("f.txt", 2, 2),
                LineRecord::new("f.txt", 3, 3),
            ]
        );
        assert_eq!(
            store.checkpoint(0).await.unwrap().unwrap().last_offset,
            3
        );
        assert_eq!(log.acked(), vec![(0, 1), (0, 2), (0, 3)]);
    }

    #[tokio::test]
    async fn test_stale_message_is_acknowledged_without_write() {
        let log = Arc::new(MemoryLog::new());
        let store = test_store().await;

        // Checkpoint already at 7 from an earlier run.
        let seed = LineRecord::new("f.txt", 1, 1);
        store.apply(&seed, 0, 7).await.unwrap();

        // Position 5 is redelivered after the fact.
        log.push(0, 5, line_message(9, "stale text"));

        drain(log.clone(), store.clone()).await;

        assert_eq!(store.list_records().await.unwrap(), vec![seed]);
        assert_eq!(
            store.checkpoint(0).await.unwrap().unwrap().last_offset,
            7
        );
        // The duplicate is still acknowledged so the log stops redelivering.
        assert_eq!(log.acked(), vec![(0, 5)]);
    }

    #[tokio::test]
    async fn test_every_message_delivered_twice_applies_once() {
        let log = Arc::new(MemoryLog::new());
        let store = test_store().await;

        // Each message twice, interleaved.
        for position in [1, 1, 2, 3, 2, 3] {
            let text = "x".repeat(position as usize);
            log.push(0, position, line_message(position, &text));
        }

        drain(log.clone(), store.clone()).await;

        assert_eq!(
            store.list_records().await.unwrap(),
            vec![
                LineRecord::new("f.txt", 1, 1),
                LineRecord::new("f.txt", 2, 2),
                LineRecord::new("f.txt", 3, 3),
            ]
        );
        assert_eq!(log.acked().len(), 6);
    }

    #[tokio::test]
    async fn test_partitions_are_checkpointed_independently() {
        let log = Arc::new(MemoryLog::new());
        let store = test_store().await;

        log.push(0, 1, LinePayload::new("a.txt", 1, "a").encode().unwrap());
        log.push(1, 1, LinePayload::new("b.txt", 1, "bb").encode().unwrap());

        drain(log.clone(), store.clone()).await;

        assert_eq!(store.checkpoint(0).await.unwrap().unwrap().last_offset, 1);
        assert_eq!(store.checkpoint(1).await.unwrap().unwrap().last_offset, 1);
        assert_eq!(store.list_records().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_undecodable_payload_is_skipped_and_acknowledged() {
        let log = Arc::new(MemoryLog::new());
        let store = test_store().await;

        log.push(0, 1, b"not a payload".to_vec());
        log.push(0, 2, line_message(1, "a"));

        drain(log.clone(), store.clone()).await;

        // The poisoned message is acknowledged but leaves no trace; the one
        // behind it still goes through.
        assert_eq!(
            store.list_records().await.unwrap(),
            vec![LineRecord::new("f.txt", 1, 1)]
        );
        assert_eq!(store.checkpoint(0).await.unwrap().unwrap().last_offset, 2);
        assert_eq!(log.acked(), vec![(0, 1), (0, 2)]);
    }

    #[tokio::test]
    async fn test_stops_on_signal_with_empty_log() {
        let log = Arc::new(MemoryLog::new());
        let store = test_store().await;
        let consumer = CheckpointedConsumer::with_config(log, store, test_config());

        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(async move { consumer.run(stop_rx).await });

        stop_tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
