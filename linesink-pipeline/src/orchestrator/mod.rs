//! Orchestrator for the batch ingest flow.
//!
//! Coordinates producer and consumer over one run: schema bootstrap,
//! background consumer task, line publication, settle wait, stop signal,
//! final table read, teardown.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncBufRead;
use tokio::sync::watch;
use tracing::{info, instrument};

use crate::consumer::{CheckpointedConsumer, ConsumerConfig};
use crate::errors::PipelineError;
use crate::log::{MessageSink, MessageSource};
use crate::producer::LineProducer;
use linesink_repository::RecordStore;
use linesink_shared::LineRecord;

/// Configuration for the orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// How long to wait after the producer flush for the consumer to drain
    /// the log.
    pub settle: Duration,
    /// Poll timeout handed to the consumer.
    pub poll_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            settle: Duration::from_secs(5),
            poll_timeout: Duration::from_secs(1),
        }
    }
}

/// Orchestrator that runs the ingest flow end to end.
pub struct Orchestrator {
    store: Arc<dyn RecordStore>,
    sink: Arc<dyn MessageSink>,
    source: Arc<dyn MessageSource>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    /// Create an orchestrator with the default configuration.
    pub fn new(
        store: Arc<dyn RecordStore>,
        sink: Arc<dyn MessageSink>,
        source: Arc<dyn MessageSource>,
    ) -> Self {
        Self::with_config(store, sink, source, OrchestratorConfig::default())
    }

    /// Create an orchestrator with a custom configuration.
    pub fn with_config(
        store: Arc<dyn RecordStore>,
        sink: Arc<dyn MessageSink>,
        source: Arc<dyn MessageSource>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            store,
            sink,
            source,
            config,
        }
    }

    /// Run the batch flow and return the final table contents.
    ///
    /// The consumer runs as a background task for the duration of the run
    /// and is stopped through its watch signal once the settle window has
    /// passed; it finishes its in-flight message before exiting. Schema is
    /// created before the run and dropped after the final read.
    #[instrument(skip(self, reader))]
    pub async fn run<R>(&self, source_name: &str, reader: R) -> Result<Vec<LineRecord>, PipelineError>
    where
        R: AsyncBufRead + Unpin + Send,
    {
        self.store.create_schema().await?;

        let (stop_tx, stop_rx) = watch::channel(false);
        let consumer = CheckpointedConsumer::with_config(
            self.source.clone(),
            self.store.clone(),
            ConsumerConfig {
                poll_timeout: self.config.poll_timeout,
            },
        );
        let consumer_handle = tokio::spawn(async move { consumer.run(stop_rx).await });

        let producer = LineProducer::new(self.sink.clone());
        let published = producer.publish_lines(source_name, reader).await?;
        self.sink.flush().await?;
        info!(source = %source_name, lines = published, "Producer flushed");

        // Give the background consumer time to drain the log.
        tokio::time::sleep(self.config.settle).await;

        let _ = stop_tx.send(true);

        let records = self.store.list_records().await?;

        consumer_handle
            .await
            .map_err(|e| PipelineError::task(e.to_string()))?;

        self.store.drop_schema().await?;

        info!(records = records.len(), "Ingest run complete");
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::memory::MemoryLog;
    use linesink_repository::{SqliteStore, StoreError};
    use tokio::io::BufReader;

    fn test_config() -> OrchestratorConfig {
        OrchestratorConfig {
            settle: Duration::from_millis(100),
            poll_timeout: Duration::from_millis(10),
        }
    }

    async fn test_orchestrator() -> (Arc<MemoryLog>, Arc<SqliteStore>, Orchestrator) {
        let log = Arc::new(MemoryLog::new());
        let store = Arc::new(SqliteStore::in_memory().await.unwrap());
        let orchestrator = Orchestrator::with_config(
            store.clone(),
            log.clone(),
            log.clone(),
            test_config(),
        );
        (log, store, orchestrator)
    }

    #[tokio::test]
    async fn test_full_run_ingests_all_lines() {
        let (log, _store, orchestrator) = test_orchestrator().await;

        let records = orchestrator
            .run("f.txt", BufReader::new(&b"a\nbb\nccc"[..]))
            .await
            .unwrap();

        assert_eq!(
            records,
            vec![
                LineRecord::new("f.txt", 1, 1),
                LineRecord::new("f.txt", 2, 2),
                LineRecord::new("f.txt", 3, 3),
            ]
        );
        assert_eq!(log.acked().len(), 3);
    }

    #[tokio::test]
    async fn test_run_drops_schema_on_completion() {
        let (_log, store, orchestrator) = test_orchestrator().await;

        orchestrator
            .run("f.txt", BufReader::new(&b"a"[..]))
            .await
            .unwrap();

        assert!(matches!(
            store.list_records().await,
            Err(StoreError::QueryError(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_source_yields_empty_table() {
        let (log, _store, orchestrator) = test_orchestrator().await;

        let records = orchestrator
            .run("empty.txt", BufReader::new(&b""[..]))
            .await
            .unwrap();

        assert!(records.is_empty());
        assert!(log.acked().is_empty());
    }
}
