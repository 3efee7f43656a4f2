//! Dependency initialization and wiring for the batch run.

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use crate::RunError;
use linesink_pipeline::log::{delete_topic, ensure_topic, KafkaSink, KafkaSource, TopicSpec};
use linesink_pipeline::orchestrator::Orchestrator;
use linesink_repository::{RecordStore, SqliteStore};
use linesink_shared::LineRecord;

/// Default Kafka broker address.
const DEFAULT_KAFKA_BROKER: &str = "localhost:9092";

/// Default SQLite database URL.
const DEFAULT_DATABASE_URL: &str = "sqlite://linesink.db";

/// Default Kafka consumer group ID.
const DEFAULT_KAFKA_GROUP_ID: &str = "file-consumer";

/// Default source file to ingest.
const DEFAULT_SOURCE_FILE: &str = "file.txt";

/// Topic the pipeline runs over.
const FILE_TOPIC: &str = "file.lines";

/// Partition count the topic is created with.
const TOPIC_PARTITIONS: i32 = 2;

/// Container for all initialized dependencies.
pub struct Dependencies {
    orchestrator: Orchestrator,
    kafka_broker: String,
    source_file: PathBuf,
}

impl Dependencies {
    /// Initialize all dependencies from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `KAFKA_BROKER`: Kafka broker address (default: localhost:9092)
    /// - `DATABASE_URL`: SQLite database URL (default: sqlite://linesink.db)
    /// - `KAFKA_GROUP_ID`: Consumer group ID (default: file-consumer)
    /// - `SOURCE_FILE`: Path of the text file to ingest (default: file.txt)
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(RunError)` - If initialization fails
    pub async fn new() -> Result<Self, RunError> {
        let kafka_broker =
            env::var("KAFKA_BROKER").unwrap_or_else(|_| DEFAULT_KAFKA_BROKER.to_string());
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());
        let group_id =
            env::var("KAFKA_GROUP_ID").unwrap_or_else(|_| DEFAULT_KAFKA_GROUP_ID.to_string());
        let source_file =
            env::var("SOURCE_FILE").unwrap_or_else(|_| DEFAULT_SOURCE_FILE.to_string());

        info!(
            kafka_broker = %kafka_broker,
            database_url = %database_url,
            group_id = %group_id,
            source_file = %source_file,
            "Initializing dependencies"
        );

        let store = SqliteStore::connect(&database_url).await?;

        // Verify the store is reachable before touching Kafka.
        let healthy = store.health_check().await?;
        if !healthy {
            return Err(RunError::config("record store failed its health probe"));
        }
        info!("Record store connection verified");

        let sink = KafkaSink::new(&kafka_broker, FILE_TOPIC)?;
        let source = KafkaSource::new(&kafka_broker, &group_id, FILE_TOPIC)?;

        let orchestrator =
            Orchestrator::new(Arc::new(store), Arc::new(sink), Arc::new(source));

        Ok(Self {
            orchestrator,
            kafka_broker,
            source_file: PathBuf::from(source_file),
        })
    }

    /// Run the full batch flow: topic bootstrap, ingest, topic teardown.
    ///
    /// # Returns
    ///
    /// The final contents of the line record table.
    pub async fn run(&self) -> Result<Vec<LineRecord>, RunError> {
        let spec = TopicSpec::new(FILE_TOPIC, TOPIC_PARTITIONS);
        ensure_topic(&self.kafka_broker, &spec).await?;

        let file = tokio::fs::File::open(&self.source_file).await?;
        let reader = tokio::io::BufReader::new(file);
        let source_name = self.source_file.display().to_string();

        let records = self.orchestrator.run(&source_name, reader).await?;

        delete_topic(&self.kafka_broker, FILE_TOPIC).await?;

        Ok(records)
    }
}
