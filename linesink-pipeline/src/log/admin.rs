//! Topic bootstrap and teardown via the Kafka admin API.

use rdkafka::admin::{AdminClient, AdminOptions, NewTopic, TopicReplication};
use rdkafka::client::DefaultClientContext;
use rdkafka::config::ClientConfig;
use rdkafka::types::RDKafkaErrorCode;
use tracing::{debug, info};

use crate::errors::PipelineError;

/// Shape of the topic the pipeline runs over.
#[derive(Debug, Clone)]
pub struct TopicSpec {
    /// Topic name.
    pub name: String,
    /// Number of partitions to create the topic with.
    pub partitions: i32,
    /// Replication factor.
    pub replication: i32,
    /// Additional per-topic config entries (e.g. retention).
    pub configs: Vec<(String, String)>,
}

impl TopicSpec {
    /// Create a spec with the given partition count and no replication.
    pub fn new(name: impl Into<String>, partitions: i32) -> Self {
        Self {
            name: name.into(),
            partitions,
            replication: 1,
            configs: Vec::new(),
        }
    }

    /// Add a per-topic config entry.
    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.configs.push((key.into(), value.into()));
        self
    }
}

fn admin_client(brokers: &str) -> Result<AdminClient<DefaultClientContext>, PipelineError> {
    ClientConfig::new()
        .set("bootstrap.servers", brokers)
        .create()
        .map_err(PipelineError::from)
}

/// Create the topic described by `spec` if it does not already exist.
pub async fn ensure_topic(brokers: &str, spec: &TopicSpec) -> Result<(), PipelineError> {
    let admin = admin_client(brokers)?;

    let mut topic = NewTopic::new(
        &spec.name,
        spec.partitions,
        TopicReplication::Fixed(spec.replication),
    );
    for (key, value) in &spec.configs {
        topic = topic.set(key, value);
    }

    let results = admin.create_topics([&topic], &AdminOptions::new()).await?;
    for result in results {
        match result {
            Ok(name) => info!(topic = %name, "Created topic"),
            Err((name, RDKafkaErrorCode::TopicAlreadyExists)) => {
                debug!(topic = %name, "Topic already exists")
            }
            Err((name, code)) => {
                return Err(PipelineError::kafka(format!(
                    "failed to create topic {}: {}",
                    name, code
                )))
            }
        }
    }

    Ok(())
}

/// Delete a topic, tolerating it being already gone.
pub async fn delete_topic(brokers: &str, name: &str) -> Result<(), PipelineError> {
    let admin = admin_client(brokers)?;

    let results = admin.delete_topics(&[name], &AdminOptions::new()).await?;
    for result in results {
        match result {
            Ok(name) => info!(topic = %name, "Deleted topic"),
            Err((name, RDKafkaErrorCode::UnknownTopicOrPartition)) => {
                debug!(topic = %name, "Topic already deleted")
            }
            Err((name, code)) => {
                return Err(PipelineError::kafka(format!(
                    "failed to delete topic {}: {}",
                    name, code
                )))
            }
        }
    }

    Ok(())
}
