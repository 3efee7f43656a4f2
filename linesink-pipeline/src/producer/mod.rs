//! Line producer: maps source lines to sequenced log messages.

use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, instrument};

use crate::errors::PipelineError;
use crate::log::{MessageSink, OutboundMessage};
use linesink_shared::LinePayload;

/// Producer that publishes the lines of one source to the log.
///
/// Dedup is entirely a consumer-side concern: redelivery is a property of
/// the log, not of production, so the producer does nothing but map lines
/// to messages in order.
pub struct LineProducer {
    sink: Arc<dyn MessageSink>,
}

impl LineProducer {
    /// Create a producer writing through the given sink.
    pub fn new(sink: Arc<dyn MessageSink>) -> Self {
        Self { sink }
    }

    /// Publish every line of `reader` as one message.
    ///
    /// Lines are numbered from 1 and the line number doubles as the message
    /// sequence. The source name is used as the partitioning key, so all
    /// lines of one source land on the same partition. Sends are buffered;
    /// the caller confirms delivery with [`MessageSink::flush`].
    ///
    /// # Returns
    ///
    /// The number of lines published.
    #[instrument(skip(self, reader))]
    pub async fn publish_lines<R>(&self, source: &str, reader: R) -> Result<i64, PipelineError>
    where
        R: AsyncBufRead + Unpin + Send,
    {
        let mut lines = reader.lines();
        let mut sequence = 0;

        while let Some(text) = lines.next_line().await? {
            sequence += 1;
            let payload = LinePayload::new(source, sequence, text).encode()?;
            self.sink
                .send(OutboundMessage {
                    key: source.to_string(),
                    sequence,
                    payload,
                })
                .await?;
        }

        debug!(source = %source, lines = sequence, "Published source lines");
        Ok(sequence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tokio::io::BufReader;

    use async_trait::async_trait;

    /// Mock sink that captures sent messages.
    struct CapturingSink {
        sent: Mutex<Vec<OutboundMessage>>,
    }

    impl CapturingSink {
        fn new() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl MessageSink for CapturingSink {
        async fn send(&self, message: OutboundMessage) -> Result<(), PipelineError> {
            self.sent.lock().unwrap().push(message);
            Ok(())
        }

        async fn flush(&self) -> Result<(), PipelineError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_publishes_one_message_per_line() {
        let sink = Arc::new(CapturingSink::new());
        let producer = LineProducer::new(sink.clone());

        let published = producer
            .publish_lines("f.txt", BufReader::new(&b"a\nbb\nccc"[..]))
            .await
            .unwrap();

        assert_eq!(published, 3);

        let sent = sink.sent.lock().unwrap();
        assert_eq!(sent.len(), 3);
        assert!(sent.iter().all(|m| m.key == "f.txt"));
        assert_eq!(
            sent.iter().map(|m| m.sequence).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );

        let decoded = LinePayload::decode(&sent[1].payload).unwrap();
        assert_eq!(decoded, LinePayload::new("f.txt", 2, "bb"));
    }

    #[tokio::test]
    async fn test_empty_source_publishes_nothing() {
        let sink = Arc::new(CapturingSink::new());
        let producer = LineProducer::new(sink.clone());

        let published = producer
            .publish_lines("empty.txt", BufReader::new(&b""[..]))
            .await
            .unwrap();

        assert_eq!(published, 0);
        assert!(sink.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_blank_lines_keep_their_sequence() {
        let sink = Arc::new(CapturingSink::new());
        let producer = LineProducer::new(sink.clone());

        producer
            .publish_lines("f.txt", BufReader::new(&b"a\n\nc"[..]))
            .await
            .unwrap();

        let sent = sink.sent.lock().unwrap();
        let decoded = LinePayload::decode(&sent[1].payload).unwrap();
        assert_eq!(decoded.line, 2);
        assert_eq!(decoded.text, "");
    }
}
