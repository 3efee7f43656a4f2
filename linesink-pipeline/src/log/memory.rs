//! In-memory log used by pipeline tests.
//!
//! Delivers messages in FIFO order and records acknowledgments. Sent
//! messages land on partition 0 with one-based positions; redelivery
//! scenarios are scripted by pushing inbound messages directly.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::errors::PipelineError;
use crate::log::{InboundMessage, MessageSink, MessageSource, OutboundMessage};

pub(crate) struct MemoryLog {
    queue: Mutex<VecDeque<InboundMessage>>,
    acked: Mutex<Vec<(i64, i64)>>,
    next_position: AtomicI64,
}

impl MemoryLog {
    pub(crate) fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            acked: Mutex::new(Vec::new()),
            next_position: AtomicI64::new(1),
        }
    }

    /// Script a delivery with an explicit partition and position.
    pub(crate) fn push(&self, partition_id: i64, position: i64, payload: Vec<u8>) {
        self.queue.lock().unwrap().push_back(InboundMessage {
            topic: "memory".to_string(),
            partition_id,
            position,
            payload,
        });
    }

    /// `(partition_id, position)` pairs acknowledged so far, in order.
    pub(crate) fn acked(&self) -> Vec<(i64, i64)> {
        self.acked.lock().unwrap().clone()
    }

    pub(crate) fn is_drained(&self) -> bool {
        self.queue.lock().unwrap().is_empty()
    }
}

#[async_trait]
impl MessageSink for MemoryLog {
    async fn send(&self, message: OutboundMessage) -> Result<(), PipelineError> {
        let position = self.next_position.fetch_add(1, Ordering::SeqCst);
        self.push(0, position, message.payload);
        Ok(())
    }

    async fn flush(&self) -> Result<(), PipelineError> {
        Ok(())
    }
}

#[async_trait]
impl MessageSource for MemoryLog {
    async fn receive(&self, _timeout: Duration) -> Result<Option<InboundMessage>, PipelineError> {
        let message = self.queue.lock().unwrap().pop_front();
        if message.is_none() {
            // Keep an empty poll from spinning the caller hot.
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        Ok(message)
    }

    async fn acknowledge(&self, message: &InboundMessage) -> Result<(), PipelineError> {
        self.acked
            .lock()
            .unwrap()
            .push((message.partition_id, message.position));
        Ok(())
    }
}
