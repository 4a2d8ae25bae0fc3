//! # In-Memory Message Queue
//!
//! Process-local `MessageQueue`: publishes are recorded rather than sent.
//! Remote plugins declare their queues on a broker this process never sees,
//! so deleting a queue that was never declared here succeeds without
//! recording anything.

use std::collections::BTreeSet;

use async_trait::async_trait;
use gd_01_systems::{MessageQueue, QueueError, QueueMessage};
use parking_lot::Mutex;
use tracing::{debug, info};

/// A message as it was handed to the bus.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedMessage {
    pub routing_key: String,
    pub message: QueueMessage,
}

#[derive(Default)]
pub struct InMemoryQueue {
    queues: Mutex<BTreeSet<String>>,
    published: Mutex<Vec<PublishedMessage>>,
    deleted: Mutex<Vec<(String, bool)>>,
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a queue known so it can later be deleted.
    pub fn declare(&self, name: impl Into<String>) {
        self.queues.lock().insert(name.into());
    }

    #[must_use]
    pub fn has_queue(&self, name: &str) -> bool {
        self.queues.lock().contains(name)
    }

    #[must_use]
    pub fn published(&self) -> Vec<PublishedMessage> {
        self.published.lock().clone()
    }

    /// Deleted queues with their force-disconnect flag, in call order.
    #[must_use]
    pub fn deleted(&self) -> Vec<(String, bool)> {
        self.deleted.lock().clone()
    }
}

#[async_trait]
impl MessageQueue for InMemoryQueue {
    async fn publish(&self, message: QueueMessage, routing_key: &str) -> Result<(), QueueError> {
        debug!(routing_key, command = %message.command, "Message published");
        self.published.lock().push(PublishedMessage {
            routing_key: routing_key.to_string(),
            message,
        });
        Ok(())
    }

    async fn delete_queue(&self, name: &str, force_disconnect: bool) -> Result<(), QueueError> {
        if !self.queues.lock().remove(name) {
            debug!(queue = %name, "Queue not declared locally; nothing to delete");
            return Ok(());
        }
        info!(queue = %name, force_disconnect, "Queue deleted");
        self.deleted.lock().push((name.to_string(), force_disconnect));
        Ok(())
    }
}
