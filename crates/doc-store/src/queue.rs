//! Propagation boundary between mutations and the view engine.
//!
//! Delivery is at-least-once and unordered: consumers must tolerate a change
//! arriving twice, and changes for the same document arriving in any order.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};

use crate::{Change, DocStoreError, Result};

/// One delivery attempt of a change.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub change: Change,
    /// 1 for the first delivery, incremented on every redelivery.
    pub attempt: u32,
}

impl Delivery {
    /// Wraps a change for its first delivery.
    pub fn first(change: Change) -> Self {
        Self { change, attempt: 1 }
    }
}

/// Hands persisted changes to an asynchronous delivery mechanism.
#[async_trait]
pub trait ChangeQueue: Send + Sync {
    /// Schedules a change for processing. Fire-and-forget.
    async fn enqueue(&self, change: &Change) -> Result<()>;
}

/// In-process change queue backed by an unbounded channel.
///
/// Clones share the same channel.
#[derive(Clone)]
pub struct InMemoryChangeQueue {
    sender: mpsc::UnboundedSender<Delivery>,
    receiver: Arc<Mutex<mpsc::UnboundedReceiver<Delivery>>>,
}

impl InMemoryChangeQueue {
    /// Creates a new empty queue.
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver: Arc::new(Mutex::new(receiver)),
        }
    }

    /// Waits for the next delivery.
    pub async fn recv(&self) -> Option<Delivery> {
        self.receiver.lock().await.recv().await
    }

    /// Takes every delivery that is ready right now, without waiting.
    pub async fn drain(&self) -> Vec<Delivery> {
        let mut receiver = self.receiver.lock().await;
        let mut deliveries = Vec::new();
        while let Ok(delivery) = receiver.try_recv() {
            deliveries.push(delivery);
        }
        deliveries
    }

    /// Schedules another attempt of a delivery after `delay`.
    pub fn redeliver(&self, delivery: Delivery, delay: Duration) {
        let sender = self.sender.clone();
        let next = Delivery {
            attempt: delivery.attempt + 1,
            change: delivery.change,
        };
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if sender.send(next).is_err() {
                tracing::warn!("change queue closed before redelivery");
            }
        });
    }
}

impl Default for InMemoryChangeQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChangeQueue for InMemoryChangeQueue {
    async fn enqueue(&self, change: &Change) -> Result<()> {
        self.sender
            .send(Delivery::first(change.clone()))
            .map_err(|e| DocStoreError::Queue(e.to_string()))
    }
}
