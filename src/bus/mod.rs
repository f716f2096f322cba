//! Messaging bus seam
//!
//! The ingestion pipeline consumes raw payloads from a bounded channel
//! rather than from a broker library's callback thread; a [`MessageBus`]
//! implementation bridges the two. [`InProcessBus`] is the channel-backed
//! implementation used by tests and standalone runs, and the place where
//! a broker adapter (MQTT, NATS, ...) plugs in. Transport concerns such
//! as TLS and QoS live entirely inside the adapter.
//!
//! Delivery is at-least-once and unordered across messages; subscribers
//! must tolerate both.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{mpsc, RwLock};

/// Errors from bus subscribe/publish operations
#[derive(Debug, Error)]
pub enum BusError {
    /// Could not establish the subscription; fatal at startup
    #[error("subscribe to topic '{topic}' failed: {reason}")]
    Subscribe { topic: String, reason: String },

    /// Publish failed; callers treat this as non-fatal
    #[error("publish to topic '{topic}' failed: {reason}")]
    Publish { topic: String, reason: String },
}

/// Result type alias for bus operations
pub type BusResult<T> = Result<T, BusError>;

/// Subscribe-with-channel and publish primitives for one message bus
///
/// `subscribe` hands back the receiving end of a bounded channel that
/// the bus implementation pushes raw payloads into; the caller owns the
/// consuming task. `publish` re-broadcasts a raw payload outward.
#[async_trait]
pub trait MessageBus: Send + Sync {
    async fn subscribe(&self, topic: &str) -> BusResult<mpsc::Receiver<Vec<u8>>>;

    async fn publish(&self, topic: &str, payload: Vec<u8>) -> BusResult<()>;
}

/// Channel-backed bus for tests and single-process deployments
pub struct InProcessBus {
    topics: RwLock<HashMap<String, Vec<mpsc::Sender<Vec<u8>>>>>,
    capacity: usize,
}

impl InProcessBus {
    /// Create a bus whose subscription channels hold `capacity` payloads
    pub fn new(capacity: usize) -> Self {
        Self {
            topics: RwLock::new(HashMap::new()),
            capacity,
        }
    }
}

#[async_trait]
impl MessageBus for InProcessBus {
    async fn subscribe(&self, topic: &str) -> BusResult<mpsc::Receiver<Vec<u8>>> {
        let (tx, rx) = mpsc::channel(self.capacity);
        self.topics
            .write()
            .await
            .entry(topic.to_string())
            .or_default()
            .push(tx);
        tracing::debug!(topic = %topic, "bus subscription created");
        Ok(rx)
    }

    async fn publish(&self, topic: &str, payload: Vec<u8>) -> BusResult<()> {
        let mut topics = self.topics.write().await;
        let Some(senders) = topics.get_mut(topic) else {
            // No subscribers is not an error for a pub/sub bus.
            return Ok(());
        };

        senders.retain(|tx| match tx.try_send(payload.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(topic = %topic, "subscriber channel full, payload dropped");
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_subscriber() {
        let bus = InProcessBus::new(8);
        let mut rx = bus.subscribe("vibration").await.unwrap();

        bus.publish("vibration", b"payload".to_vec()).await.unwrap();
        assert_eq!(rx.recv().await.unwrap(), b"payload");
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_ok() {
        let bus = InProcessBus::new(8);
        assert!(bus.publish("vibration", b"payload".to_vec()).await.is_ok());
    }

    #[tokio::test]
    async fn test_topics_are_isolated() {
        let bus = InProcessBus::new(8);
        let mut vibration = bus.subscribe("vibration").await.unwrap();
        let mut other = bus.subscribe("other").await.unwrap();

        bus.publish("vibration", b"v".to_vec()).await.unwrap();

        assert_eq!(vibration.recv().await.unwrap(), b"v");
        assert!(other.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_dropped_subscriber_is_pruned() {
        let bus = InProcessBus::new(8);
        let rx = bus.subscribe("vibration").await.unwrap();
        drop(rx);

        bus.publish("vibration", b"a".to_vec()).await.unwrap();
        assert!(bus.topics.read().await.get("vibration").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_full_channel_drops_payload_but_keeps_subscriber() {
        let bus = InProcessBus::new(1);
        let mut rx = bus.subscribe("vibration").await.unwrap();

        bus.publish("vibration", b"first".to_vec()).await.unwrap();
        bus.publish("vibration", b"second".to_vec()).await.unwrap();

        assert_eq!(rx.recv().await.unwrap(), b"first");
        assert!(rx.try_recv().is_err());

        // Still subscribed after the drop.
        bus.publish("vibration", b"third".to_vec()).await.unwrap();
        assert_eq!(rx.recv().await.unwrap(), b"third");
    }
}
