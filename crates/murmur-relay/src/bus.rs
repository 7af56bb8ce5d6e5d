//! Fanout bus abstraction.
//!
//! A bus delivers every payload published on a topic to every subscriber
//! currently bound to that topic. Connection-level failures are plain
//! `anyhow` errors: they belong to the transport, not to the envelope
//! protocol, and are passed through untouched.

use anyhow::Result;
use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::broadcast;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tracing::{debug, warn};

/// Raw payloads delivered to one subscription, in bus delivery order.
pub type Deliveries = BoxStream<'static, Result<Bytes>>;

pub trait Bus: Send + Sync {
    /// Publish one payload to every subscriber bound to `topic`.
    fn publish(&self, topic: &str, payload: Bytes) -> impl Future<Output = Result<()>> + Send;

    /// Bind a new subscription to `topic`.
    fn subscribe(&self, topic: &str) -> impl Future<Output = Result<Deliveries>> + Send;
}

/// Per-topic buffer for [`MemoryBus`]; slow subscribers beyond this lag and skip.
const MEMORY_BUS_CAPACITY: usize = 1024;

/// In-process fanout bus backed by tokio broadcast channels.
///
/// Clones share the same topics, so each participant can hold its own handle
/// the way it would hold its own network connection.
#[derive(Clone, Default)]
pub struct MemoryBus {
    topics: Arc<Mutex<HashMap<String, broadcast::Sender<Bytes>>>>,
}

impl MemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn sender(&self, topic: &str) -> broadcast::Sender<Bytes> {
        let mut topics = self.topics.lock().unwrap_or_else(PoisonError::into_inner);
        topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(MEMORY_BUS_CAPACITY).0)
            .clone()
    }
}

impl Bus for MemoryBus {
    async fn publish(&self, topic: &str, payload: Bytes) -> Result<()> {
        // send only fails when no subscriber is bound
        let delivered = self.sender(topic).send(payload).unwrap_or(0);
        debug!(topic, delivered, "memory bus publish");
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<Deliveries> {
        let topic_name = topic.to_string();
        let rx = self.sender(topic).subscribe();
        let stream = BroadcastStream::new(rx).filter_map(move |item| {
            let topic = topic_name.clone();
            async move {
                match item {
                    Ok(payload) => Some(Ok(payload)),
                    Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                        warn!(topic = %topic, skipped, "subscriber lagged; messages skipped");
                        None
                    }
                }
            }
        });
        Ok(stream.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fanout_to_every_subscriber() {
        let bus = MemoryBus::new();
        let mut a = bus.subscribe("room").await.unwrap();
        let mut b = bus.clone().subscribe("room").await.unwrap();

        bus.publish("room", Bytes::from_static(b"one")).await.unwrap();

        assert_eq!(a.next().await.unwrap().unwrap(), Bytes::from_static(b"one"));
        assert_eq!(b.next().await.unwrap().unwrap(), Bytes::from_static(b"one"));
    }

    #[tokio::test]
    async fn test_topics_are_isolated() {
        let bus = MemoryBus::new();
        let mut other = bus.subscribe("other").await.unwrap();
        let mut room = bus.subscribe("room").await.unwrap();

        bus.publish("room", Bytes::from_static(b"x")).await.unwrap();
        bus.publish("other", Bytes::from_static(b"y")).await.unwrap();

        assert_eq!(room.next().await.unwrap().unwrap(), Bytes::from_static(b"x"));
        assert_eq!(other.next().await.unwrap().unwrap(), Bytes::from_static(b"y"));
    }

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let bus = MemoryBus::new();
        bus.publish("empty", Bytes::from_static(b"lost"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_late_subscriber_misses_earlier_messages() {
        let bus = MemoryBus::new();
        let mut early = bus.subscribe("room").await.unwrap();
        bus.publish("room", Bytes::from_static(b"first")).await.unwrap();

        let mut late = bus.subscribe("room").await.unwrap();
        bus.publish("room", Bytes::from_static(b"second")).await.unwrap();

        assert_eq!(early.next().await.unwrap().unwrap(), Bytes::from_static(b"first"));
        assert_eq!(late.next().await.unwrap().unwrap(), Bytes::from_static(b"second"));
    }
}
