//! NATS transport for murmur rooms.
//!
//! Live delivery uses core NATS subjects, which fan out to every connected
//! subscriber. When persistence is requested, a JetStream stream with Limits
//! retention also captures the room subject and publishes wait for the
//! server ack, so the bus durably accepts each message whether or not anyone
//! is listening. Servers without JetStream still get plain fanout publishing.
//!
//! Requires feature `nats` (async-nats optional dep).

#[cfg(feature = "nats")]
pub use inner::*;

#[cfg(feature = "nats")]
mod inner {
    use anyhow::Result;
    use async_nats::jetstream::{self, stream};
    use bytes::Bytes;
    use futures::StreamExt;
    use std::fmt::Display;
    use std::time::Duration;
    use tracing::{debug, info, warn};

    use crate::bus::{Bus, Deliveries};

    /// One NATS connection. Each murmur loop opens its own.
    pub struct NatsBus {
        client: async_nats::Client,
        js: Option<jetstream::Context>,
    }

    impl NatsBus {
        /// Connect to NATS with plain (non-persistent) publishing.
        pub async fn connect(url: &str) -> Result<Self> {
            let client = async_nats::connect(url)
                .await
                .map_err(|e| anyhow::anyhow!("connecting to NATS at {url}: {e}"))?;
            info!("NATS: connected to {url}");
            Ok(NatsBus { client, js: None })
        }

        /// Ensure a JetStream stream captures `topic` and route publishes
        /// through it (idempotent via get_or_create).
        ///
        /// When the server has JetStream disabled or the stream cannot be
        /// created, logs a warning and keeps core NATS publishing.
        pub async fn with_persistence(
            mut self,
            stream_name: &str,
            topic: &str,
            max_age: Duration,
        ) -> Self {
            let js = jetstream::new(self.client.clone());
            let ensured = js
                .get_or_create_stream(stream::Config {
                    name: stream_name.to_string(),
                    subjects: vec![topic.to_string()],
                    max_age,
                    retention: stream::RetentionPolicy::Limits,
                    storage: stream::StorageType::File,
                    ..Default::default()
                })
                .await
                .map(|_| ());

            self.js = persistence_or_fallback(js, ensured, stream_name, topic);
            self
        }
    }

    /// Keep the JetStream context only if its stream was ensured.
    fn persistence_or_fallback<C, E: Display>(
        js: C,
        ensured: std::result::Result<(), E>,
        stream_name: &str,
        topic: &str,
    ) -> Option<C> {
        match ensured {
            Ok(()) => {
                info!(stream = stream_name, topic, "NATS: persistence stream verified");
                Some(js)
            }
            Err(e) => {
                warn!(
                    stream = stream_name,
                    topic,
                    error = %e,
                    "NATS: JetStream unavailable, publishing without persistence"
                );
                None
            }
        }
    }

    impl Bus for NatsBus {
        async fn publish(&self, topic: &str, payload: Bytes) -> Result<()> {
            let len = payload.len();
            match &self.js {
                // Double-awaits: first sends the publish, second waits for server ack.
                Some(js) => {
                    js.publish(topic.to_string(), payload)
                        .await
                        .map_err(|e| anyhow::anyhow!("publishing to {topic}: {e}"))?
                        .await
                        .map_err(|e| anyhow::anyhow!("awaiting NATS publish ack: {e}"))?;
                }
                None => {
                    self.client
                        .publish(topic.to_string(), payload)
                        .await
                        .map_err(|e| anyhow::anyhow!("publishing to {topic}: {e}"))?;
                    self.client
                        .flush()
                        .await
                        .map_err(|e| anyhow::anyhow!("flushing NATS connection: {e}"))?;
                }
            }
            debug!(topic, bytes = len, "envelope published");
            Ok(())
        }

        async fn subscribe(&self, topic: &str) -> Result<Deliveries> {
            let subscriber = self
                .client
                .subscribe(topic.to_string())
                .await
                .map_err(|e| anyhow::anyhow!("subscribing to {topic}: {e}"))?;
            info!(topic, "NATS: subscribed");

            Ok(subscriber.map(|msg| Ok(msg.payload)).boxed())
        }
    }

}
