//! murmur-relay: the encrypted envelope protocol on top of a fanout bus
//!
//! ```text
//! text ─► Publisher ─► Envelope JSON ─► Bus ─► Envelope JSON ─► Consumer ─► Received
//! ```
//!
//! Publisher and Consumer each own their bus connection. The Consumer pulls
//! raw payloads from a `Stream`, so it can be driven without a live bus.

pub mod bus;
pub mod consumer;
pub mod envelope;
pub mod nats;
pub mod publisher;

pub use bus::{Bus, Deliveries, MemoryBus};
pub use consumer::{Consumer, DecryptedMessage, DecryptionFailure, Received};
pub use envelope::{Envelope, MalformedEnvelope};
pub use publisher::{PublishError, Publisher};

#[cfg(feature = "nats")]
pub use nats::NatsBus;
