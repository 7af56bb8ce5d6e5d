//! Producer side: local text → sealed envelope → bus.

use murmur_core::MAX_MESSAGE_CHARS;
use murmur_crypto::{encrypt, KdfParams};
use secrecy::SecretString;
use thiserror::Error;
use tracing::debug;

use crate::bus::Bus;
use crate::envelope::Envelope;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("message is {chars} characters, the limit is {limit}")]
    MessageTooLong { chars: usize, limit: usize },

    #[error("serializing envelope: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    Bus(anyhow::Error),
}

/// Seals and publishes messages for one participant.
///
/// Owns its bus connection; nothing is shared with the consumer side except
/// a copy of the passphrase.
pub struct Publisher<B> {
    bus: B,
    topic: String,
    passphrase: SecretString,
    kdf: KdfParams,
}

impl<B: Bus> Publisher<B> {
    pub fn new(bus: B, topic: impl Into<String>, passphrase: SecretString, kdf: KdfParams) -> Self {
        Self {
            bus,
            topic: topic.into(),
            passphrase,
            kdf,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Encrypt `message` and publish it once. No truncation and no retry:
    /// overlong input is rejected and bus failures are returned as-is.
    pub async fn publish(
        &self,
        sender_name: &str,
        message: &str,
        display_hint: &str,
    ) -> Result<(), PublishError> {
        let chars = message.chars().count();
        if chars > MAX_MESSAGE_CHARS {
            return Err(PublishError::MessageTooLong {
                chars,
                limit: MAX_MESSAGE_CHARS,
            });
        }

        let sealed = encrypt(message, &self.passphrase, &self.kdf);
        let envelope = Envelope::seal(sender_name, display_hint, sealed);
        let payload = envelope.to_bytes()?;
        let len = payload.len();

        self.bus
            .publish(&self.topic, payload)
            .await
            .map_err(PublishError::Bus)?;

        debug!(topic = %self.topic, sender = sender_name, bytes = len, "message published");
        Ok(())
    }
}
