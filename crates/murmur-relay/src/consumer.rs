//! Consumer side: bus payload → envelope → plaintext, or a failure value.

use anyhow::Result;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use murmur_crypto::KdfParams;
use secrecy::SecretString;
use tracing::{debug, warn};

use crate::envelope::{Envelope, MalformedEnvelope};

/// A message that opened under the local passphrase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptedMessage {
    pub sender_name: String,
    pub text: String,
    pub display_hint: String,
}

/// A well-formed envelope that did not open.
///
/// Carries only the claimed (unauthenticated) sender name. The cause could
/// be a different passphrase, corruption or tampering, and is not guessed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptionFailure {
    pub sender_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received {
    Message(DecryptedMessage),
    Unreadable(DecryptionFailure),
}

/// Opens envelopes with the local passphrase. Holds no per-message state.
pub struct Consumer {
    passphrase: SecretString,
    kdf: KdfParams,
}

impl Consumer {
    pub fn new(passphrase: SecretString, kdf: KdfParams) -> Self {
        Self { passphrase, kdf }
    }

    /// Process one delivered payload exactly once.
    pub fn on_message(&self, payload: &[u8]) -> Result<Received, MalformedEnvelope> {
        let envelope = Envelope::from_bytes(payload)?;

        let received = match envelope.open(&self.passphrase, &self.kdf) {
            Ok(text) => Received::Message(DecryptedMessage {
                sender_name: envelope.sender_name,
                text,
                display_hint: envelope.display_hint,
            }),
            Err(_) => Received::Unreadable(DecryptionFailure {
                sender_name: envelope.sender_name,
            }),
        };
        Ok(received)
    }

    /// Drain a subscription, handing every decoded result to `on_received`.
    ///
    /// Malformed payloads are logged and dropped. A transport error ends the
    /// loop and is returned unchanged; the end of the stream returns `Ok`.
    pub async fn run<S, F>(&self, mut deliveries: S, mut on_received: F) -> Result<()>
    where
        S: Stream<Item = Result<Bytes>> + Unpin,
        F: FnMut(Received),
    {
        while let Some(item) = deliveries.next().await {
            let payload = item?;
            match self.on_message(&payload) {
                Ok(received) => {
                    if let Received::Unreadable(failure) = &received {
                        debug!(sender = %failure.sender_name, "envelope did not open");
                    }
                    on_received(received);
                }
                Err(e) => {
                    warn!(bytes = payload.len(), error = %e, "dropping malformed envelope");
                }
            }
        }
        debug!("subscription closed");
        Ok(())
    }
}
