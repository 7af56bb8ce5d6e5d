//! Key derivation: PBKDF2-HMAC-SHA1 passphrase + salt → message key

use pbkdf2::pbkdf2_hmac;
use secrecy::{ExposeSecret, SecretString};
use sha1::Sha1;
use thiserror::Error;
use zeroize::Zeroize;

use crate::{DEFAULT_KDF_ITERATIONS, KEY_SIZE, SALT_SIZE};

/// A 128-bit AES key derived for exactly one message.
///
/// Zeroized on drop to prevent secrets lingering in memory.
pub struct MessageKey {
    bytes: [u8; KEY_SIZE],
}

impl MessageKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl Drop for MessageKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for MessageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("PBKDF2 iteration count must be at least 1")]
pub struct InvalidKdfParams;

/// PBKDF2 work factor.
///
/// Every participant in a room must use the same value; it is not carried
/// on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    iterations: u32,
}

impl KdfParams {
    pub fn new(iterations: u32) -> Result<Self, InvalidKdfParams> {
        if iterations == 0 {
            return Err(InvalidKdfParams);
        }
        Ok(Self { iterations })
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_KDF_ITERATIONS,
        }
    }
}

/// Derive the 128-bit key for one message from the room passphrase and the
/// message's salt.
///
/// An empty passphrase is accepted and yields a valid (weak) key; passphrase
/// policy belongs to the caller.
pub fn derive_key(
    passphrase: &SecretString,
    salt: &[u8; SALT_SIZE],
    params: &KdfParams,
) -> MessageKey {
    let mut key = [0u8; KEY_SIZE];
    pbkdf2_hmac::<Sha1>(
        passphrase.expose_secret().as_bytes(),
        salt,
        params.iterations,
        &mut key,
    );
    let derived = MessageKey::from_bytes(key);
    key.zeroize();
    derived
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kdf_deterministic() {
        let passphrase = SecretString::from("correct-horse");
        let salt = [1u8; SALT_SIZE];
        let params = KdfParams::default();

        let key1 = derive_key(&passphrase, &salt, &params);
        let key2 = derive_key(&passphrase, &salt, &params);

        assert_eq!(
            key1.as_bytes(),
            key2.as_bytes(),
            "KDF must be deterministic"
        );
    }

    #[test]
    fn test_kdf_different_salts() {
        let passphrase = SecretString::from("same-passphrase");
        let params = KdfParams::default();

        let key1 = derive_key(&passphrase, &[1u8; SALT_SIZE], &params);
        let key2 = derive_key(&passphrase, &[2u8; SALT_SIZE], &params);

        assert_ne!(
            key1.as_bytes(),
            key2.as_bytes(),
            "different salts must produce different keys"
        );
    }

    #[test]
    fn test_kdf_different_passphrases() {
        let salt = [7u8; SALT_SIZE];
        let params = KdfParams::default();

        let key1 = derive_key(&SecretString::from("passphrase-a"), &salt, &params);
        let key2 = derive_key(&SecretString::from("passphrase-b"), &salt, &params);

        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_kdf_iterations_change_key() {
        let passphrase = SecretString::from("correct-horse");
        let salt = [3u8; SALT_SIZE];

        let fast = derive_key(&passphrase, &salt, &KdfParams::new(1).unwrap());
        let slow = derive_key(&passphrase, &salt, &KdfParams::new(2000).unwrap());

        assert_ne!(fast.as_bytes(), slow.as_bytes());
    }

    #[test]
    fn test_empty_passphrase_is_accepted() {
        let key = derive_key(&SecretString::from(""), &[0u8; SALT_SIZE], &KdfParams::default());
        assert_ne!(key.as_bytes(), &[0u8; KEY_SIZE]);
    }

    #[test]
    fn test_zero_iterations_rejected() {
        assert_eq!(KdfParams::new(0), Err(InvalidKdfParams));
        assert_eq!(KdfParams::new(1).unwrap().iterations(), 1);
        assert_eq!(KdfParams::default().iterations(), DEFAULT_KDF_ITERATIONS);
    }

    #[test]
    fn test_debug_redacts_key() {
        let key = MessageKey::from_bytes([0xAB; KEY_SIZE]);
        let rendered = format!("{key:?}");
        assert!(rendered.contains("REDACTED"));
        assert!(!rendered.contains("171"));
    }
}
