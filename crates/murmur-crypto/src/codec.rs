//! Per-message AES-128-CBC encryption/decryption
//!
//! A sealed message is three independent values:
//! ```text
//! salt:       16 random bytes, input to the KDF
//! iv:         16 random bytes, CBC initialization vector
//! ciphertext: AES-128-CBC(key=PBKDF2(passphrase, salt), iv, PKCS#7(utf8(text)))
//! ```
//!
//! Salt and IV are regenerated on every call, so no (key, iv) pair is ever
//! reused across messages.

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::RngCore;
use secrecy::SecretString;
use thiserror::Error;

use crate::kdf::{derive_key, KdfParams, MessageKey};
use crate::{IV_SIZE, SALT_SIZE};

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;

/// The only way decryption fails.
///
/// Without an authentication tag the codec cannot distinguish a wrong
/// passphrase from corrupted bytes or tampering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("message could not be decrypted (wrong passphrase, corrupted data, or tampering)")]
pub struct DecryptionError;

/// Output of [`encrypt`]: everything a receiver needs besides the passphrase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedMessage {
    pub iv: [u8; IV_SIZE],
    pub ciphertext: Vec<u8>,
    pub salt: [u8; SALT_SIZE],
}

/// Encrypt `plaintext` under a fresh salt and IV.
///
/// Consumes 32 bytes from the thread-local CSPRNG per call.
pub fn encrypt(plaintext: &str, passphrase: &SecretString, params: &KdfParams) -> SealedMessage {
    let mut rng = rand::thread_rng();
    let mut salt = [0u8; SALT_SIZE];
    rng.fill_bytes(&mut salt);
    let mut iv = [0u8; IV_SIZE];
    rng.fill_bytes(&mut iv);

    let key = derive_key(passphrase, &salt, params);
    let ciphertext = cbc_encrypt(&key, &iv, plaintext.as_bytes());

    tracing::trace!(
        plaintext_len = plaintext.len(),
        ciphertext_len = ciphertext.len(),
        "message sealed"
    );

    SealedMessage {
        iv,
        ciphertext,
        salt,
    }
}

/// Recover the text sealed by [`encrypt`].
///
/// Fails with [`DecryptionError`] when the ciphertext length is not a
/// positive multiple of the block size, the padding is invalid, or the
/// unpadded bytes are not UTF-8.
pub fn decrypt(
    ciphertext: &[u8],
    passphrase: &SecretString,
    iv: &[u8; IV_SIZE],
    salt: &[u8; SALT_SIZE],
    params: &KdfParams,
) -> Result<String, DecryptionError> {
    let key = derive_key(passphrase, salt, params);
    let plaintext = cbc_decrypt(&key, iv, ciphertext)?;
    String::from_utf8(plaintext).map_err(|_| DecryptionError)
}

fn cbc_encrypt(key: &MessageKey, iv: &[u8; IV_SIZE], plaintext: &[u8]) -> Vec<u8> {
    Aes128CbcEnc::new(key.as_bytes().into(), iv.into()).encrypt_padded_vec_mut::<Pkcs7>(plaintext)
}

fn cbc_decrypt(
    key: &MessageKey,
    iv: &[u8; IV_SIZE],
    ciphertext: &[u8],
) -> Result<Vec<u8>, DecryptionError> {
    Aes128CbcDec::new(key.as_bytes().into(), iv.into())
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| DecryptionError)
}
