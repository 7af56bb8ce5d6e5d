//! murmur-crypto: passphrase-keyed message codec for murmur
//!
//! Every message is sealed under its own key:
//!
//! ```text
//! salt (16 bytes, random per message)
//!   └── Message Key (128-bit, PBKDF2-HMAC-SHA1(passphrase, salt))
//!         └── AES-128-CBC (key=message_key, iv=random_128bit), PKCS#7 padding
//! ```
//!
//! There is no authentication tag. A wrong passphrase, a corrupted
//! ciphertext and deliberate tampering all surface as the same
//! [`DecryptionError`], or in rare cases as garbage text.

pub mod codec;
pub mod kdf;

pub use codec::{decrypt, encrypt, DecryptionError, SealedMessage};
pub use kdf::{derive_key, InvalidKdfParams, KdfParams, MessageKey};

/// Size of a derived message key in bytes (AES-128)
pub const KEY_SIZE: usize = 16;

/// Size of the per-message KDF salt
pub const SALT_SIZE: usize = 16;

/// Size of the CBC initialization vector
pub const IV_SIZE: usize = 16;

/// AES block size; ciphertexts are always a positive multiple of this
pub const BLOCK_SIZE: usize = 16;

/// PBKDF2 iteration count used when nothing else is configured
pub const DEFAULT_KDF_ITERATIONS: u32 = 1000;
