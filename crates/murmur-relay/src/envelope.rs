//! Envelope model and JSON wire format.
//!
//! ```text
//! {
//!   "name": "<sender name>",
//!   "iv": "<32 hex chars>",
//!   "salt": "<32 hex chars>",
//!   "encrypted_message": "<hex, even length>",
//!   "cor": "<display hint>"
//! }
//! ```
//!
//! Only the message body is confidential. Name, hint, salt and IV travel in
//! the clear and are not integrity-protected.

use bytes::Bytes;
use murmur_crypto::{decrypt, DecryptionError, KdfParams, SealedMessage, IV_SIZE, SALT_SIZE};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Received bytes that do not map onto an [`Envelope`].
#[derive(Debug, Error)]
#[error("malformed envelope: {0}")]
pub struct MalformedEnvelope(#[from] serde_json::Error);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "name")]
    pub sender_name: String,
    #[serde(with = "hex")]
    pub iv: [u8; IV_SIZE],
    #[serde(with = "hex")]
    pub salt: [u8; SALT_SIZE],
    #[serde(rename = "encrypted_message", with = "hex")]
    pub ciphertext: Vec<u8>,
    #[serde(rename = "cor")]
    pub display_hint: String,
}

impl Envelope {
    pub fn seal(
        sender_name: impl Into<String>,
        display_hint: impl Into<String>,
        sealed: SealedMessage,
    ) -> Self {
        Self {
            sender_name: sender_name.into(),
            iv: sealed.iv,
            salt: sealed.salt,
            ciphertext: sealed.ciphertext,
            display_hint: display_hint.into(),
        }
    }

    /// Attempt to recover the message body with the local passphrase.
    pub fn open(
        &self,
        passphrase: &SecretString,
        params: &KdfParams,
    ) -> Result<String, DecryptionError> {
        decrypt(&self.ciphertext, passphrase, &self.iv, &self.salt, params)
    }

    pub fn to_bytes(&self) -> Result<Bytes, serde_json::Error> {
        serde_json::to_vec(self).map(Bytes::from)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, MalformedEnvelope> {
        Ok(serde_json::from_slice(data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample() -> Envelope {
        Envelope {
            sender_name: "alice".into(),
            iv: [0x11; IV_SIZE],
            salt: [0xAB; SALT_SIZE],
            ciphertext: vec![0xDE, 0xAD, 0xBE, 0xEF],
            display_hint: "green".into(),
        }
    }

    #[test]
    fn test_wire_layout() {
        let json = String::from_utf8(sample().to_bytes().unwrap().to_vec()).unwrap();
        assert_eq!(
            json,
            concat!(
                r#"{"name":"alice","#,
                r#""iv":"11111111111111111111111111111111","#,
                r#""salt":"abababababababababababababababab","#,
                r#""encrypted_message":"deadbeef","#,
                r#""cor":"green"}"#
            )
        );
    }

    #[test]
    fn test_serialize_is_deterministic() {
        let envelope = sample();
        assert_eq!(envelope.to_bytes().unwrap(), envelope.to_bytes().unwrap());
    }

    #[test]
    fn test_roundtrip() {
        let envelope = sample();
        let back = Envelope::from_bytes(&envelope.to_bytes().unwrap()).unwrap();
        assert_eq!(back, envelope);
    }

    #[test]
    fn test_uppercase_hex_accepted() {
        let json = br#"{"name":"bob","iv":"0102030405060708090A0B0C0D0E0F10","salt":"FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF","encrypted_message":"CAFE","cor":"red"}"#;
        let envelope = Envelope::from_bytes(json).unwrap();
        assert_eq!(envelope.iv[9], 0x0A);
        assert_eq!(envelope.salt, [0xFF; SALT_SIZE]);
        assert_eq!(envelope.ciphertext, vec![0xCA, 0xFE]);
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let json = br#"{"name":"bob","iv":"00000000000000000000000000000000","salt":"00000000000000000000000000000000","encrypted_message":"00","cor":"red","extra":1}"#;
        assert!(Envelope::from_bytes(json).is_ok());
    }

    #[test]
    fn test_odd_length_ciphertext_rejected() {
        let json = br#"{"name":"bob","iv":"00000000000000000000000000000000","salt":"00000000000000000000000000000000","encrypted_message":"abc","cor":"red"}"#;
        assert!(Envelope::from_bytes(json).is_err());
    }

    #[test]
    fn test_non_hex_rejected() {
        let json = br#"{"name":"bob","iv":"zz000000000000000000000000000000","salt":"00000000000000000000000000000000","encrypted_message":"00","cor":"red"}"#;
        assert!(Envelope::from_bytes(json).is_err());
    }

    #[test]
    fn test_wrong_iv_length_rejected() {
        let json = br#"{"name":"bob","iv":"0000","salt":"00000000000000000000000000000000","encrypted_message":"00","cor":"red"}"#;
        assert!(Envelope::from_bytes(json).is_err());
    }

    #[test]
    fn test_missing_field_rejected() {
        let json = br#"{"name":"bob","iv":"00000000000000000000000000000000","salt":"00000000000000000000000000000000","cor":"red"}"#;
        let err = Envelope::from_bytes(json).unwrap_err();
        assert!(err.to_string().contains("encrypted_message"));
    }

    #[test]
    fn test_truncated_rejected() {
        let bytes = sample().to_bytes().unwrap();
        assert!(Envelope::from_bytes(&bytes[..bytes.len() / 2]).is_err());
        assert!(Envelope::from_bytes(b"").is_err());
        assert!(Envelope::from_bytes(b"\xff\xfe").is_err());
    }

    #[test]
    fn test_seal_then_open() {
        let params = KdfParams::default();
        let pass = SecretString::from("correct-horse");
        let sealed = murmur_crypto::encrypt("hello", &pass, &params);

        let envelope = Envelope::seal("alice", "cyan", sealed);
        assert_eq!(envelope.sender_name, "alice");
        assert_eq!(envelope.display_hint, "cyan");
        assert_eq!(envelope.open(&pass, &params).unwrap(), "hello");
    }

    proptest! {
        #[test]
        fn envelope_roundtrip(
            name in ".{0,40}",
            hint in ".{0,16}",
            iv in any::<[u8; IV_SIZE]>(),
            salt in any::<[u8; SALT_SIZE]>(),
            ciphertext in proptest::collection::vec(any::<u8>(), 0..=160),
        ) {
            let envelope = Envelope {
                sender_name: name,
                iv,
                salt,
                ciphertext,
                display_hint: hint,
            };
            let back = Envelope::from_bytes(&envelope.to_bytes().unwrap()).unwrap();
            prop_assert_eq!(back, envelope);
        }
    }
}
