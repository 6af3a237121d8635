//! Authenticated result codec
//!
//! Encrypts an [`ActionResult`] into a URL-safe envelope string and back.
//! The envelope is what carries a result across the POST → redirect → GET
//! boundary, so it must be unreadable and untamperable by the client:
//! results are serialized to JSON and sealed with AES-256-GCM under a
//! process-wide key.
//!
//! # Envelope layout
//!
//! ```text
//! [24 hex chars: 12-byte nonce][standard base64: ciphertext + tag]
//! ```
//!
//! The first 24 characters are reserved for the nonce; callers must never
//! alter this layout. The nonce is freshly random per encryption; AEAD
//! nonce reuse under the same key breaks confidentiality.
//!
//! # Example
//!
//! ```rust
//! use trellis_actions::codec::{ActionKey, ResultCodec};
//! use trellis_actions::result::ActionResult;
//! use serde_json::json;
//!
//! let codec = ResultCodec::new(&ActionKey::generate());
//! let result = ActionResult::Ok { data: json!({"count": 1}) };
//!
//! let envelope = codec.encode(&result).unwrap();
//! assert_eq!(codec.decode(&envelope).unwrap(), result);
//! ```

use crate::result::ActionResult;
use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rand::RngCore;
use std::sync::Arc;
use thiserror::Error;

/// Nonce length for AES-GCM (96 bits).
const NONCE_LEN: usize = 12;

/// Length of the hex-encoded nonce prefix in an envelope.
const NONCE_HEX_LEN: usize = NONCE_LEN * 2;

/// Errors produced while encoding or decoding an envelope.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The envelope string is too short or not hex/base64 where expected.
    #[error("malformed envelope: {0}")]
    Malformed(String),

    /// Authentication failed: wrong key, tampered ciphertext, or corrupted nonce.
    #[error("envelope failed integrity verification")]
    Integrity,

    /// The decrypted bytes were not valid JSON for an action result.
    #[error("decrypted payload is not a valid action result: {0}")]
    Parse(#[from] serde_json::Error),

    /// Encryption itself failed.
    #[error("failed to encrypt action result")]
    Encrypt,

    /// The configured key is not a valid 32-byte AES-256 key.
    #[error("invalid action key: {0}")]
    InvalidKey(String),
}

/// A 256-bit symmetric key for sealing action results.
///
/// The key is process-wide: initialized once at startup and shared
/// read-only by every in-flight request. Provide a stable key via
/// configuration when results must survive restarts or be readable
/// across multiple instances; otherwise [`ActionKey::generate`] makes
/// a fresh one per process.
#[derive(Clone)]
pub struct ActionKey([u8; 32]);

impl ActionKey {
    /// Generate a fresh random key from the OS RNG.
    #[must_use]
    pub fn generate() -> Self {
        let mut key = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut key);
        Self(key)
    }

    /// Parse a key from 64 hex characters.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidKey`] if the string is not valid hex
    /// or does not decode to exactly 32 bytes.
    pub fn from_hex(hex_key: &str) -> Result<Self, CodecError> {
        let bytes = hex::decode(hex_key.trim())
            .map_err(|err| CodecError::InvalidKey(err.to_string()))?;
        let key: [u8; 32] = bytes.try_into().map_err(|bytes: Vec<u8>| {
            CodecError::InvalidKey(format!(
                "expected 32 bytes (64 hex chars), got {} bytes",
                bytes.len()
            ))
        })?;
        Ok(Self(key))
    }

    /// Hex representation, suitable for storing in configuration.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl std::fmt::Debug for ActionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material.
        f.write_str("ActionKey(..)")
    }
}

/// Encrypts and decrypts action results.
///
/// Cheap to clone; the cipher is shared behind an [`Arc`]. Every
/// [`encode`](Self::encode) call generates a fresh nonce, so sharing the
/// cipher across requests carries no nonce-reuse risk.
#[derive(Clone)]
pub struct ResultCodec {
    cipher: Arc<Aes256Gcm>,
}

impl ResultCodec {
    /// Build a codec from a key.
    #[must_use]
    pub fn new(key: &ActionKey) -> Self {
        Self {
            cipher: Arc::new(Aes256Gcm::new(&key.0.into())),
        }
    }

    /// Encrypt a result into an envelope string.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Parse`] if the result fails to serialize and
    /// [`CodecError::Encrypt`] if the cipher rejects the plaintext.
    pub fn encode(&self, result: &ActionResult) -> Result<String, CodecError> {
        let plaintext = serde_json::to_vec(result)?;

        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_slice())
            .map_err(|_| CodecError::Encrypt)?;

        let mut envelope = hex::encode(nonce);
        envelope.push_str(&BASE64.encode(ciphertext));
        Ok(envelope)
    }

    /// Decrypt an envelope string back into a result.
    ///
    /// # Errors
    ///
    /// - [`CodecError::Malformed`] if the string is truncated or the
    ///   nonce/ciphertext portions fail hex/base64 decoding.
    /// - [`CodecError::Integrity`] if the authentication tag check fails
    ///   (wrong key or tampered data).
    /// - [`CodecError::Parse`] if the decrypted bytes are not a valid
    ///   JSON action result.
    pub fn decode(&self, envelope: &str) -> Result<ActionResult, CodecError> {
        // The boundary check also rejects multibyte text straddling the
        // nonce split; the input is client-supplied.
        if envelope.len() < NONCE_HEX_LEN || !envelope.is_char_boundary(NONCE_HEX_LEN) {
            return Err(CodecError::Malformed(
                "envelope shorter than nonce prefix".to_string(),
            ));
        }
        let (nonce_hex, payload) = envelope.split_at(NONCE_HEX_LEN);

        let nonce_bytes = hex::decode(nonce_hex)
            .map_err(|err| CodecError::Malformed(format!("bad nonce hex: {err}")))?;
        let nonce = Nonce::clone_from_slice(&nonce_bytes);

        let ciphertext = BASE64
            .decode(payload)
            .map_err(|err| CodecError::Malformed(format!("bad ciphertext base64: {err}")))?;

        let plaintext = self
            .cipher
            .decrypt(&nonce, ciphertext.as_slice())
            .map_err(|_| CodecError::Integrity)?;

        Ok(serde_json::from_slice(&plaintext)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::ActionFailure;
    use proptest::prelude::*;
    use serde_json::{json, Value};
    use std::collections::HashSet;

    fn codec() -> ResultCodec {
        ResultCodec::new(&ActionKey::generate())
    }

    #[test]
    fn test_round_trip_ok() {
        let codec = codec();
        let result = ActionResult::Ok {
            data: json!({"count": 41, "tags": ["a", "b"], "nested": {"x": null}}),
        };

        let envelope = codec.encode(&result).unwrap();
        assert_eq!(codec.decode(&envelope).unwrap(), result);
    }

    #[test]
    fn test_round_trip_error() {
        let codec = codec();
        let result = ActionResult::from(ActionFailure::bad_request("missing field"));

        let envelope = codec.encode(&result).unwrap();
        assert_eq!(codec.decode(&envelope).unwrap(), result);
    }

    #[test]
    fn test_nonce_prefix_is_hex() {
        let codec = codec();
        let envelope = codec.encode(&ActionResult::Ok { data: json!(1) }).unwrap();

        assert!(envelope.len() > 24);
        assert!(envelope[..24].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_tampered_ciphertext_fails_integrity() {
        let codec = codec();
        let envelope = codec
            .encode(&ActionResult::Ok { data: json!("secret") })
            .unwrap();

        // Re-encode the ciphertext with one bit flipped; every position
        // must fail authentication, never silently decode.
        let ciphertext = BASE64.decode(&envelope[24..]).unwrap();
        for byte_index in 0..ciphertext.len() {
            let mut tampered = ciphertext.clone();
            tampered[byte_index] ^= 0x01;
            let tampered_envelope = format!("{}{}", &envelope[..24], BASE64.encode(&tampered));

            assert!(
                matches!(codec.decode(&tampered_envelope), Err(CodecError::Integrity)),
                "bit flip at byte {byte_index} was not rejected"
            );
        }
    }

    #[test]
    fn test_corrupted_nonce_fails_integrity() {
        let codec = codec();
        let envelope = codec.encode(&ActionResult::Ok { data: json!(1) }).unwrap();

        let mut chars: Vec<char> = envelope.chars().collect();
        chars[0] = if chars[0] == '0' { '1' } else { '0' };
        let corrupted: String = chars.into_iter().collect();

        assert!(matches!(codec.decode(&corrupted), Err(CodecError::Integrity)));
    }

    #[test]
    fn test_wrong_key_fails_integrity() {
        let encoder = codec();
        let decoder = codec();
        let envelope = encoder.encode(&ActionResult::Ok { data: json!(1) }).unwrap();

        assert!(matches!(decoder.decode(&envelope), Err(CodecError::Integrity)));
    }

    #[test]
    fn test_truncated_envelope_is_malformed() {
        let codec = codec();
        assert!(matches!(codec.decode(""), Err(CodecError::Malformed(_))));
        assert!(matches!(codec.decode("abc123"), Err(CodecError::Malformed(_))));
        assert!(matches!(
            codec.decode("zz0102030405060708090a0b!!not-base64!!"),
            Err(CodecError::Malformed(_))
        ));
        // Multibyte text across the nonce boundary must be rejected, not panic.
        assert!(matches!(
            codec.decode("aééééééééééééééééé"),
            Err(CodecError::Malformed(_))
        ));
    }

    #[test]
    fn test_nonces_are_unique() {
        let codec = codec();
        let result = ActionResult::Ok { data: json!("same input") };

        let nonces: HashSet<String> = (0..10_000)
            .map(|_| codec.encode(&result).unwrap()[..24].to_string())
            .collect();

        assert_eq!(nonces.len(), 10_000);
    }

    #[test]
    fn test_key_hex_round_trip() {
        let key = ActionKey::generate();
        let restored = ActionKey::from_hex(&key.to_hex()).unwrap();

        let envelope = ResultCodec::new(&key)
            .encode(&ActionResult::Ok { data: json!(1) })
            .unwrap();
        assert!(ResultCodec::new(&restored).decode(&envelope).is_ok());
    }

    #[test]
    fn test_invalid_key_hex_rejected() {
        assert!(matches!(
            ActionKey::from_hex("not hex"),
            Err(CodecError::InvalidKey(_))
        ));
        assert!(matches!(
            ActionKey::from_hex("abcd"),
            Err(CodecError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_debug_does_not_leak_key() {
        let key = ActionKey::generate();
        assert_eq!(format!("{key:?}"), "ActionKey(..)");
    }

    fn json_value() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(|n| json!(n)),
            "[a-zA-Z0-9 _.-]{0,24}".prop_map(Value::String),
        ];
        leaf.prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                prop::collection::btree_map("[a-z]{1,8}", inner, 0..4)
                    .prop_map(|map| Value::Object(map.into_iter().collect())),
            ]
        })
    }

    proptest! {
        #[test]
        fn prop_round_trip_any_json_payload(data in json_value()) {
            let codec = codec();
            let result = ActionResult::Ok { data };

            let envelope = codec.encode(&result).unwrap();
            prop_assert_eq!(codec.decode(&envelope).unwrap(), result);
        }
    }
}
