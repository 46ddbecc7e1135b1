//! AES-256-GCM encryption and decryption of individual string fields.
//!
//! Every call to [`encrypt_field`] draws a fresh 96-bit nonce from the OS
//! CSPRNG. GCM nonce reuse under one key breaks both confidentiality and
//! authentication, so nonces are never derived or cached.
//!
//! # Stored shape
//!
//! ```text
//! { "alg": "AES-256-GCM", "iv": <b64 nonce>, "tag": <b64 tag>, "ct": <b64 ciphertext> }
//! ```
//!
//! Binary parts use the standard base64 alphabet with padding. The `ct`
//! member doubles as the marker that identifies an encrypted value in stored
//! records written before values were tagged explicitly.

use aes_gcm::{
    aead::{rand_core::RngCore, AeadInPlace, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce, Tag,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{DecryptFailure, EncryptError};
use crate::keys::SecretKey;

/// Byte length of an AES-GCM nonce (12 bytes = 96 bits).
pub const NONCE_LEN: usize = 12;

/// Byte length of an AES-GCM authentication tag.
pub const TAG_LEN: usize = 16;

/// Algorithm identifier written into every stored field.
pub const ALGORITHM: &str = "AES-256-GCM";

/// Member name whose presence marks a stored value as encrypted.
pub const CIPHERTEXT_MARKER: &str = "ct";

/// A parsed, encrypted field value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WireField", into = "WireField")]
pub struct EncryptedField {
    /// Raw nonce bytes.
    pub nonce: [u8; NONCE_LEN],
    /// Raw authentication tag bytes.
    pub tag: [u8; TAG_LEN],
    /// Raw ciphertext bytes (same length as the plaintext).
    pub ciphertext: Vec<u8>,
}

/// Text-safe stored representation of an [`EncryptedField`].
#[derive(Serialize, Deserialize)]
struct WireField {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    alg: Option<String>,
    iv: String,
    tag: String,
    ct: String,
}

impl From<EncryptedField> for WireField {
    fn from(field: EncryptedField) -> Self {
        Self {
            alg: Some(ALGORITHM.to_owned()),
            iv: STANDARD.encode(field.nonce),
            tag: STANDARD.encode(field.tag),
            ct: STANDARD.encode(&field.ciphertext),
        }
    }
}

impl TryFrom<WireField> for EncryptedField {
    type Error = DecryptFailure;

    fn try_from(wire: WireField) -> Result<Self, Self::Error> {
        // Legacy rows may omit `alg`; a present one must match.
        if wire.alg.as_deref().is_some_and(|alg| alg != ALGORITHM) {
            return Err(DecryptFailure::Malformed);
        }
        Ok(Self {
            nonce: decode_fixed(&wire.iv)?,
            tag: decode_fixed(&wire.tag)?,
            ciphertext: STANDARD
                .decode(&wire.ct)
                .map_err(|_| DecryptFailure::Malformed)?,
        })
    }
}

impl EncryptedField {
    /// Encode this value to its stored JSON shape.
    pub fn to_value(&self) -> Value {
        json!({
            "alg": ALGORITHM,
            "iv": STANDARD.encode(self.nonce),
            "tag": STANDARD.encode(self.tag),
            "ct": STANDARD.encode(&self.ciphertext),
        })
    }

    /// Parse a stored JSON value back into an [`EncryptedField`].
    ///
    /// # Errors
    ///
    /// Returns [`DecryptFailure::Malformed`] if any member is missing, not
    /// base64, or of the wrong length.
    pub fn from_value(value: &Value) -> Result<Self, DecryptFailure> {
        Self::deserialize(value).map_err(|_| DecryptFailure::Malformed)
    }
}

/// Returns `true` if `value` is shaped like a stored encrypted field.
///
/// Values without the marker are plain; this keeps records written before
/// encryption was introduced readable.
///
/// This is shape-sniffing for data written before values were tagged; it does
/// not validate the members.
pub fn has_ciphertext_marker(value: &Value) -> bool {
    value
        .as_object()
        .is_some_and(|obj| obj.contains_key(CIPHERTEXT_MARKER))
}

/// Encrypt a plaintext string field using AES-256-GCM with no associated data.
///
/// # Errors
///
/// Returns [`EncryptError::Entropy`] if the CSPRNG fails and
/// [`EncryptError::AeadFailure`] on an internal AEAD error. Both are hard
/// failures; the caller must not fall back to storing plaintext.
pub fn encrypt_field(plaintext: &str, key: &SecretKey) -> Result<EncryptedField, EncryptError> {
    let mut nonce = [0u8; NONCE_LEN];
    OsRng
        .try_fill_bytes(&mut nonce)
        .map_err(|_| EncryptError::Entropy)?;

    let mut buffer = plaintext.as_bytes().to_vec();
    let tag = build_cipher(key)
        .encrypt_in_place_detached(Nonce::from_slice(&nonce), b"", &mut buffer)
        .map_err(|_| EncryptError::AeadFailure)?;

    let mut tag_bytes = [0u8; TAG_LEN];
    tag_bytes.copy_from_slice(tag.as_slice());

    Ok(EncryptedField {
        nonce,
        tag: tag_bytes,
        ciphertext: buffer,
    })
}

/// Decrypt an [`EncryptedField`] back to its plaintext string.
///
/// # Errors
///
/// Returns [`DecryptFailure::Authentication`] if the tag does not verify
/// (wrong key or tampered data) and [`DecryptFailure::InvalidUtf8`] if the
/// verified plaintext is not UTF-8.
pub fn decrypt_field(field: &EncryptedField, key: &SecretKey) -> Result<String, DecryptFailure> {
    let mut buffer = field.ciphertext.clone();
    build_cipher(key)
        .decrypt_in_place_detached(
            Nonce::from_slice(&field.nonce),
            b"",
            &mut buffer,
            Tag::from_slice(&field.tag),
        )
        .map_err(|_| DecryptFailure::Authentication)?;
    String::from_utf8(buffer).map_err(|_| DecryptFailure::InvalidUtf8)
}

fn build_cipher(key: &SecretKey) -> Aes256Gcm {
    Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()))
}

fn decode_fixed<const N: usize>(encoded: &str) -> Result<[u8; N], DecryptFailure> {
    let bytes = STANDARD
        .decode(encoded)
        .map_err(|_| DecryptFailure::Malformed)?;
    bytes.try_into().map_err(|_| DecryptFailure::Malformed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::KEY_LEN;
    use proptest::prelude::*;

    fn random_key() -> SecretKey {
        let mut key = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut key);
        SecretKey::from_bytes(key)
    }

    #[test]
    fn encrypt_decrypt_round_trip() {
        let key = random_key();
        let encrypted = encrypt_field("x@y.com", &key).unwrap();
        assert_eq!(decrypt_field(&encrypted, &key).unwrap(), "x@y.com");
    }

    #[test]
    fn empty_and_unicode_round_trip() {
        let key = random_key();
        for s in ["", "Zoë Ångström", "📞 +1 (555) 010-0000"] {
            let encrypted = encrypt_field(s, &key).unwrap();
            assert_eq!(decrypt_field(&encrypted, &key).unwrap(), s);
        }
    }

    #[test]
    fn same_plaintext_yields_fresh_nonce_and_ciphertext() {
        let key = random_key();
        let a = encrypt_field("john doe", &key).unwrap();
        let b = encrypt_field("john doe", &key).unwrap();
        assert_ne!(a.nonce, b.nonce);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn wrong_key_fails_decryption() {
        let encrypted = encrypt_field("secret", &random_key()).unwrap();
        assert_eq!(
            decrypt_field(&encrypted, &random_key()),
            Err(DecryptFailure::Authentication)
        );
    }

    #[test]
    fn stored_shape_has_four_members() {
        let key = random_key();
        let value = encrypt_field("hello", &key).unwrap().to_value();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), 4);
        assert_eq!(obj["alg"], ALGORITHM);
        assert_eq!(STANDARD.decode(obj["iv"].as_str().unwrap()).unwrap().len(), NONCE_LEN);
        assert_eq!(STANDARD.decode(obj["tag"].as_str().unwrap()).unwrap().len(), TAG_LEN);
        assert!(has_ciphertext_marker(&value));
    }

    #[test]
    fn stored_shape_round_trip() {
        let key = random_key();
        let field = encrypt_field("hello", &key).unwrap();
        let parsed = EncryptedField::from_value(&field.to_value()).unwrap();
        assert_eq!(parsed, field);
        assert_eq!(decrypt_field(&parsed, &key).unwrap(), "hello");
    }

    #[test]
    fn from_value_rejects_malformed_members() {
        let good = encrypt_field("x", &random_key()).unwrap().to_value();

        let mut bad_alg = good.clone();
        bad_alg["alg"] = json!("AES-128-CBC");
        assert_eq!(EncryptedField::from_value(&bad_alg), Err(DecryptFailure::Malformed));

        let mut short_iv = good.clone();
        short_iv["iv"] = json!(STANDARD.encode([0u8; 8]));
        assert_eq!(EncryptedField::from_value(&short_iv), Err(DecryptFailure::Malformed));

        let mut bad_ct = good.clone();
        bad_ct["ct"] = json!("!!!");
        assert_eq!(EncryptedField::from_value(&bad_ct), Err(DecryptFailure::Malformed));

        let mut missing_tag = good;
        missing_tag.as_object_mut().unwrap().remove("tag");
        assert_eq!(EncryptedField::from_value(&missing_tag), Err(DecryptFailure::Malformed));
    }

    #[test]
    fn tampered_ciphertext_fails_auth() {
        let key = random_key();
        let mut field = encrypt_field("tamper me", &key).unwrap();
        field.ciphertext[0] ^= 0xFF;
        assert_eq!(decrypt_field(&field, &key), Err(DecryptFailure::Authentication));
    }

    proptest! {
        #[test]
        fn round_trip_any_string(s in "\\PC*") {
            let key = random_key();
            let field = encrypt_field(&s, &key).unwrap();
            prop_assert_eq!(decrypt_field(&field, &key).unwrap(), s);
        }

        #[test]
        fn any_single_bit_flip_is_detected(
            s in "[ -~]{1,64}",
            pick in any::<prop::sample::Index>(),
            bit in 0u8..8,
        ) {
            let key = random_key();
            let mut field = encrypt_field(&s, &key).unwrap();
            let total = field.ciphertext.len() + TAG_LEN;
            let i = pick.index(total);
            if i < field.ciphertext.len() {
                field.ciphertext[i] ^= 1 << bit;
            } else {
                field.tag[i - field.ciphertext.len()] ^= 1 << bit;
            }
            prop_assert_eq!(decrypt_field(&field, &key), Err(DecryptFailure::Authentication));
        }
    }
}
