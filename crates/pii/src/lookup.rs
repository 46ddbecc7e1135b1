//! Deterministic tokens for exact-match search over encrypted values.
//!
//! A lookup token is `hex(HMAC-SHA-256(hmac_key, normalize(value)))`. Two
//! values that normalise to the same string always share a token; the token
//! reveals nothing about the value without the key. The caller decides which
//! fields get a token.

use chrono::NaiveDate;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::EncryptError;
use crate::keys::SecretKey;

type HmacSha256 = Hmac<Sha256>;

/// Length of a lookup token in hex characters.
pub const TOKEN_HEX_LEN: usize = 64;

/// Keyed, deterministic, non-reversible token for one normalised value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LookupToken(String);

impl LookupToken {
    /// The hex-encoded token.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LookupToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonical form used before hashing: trimmed and lowercased.
pub fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Derive the lookup token for `value`.
///
/// # Errors
///
/// Returns [`EncryptError::KeyInit`] if the HMAC rejects the key.
pub fn compute_lookup_token(value: &str, key: &SecretKey) -> Result<LookupToken, EncryptError> {
    let mut mac =
        HmacSha256::new_from_slice(key.as_bytes()).map_err(|_| EncryptError::KeyInit)?;
    mac.update(normalize(value).as_bytes());
    Ok(LookupToken(hex::encode(mac.finalize().into_bytes())))
}

/// Daily pseudonym of a client IP address.
///
/// `sha256(ip || secret || YYYY-MM-DD)`, hex-encoded. The date salt makes
/// pseudonyms from different days unlinkable.
pub fn hash_client_ip(ip: &str, secret: &str, day: NaiveDate) -> String {
    let mut hasher = Sha256::new();
    hasher.update(ip.as_bytes());
    hasher.update(secret.as_bytes());
    hasher.update(day.format("%Y-%m-%d").to_string().as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::KEY_LEN;
    use std::collections::HashSet;

    fn key(byte: u8) -> SecretKey {
        SecretKey::from_bytes([byte; KEY_LEN])
    }

    #[test]
    fn normalisation_makes_tokens_equal() {
        let k = key(1);
        assert_eq!(
            compute_lookup_token("X@Y.com", &k).unwrap(),
            compute_lookup_token(" x@y.com ", &k).unwrap()
        );
    }

    #[test]
    fn token_is_fixed_length_hex() {
        let token = compute_lookup_token("555-0100", &key(1)).unwrap();
        assert_eq!(token.as_str().len(), TOKEN_HEX_LEN);
        assert!(token.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert!(!token.as_str().contains("555"));
    }

    #[test]
    fn known_vector() {
        // HMAC-SHA-256 with a 32 x 0x0b key over "hi there".
        let token = compute_lookup_token("  HI THERE ", &key(0x0b)).unwrap();
        let mut mac = HmacSha256::new_from_slice(&[0x0b; KEY_LEN]).unwrap();
        mac.update(b"hi there");
        assert_eq!(token.as_str(), hex::encode(mac.finalize().into_bytes()));
    }

    #[test]
    fn different_keys_give_different_tokens() {
        assert_ne!(
            compute_lookup_token("a@b.com", &key(1)).unwrap(),
            compute_lookup_token("a@b.com", &key(2)).unwrap()
        );
    }

    #[test]
    fn no_collisions_over_large_corpus() {
        let k = key(7);
        let n = 50_000;
        let tokens: HashSet<LookupToken> = (0..n)
            .map(|i| compute_lookup_token(&format!("user{i}@example.com"), &k).unwrap())
            .collect();
        assert_eq!(tokens.len(), n);
    }

    #[test]
    fn serialises_as_bare_string() {
        let token = compute_lookup_token("x", &key(1)).unwrap();
        let json = serde_json::to_value(&token).unwrap();
        assert_eq!(json, serde_json::Value::String(token.to_string()));
    }

    #[test]
    fn ip_hash_is_daily() {
        let d1 = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
        let a = hash_client_ip("203.0.113.9", "s", d1);
        assert_eq!(a, hash_client_ip("203.0.113.9", "s", d1));
        assert_ne!(a, hash_client_ip("203.0.113.9", "s", d2));
        assert_ne!(a, hash_client_ip("203.0.113.9", "other", d1));
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn ip_hash_matches_concatenation() {
        let d = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
        let expected = hex::encode(Sha256::digest(b"10.0.0.1pepper2025-03-09"));
        assert_eq!(hash_client_ip("10.0.0.1", "pepper", d), expected);
    }
}
