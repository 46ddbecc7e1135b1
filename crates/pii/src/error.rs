//! Error taxonomy of the protection engine.
//!
//! - [`ConfigError`] is fatal and blocks startup.
//! - [`EncryptError`] aborts the write; a field is never persisted in plaintext.
//! - [`DecryptFailure`] is expected occasionally and is absorbed per field by
//!   the record codec.

use thiserror::Error;

/// Key configuration is absent or unusable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The key variable is unset or blank.
    #[error("{name} is required and must not be empty")]
    MissingKey { name: &'static str },

    /// The key decoded to something other than [`crate::KEY_LEN`] bytes.
    #[error("{name} must be a base64-encoded 32-byte key, got {len} bytes")]
    InvalidKeyLength { name: &'static str, len: usize },

    /// The key is not valid base64.
    #[error("{name} is not valid base64")]
    InvalidEncoding { name: &'static str },
}

/// A hard failure while protecting a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EncryptError {
    /// The OS CSPRNG could not produce a nonce.
    #[error("secure random source unavailable")]
    Entropy,

    /// The keyed primitive rejected the key.
    #[error("key initialisation failed")]
    KeyInit,

    /// AES-GCM encryption failed.
    #[error("aead operation failed")]
    AeadFailure,
}

/// Why a stored value could not be turned back into plaintext.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecryptFailure {
    /// The value carries a ciphertext marker but is not a well-formed field.
    #[error("malformed encrypted field")]
    Malformed,

    /// The tag did not verify: tampered data or a different key.
    #[error("authentication tag mismatch")]
    Authentication,

    /// The tag verified but the plaintext is not UTF-8.
    #[error("plaintext is not valid utf-8")]
    InvalidUtf8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_names_the_key() {
        let e = ConfigError::InvalidKeyLength {
            name: "PIIFIELD_KEY",
            len: 31,
        };
        let msg = e.to_string();
        assert!(msg.contains("PIIFIELD_KEY"));
        assert!(msg.contains("31"));
    }

    #[test]
    fn decrypt_failure_display() {
        assert_eq!(
            DecryptFailure::Authentication.to_string(),
            "authentication tag mismatch"
        );
    }
}
