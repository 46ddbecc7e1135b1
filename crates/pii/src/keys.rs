//! Key loading and validation.
//!
//! Both keys are supplied as base64 and must decode to exactly [`KEY_LEN`]
//! bytes. Anything else fails closed; a key is never padded, truncated or
//! derived from a shorter secret.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::ConfigError;

/// Byte length of both the AES-256 key and the HMAC key (32 bytes = 256 bits).
pub const KEY_LEN: usize = 32;

/// Conventional variable name of the field encryption key.
pub const ENCRYPTION_KEY_NAME: &str = "PIIFIELD_KEY";

/// Conventional variable name of the lookup-token HMAC key.
pub const HMAC_KEY_NAME: &str = "PII_HMAC_KEY";

/// Fixed-size secret holding exactly [`KEY_LEN`] bytes.
///
/// The heap buffer is zeroized on drop and never printed.
pub struct SecretKey(Box<[u8; KEY_LEN]>);

impl SecretKey {
    /// Wrap raw key bytes.
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(Box::new(bytes))
    }

    /// Copy exactly [`KEY_LEN`] bytes straight into the heap buffer.
    fn from_slice(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != KEY_LEN {
            return None;
        }
        let mut key = Self(Box::new([0u8; KEY_LEN]));
        key.0.copy_from_slice(bytes);
        Some(key)
    }

    /// Borrow the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl Drop for SecretKey {
    fn drop(&mut self) {
        let bytes: &mut [u8; KEY_LEN] = &mut self.0;
        bytes.zeroize();
    }
}

impl ZeroizeOnDrop for SecretKey {}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretKey([REDACTED])")
    }
}

/// Decode and validate one configured key.
///
/// `name` is only used to label the error.
///
/// # Errors
///
/// - [`ConfigError::MissingKey`] if `raw` is absent or blank.
/// - [`ConfigError::InvalidEncoding`] if `raw` is not base64.
/// - [`ConfigError::InvalidKeyLength`] if it does not decode to [`KEY_LEN`] bytes.
pub fn load_key(raw: Option<&str>, name: &'static str) -> Result<SecretKey, ConfigError> {
    let raw = raw
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::MissingKey { name })?;

    let decoded = Zeroizing::new(
        STANDARD
            .decode(raw)
            .map_err(|_| ConfigError::InvalidEncoding { name })?,
    );

    SecretKey::from_slice(&decoded).ok_or(ConfigError::InvalidKeyLength {
        name,
        len: decoded.len(),
    })
}

/// The two independent secrets used by the engine.
///
/// Built once at process start and shared read-only afterwards; it needs no
/// locking.
#[derive(Debug)]
pub struct KeyMaterial {
    encryption: SecretKey,
    hmac: SecretKey,
}

impl KeyMaterial {
    /// Assemble key material from already-validated keys.
    pub fn new(encryption: SecretKey, hmac: SecretKey) -> Self {
        Self { encryption, hmac }
    }

    /// Load both keys from their base64 configuration values.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] encountered, encryption key first.
    pub fn load(encryption_b64: Option<&str>, hmac_b64: Option<&str>) -> Result<Self, ConfigError> {
        let encryption = load_key(encryption_b64, ENCRYPTION_KEY_NAME)?;
        let hmac = load_key(hmac_b64, HMAC_KEY_NAME)?;
        Ok(Self::new(encryption, hmac))
    }

    /// Key for AES-256-GCM field encryption.
    pub fn encryption_key(&self) -> &SecretKey {
        &self.encryption
    }

    /// Key for HMAC-SHA-256 lookup tokens.
    pub fn hmac_key(&self) -> &SecretKey {
        &self.hmac
    }
}
