//! Field-level PII protection for semi-structured event records.
//!
//! The crate is a pure transformation layer: it never performs I/O. Callers
//! load a [`KeyMaterial`] once at startup and pass it by reference into every
//! operation.
//!
//! - [`keys`]: load and validate the encryption and lookup keys.
//! - [`cipher`]: AES-256-GCM encryption of a single string value.
//! - [`record`]: shallow encryption/decryption of a whole record.
//! - [`lookup`]: deterministic HMAC tokens for exact-match search.
//! - [`mask`]: display-safe projections of decrypted values.
//!
//! # Known gap
//!
//! Only top-level string fields of a record are encrypted. Strings nested in
//! arrays or objects are stored as-is. Deepening the encryption scope changes
//! the persisted data shape and needs a versioned migration.

pub mod cipher;
pub mod error;
pub mod keys;
pub mod lookup;
pub mod mask;
pub mod record;

pub use cipher::{decrypt_field, encrypt_field, EncryptedField};
pub use error::{ConfigError, DecryptFailure, EncryptError};
pub use keys::{load_key, KeyMaterial, SecretKey, KEY_LEN};
pub use lookup::{compute_lookup_token, hash_client_ip, LookupToken};
pub use mask::{mask_contact_details, mask_email, mask_number, number_text, value_text};
pub use record::{
    decrypt_batch, decrypt_object, encrypt_object, ProtectedRecord, ProtectedValue,
    DECRYPT_FAILURE_SENTINEL,
};
