//! Shallow encryption of semi-structured records.
//!
//! [`encrypt_object`] replaces every top-level string with an
//! [`EncryptedField`]; numbers, booleans, nulls, arrays and nested objects are
//! copied through untouched. Strings inside arrays or nested objects are NOT
//! protected.
//!
//! On read, [`decrypt_object`] handles each field independently. A field that
//! fails to decrypt becomes [`DECRYPT_FAILURE_SENTINEL`]; sibling fields and
//! other records are unaffected.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::warn;

use crate::cipher::{decrypt_field, encrypt_field, has_ciphertext_marker, EncryptedField};
use crate::error::{DecryptFailure, EncryptError};
use crate::keys::SecretKey;

/// Substituted for the plaintext of a field that cannot be decrypted.
pub const DECRYPT_FAILURE_SENTINEL: &str = "⚠️ decrypt_error";

/// One top-level field of a protected record.
#[derive(Debug, Clone, PartialEq)]
pub enum ProtectedValue {
    /// Stored as-is.
    Plain(Value),
    /// An encrypted string.
    Encrypted(EncryptedField),
    /// Carries the ciphertext marker but does not parse as an encrypted field.
    Malformed(Value),
}

impl ProtectedValue {
    /// Classify a stored value by its shape.
    ///
    /// This is the compatibility path for rows written before values were
    /// tagged: an object with a `ct` member is treated as ciphertext.
    pub fn from_stored(value: Value) -> Self {
        if !has_ciphertext_marker(&value) {
            return Self::Plain(value);
        }
        match EncryptedField::from_value(&value) {
            Ok(field) => Self::Encrypted(field),
            Err(_) => Self::Malformed(value),
        }
    }

    /// The stored JSON representation.
    pub fn to_stored(&self) -> Value {
        match self {
            Self::Plain(v) | Self::Malformed(v) => v.clone(),
            Self::Encrypted(field) => field.to_value(),
        }
    }

    /// Returns `true` for [`ProtectedValue::Encrypted`].
    pub fn is_encrypted(&self) -> bool {
        matches!(self, Self::Encrypted(_))
    }

    /// Recover the plaintext value.
    ///
    /// # Errors
    ///
    /// Returns [`DecryptFailure::Malformed`] for a malformed field, or the
    /// failure reported by [`decrypt_field`].
    pub fn reveal(&self, key: &SecretKey) -> Result<Value, DecryptFailure> {
        match self {
            Self::Plain(v) => Ok(v.clone()),
            Self::Encrypted(field) => decrypt_field(field, key).map(Value::String),
            Self::Malformed(_) => Err(DecryptFailure::Malformed),
        }
    }
}

/// A record whose top-level string fields have been encrypted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProtectedRecord {
    fields: BTreeMap<String, ProtectedValue>,
}

impl ProtectedRecord {
    /// Classify every field of a stored JSON object.
    pub fn from_stored(stored: Map<String, Value>) -> Self {
        let fields = stored
            .into_iter()
            .map(|(name, value)| (name, ProtectedValue::from_stored(value)))
            .collect();
        Self { fields }
    }

    /// The stored JSON object.
    pub fn to_stored(&self) -> Map<String, Value> {
        self.fields
            .iter()
            .map(|(name, value)| (name.clone(), value.to_stored()))
            .collect()
    }

    /// Look up a single field.
    pub fn get(&self, name: &str) -> Option<&ProtectedValue> {
        self.fields.get(name)
    }

    /// Iterate over fields in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ProtectedValue)> {
        self.fields.iter()
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for ProtectedRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_stored().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ProtectedRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Map::<String, Value>::deserialize(deserializer).map(Self::from_stored)
    }
}

/// Encrypt every top-level string of `record`.
///
/// # Errors
///
/// Propagates the first [`EncryptError`]; no partially protected record is
/// returned.
pub fn encrypt_object(
    record: &Map<String, Value>,
    key: &SecretKey,
) -> Result<ProtectedRecord, EncryptError> {
    let mut fields = BTreeMap::new();
    for (name, value) in record {
        let protected = match value {
            Value::String(s) => ProtectedValue::Encrypted(encrypt_field(s, key)?),
            other => ProtectedValue::Plain(other.clone()),
        };
        fields.insert(name.clone(), protected);
    }
    Ok(ProtectedRecord { fields })
}

/// Decrypt every encrypted field of `record`.
///
/// Failures are logged (field name and failure kind only) and replaced with
/// [`DECRYPT_FAILURE_SENTINEL`].
pub fn decrypt_object(record: &ProtectedRecord, key: &SecretKey) -> Map<String, Value> {
    record
        .iter()
        .map(|(name, value)| {
            let revealed = match value.reveal(key) {
                Ok(v) => v,
                Err(failure) => {
                    warn!(field = %name, reason = %failure, "field decryption failed");
                    Value::String(DECRYPT_FAILURE_SENTINEL.to_owned())
                }
            };
            (name.clone(), revealed)
        })
        .collect()
}

/// Decrypt a batch of records, each independently of the others.
pub fn decrypt_batch<'a, I>(records: I, key: &SecretKey) -> Vec<Map<String, Value>>
where
    I: IntoIterator<Item = &'a ProtectedRecord>,
{
    records
        .into_iter()
        .map(|record| decrypt_object(record, key))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::KEY_LEN;
    use serde_json::json;

    fn key() -> SecretKey {
        SecretKey::from_bytes([0x42; KEY_LEN])
    }

    fn obj(v: Value) -> Map<String, Value> {
        v.as_object().unwrap().clone()
    }

    #[test]
    fn only_top_level_strings_are_encrypted() {
        let input = obj(json!({"name": "Jo", "email": "a@b.com", "age": 30, "tags": ["x", "y"]}));
        let protected = encrypt_object(&input, &key()).unwrap();

        assert!(protected.get("name").unwrap().is_encrypted());
        assert!(protected.get("email").unwrap().is_encrypted());
        assert_eq!(protected.get("age"), Some(&ProtectedValue::Plain(json!(30))));
        assert_eq!(
            protected.get("tags"),
            Some(&ProtectedValue::Plain(json!(["x", "y"])))
        );

        let stored = protected.to_stored();
        assert!(stored["name"].get("ct").is_some());
        assert_eq!(stored["age"], input["age"]);
        assert_eq!(stored["tags"], input["tags"]);

        assert_eq!(decrypt_object(&protected, &key()), input);
    }

    #[test]
    fn nested_strings_stay_plain() {
        let input = obj(json!({"address": {"street": "1 Main St"}, "optIn": false, "note": null}));
        let protected = encrypt_object(&input, &key()).unwrap();
        assert_eq!(protected.to_stored(), input);
    }

    #[test]
    fn stored_round_trip_through_json() {
        let input = obj(json!({"name": "john doe", "number": "123", "count": 2}));
        let protected = encrypt_object(&input, &key()).unwrap();
        let json = serde_json::to_string(&protected).unwrap();
        assert!(!json.contains("john doe"));

        let reloaded: ProtectedRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(reloaded, protected);
        assert_eq!(decrypt_object(&reloaded, &key()), input);
    }

    #[test]
    fn legacy_plain_strings_pass_through() {
        let stored = obj(json!({"name": "pre-encryption row", "age": 7}));
        let record = ProtectedRecord::from_stored(stored.clone());
        assert_eq!(decrypt_object(&record, &key()), stored);
    }

    #[test]
    fn malformed_and_wrong_key_fields_become_sentinel() {
        let other_key = SecretKey::from_bytes([0x07; KEY_LEN]);
        let foreign = encrypt_field("rotated", &other_key).unwrap().to_value();
        let stored = obj(json!({
            "broken": {"ct": "%%%", "iv": "", "tag": ""},
            "rotated": foreign,
            "name": "plain",
        }));
        let record = ProtectedRecord::from_stored(stored);
        assert!(matches!(record.get("broken"), Some(ProtectedValue::Malformed(_))));

        let out = decrypt_object(&record, &key());
        assert_eq!(out["broken"], DECRYPT_FAILURE_SENTINEL);
        assert_eq!(out["rotated"], DECRYPT_FAILURE_SENTINEL);
        assert_eq!(out["name"], "plain");
    }

    #[test]
    fn batch_isolates_a_corrupted_field() {
        let k = key();
        let inputs = [
            obj(json!({"name": "Ann", "email": "ann@x.com"})),
            obj(json!({"name": "Bob", "email": "bob@x.com", "age": 40})),
            obj(json!({"name": "Cy", "email": "cy@x.com"})),
        ];
        let mut records: Vec<ProtectedRecord> = inputs
            .iter()
            .map(|r| encrypt_object(r, &k).unwrap())
            .collect();

        if let Some(ProtectedValue::Encrypted(field)) = records[1].fields.get_mut("email") {
            field.tag[0] ^= 0x01;
        } else {
            panic!("email should be encrypted");
        }

        let out = decrypt_batch(&records, &k);
        assert_eq!(out.len(), 3);

        let sentinels = out
            .iter()
            .flat_map(|r| r.values())
            .filter(|v| *v == DECRYPT_FAILURE_SENTINEL)
            .count();
        assert_eq!(sentinels, 1);
        assert_eq!(out[1]["email"], DECRYPT_FAILURE_SENTINEL);
        assert_eq!(out[1]["name"], "Bob");
        assert_eq!(out[1]["age"], 40);
        assert_eq!(out[0], inputs[0]);
        assert_eq!(out[2], inputs[2]);
    }

    #[test]
    fn empty_record() {
        let protected = encrypt_object(&Map::new(), &key()).unwrap();
        assert!(protected.is_empty());
        assert_eq!(protected.len(), 0);
        assert!(decrypt_object(&protected, &key()).is_empty());
    }

    #[test]
    fn unmarked_values_reveal_unchanged() {
        for v in [json!("plain"), json!(42), json!(["a"]), json!({"iv": "x"}), Value::Null] {
            let stored = ProtectedValue::from_stored(v.clone());
            assert_eq!(stored, ProtectedValue::Plain(v.clone()));
            assert_eq!(stored.reveal(&key()).unwrap(), v);
        }
    }

    #[test]
    fn marked_garbage_is_malformed() {
        let stored = ProtectedValue::from_stored(json!({"ct": 5}));
        assert_eq!(stored.reveal(&key()), Err(DecryptFailure::Malformed));
    }

    #[test]
    fn legacy_shape_without_alg_is_revealed() {
        let mut value = encrypt_field("legacy", &key()).unwrap().to_value();
        value.as_object_mut().unwrap().remove("alg");
        let stored = ProtectedValue::from_stored(value);
        assert!(stored.is_encrypted());
        assert_eq!(stored.reveal(&key()).unwrap(), json!("legacy"));
    }
}
