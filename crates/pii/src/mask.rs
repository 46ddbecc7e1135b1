//! Display-safe projections of decrypted contact values.
//!
//! Masking runs after decryption and is total: every input yields an output,
//! and empty input yields `None`.

use serde_json::{Map, Number, Value};

use crate::record::DECRYPT_FAILURE_SENTINEL;

const REDACTION: char = '•';

/// Appended to the first character of a masked email domain.
pub const DOMAIN_SUFFIX: &str = "•••";

/// Prefix of a masked number, and the whole output when too few digits remain.
pub const NUMBER_PREFIX: &str = "••••";

/// Number of trailing digits kept visible by [`mask_number`].
pub const VISIBLE_DIGITS: usize = 4;

/// Mask an email address for display.
///
/// `john@example.com` becomes `j••n@e•••`. A local part of two characters or
/// fewer is replaced entirely. Input without a domain part is returned
/// unchanged.
pub fn mask_email(email: Option<&str>) -> Option<String> {
    let email = email.filter(|e| !e.is_empty())?;

    let mut parts = email.split('@');
    let local = parts.next().unwrap_or_default();
    let domain = parts.next().unwrap_or_default();
    let Some(domain_head) = domain.chars().next() else {
        return Some(email.to_owned());
    };

    let chars: Vec<char> = local.chars().collect();
    let masked_local = match chars.as_slice() {
        [first, interior @ .., last] if chars.len() > 2 => {
            let mut out = String::with_capacity(local.len() + interior.len() * 2);
            out.push(*first);
            out.extend(std::iter::repeat(REDACTION).take(interior.len()));
            out.push(*last);
            out
        }
        _ => std::iter::repeat(REDACTION).take(2).collect(),
    };

    Some(format!("{masked_local}@{domain_head}{DOMAIN_SUFFIX}"))
}

/// Mask a phone or other number for display, keeping only the last four digits.
///
/// Non-digit characters are discarded first. Four digits or fewer are
/// redacted entirely.
pub fn mask_number(value: Option<&str>) -> Option<String> {
    let value = value.filter(|v| !v.is_empty())?;
    let digits: String = value.chars().filter(char::is_ascii_digit).collect();
    if digits.len() <= VISIBLE_DIGITS {
        return Some(NUMBER_PREFIX.to_owned());
    }
    Some(format!(
        "{NUMBER_PREFIX}{}",
        &digits[digits.len() - VISIBLE_DIGITS..]
    ))
}

/// Mask the conventional contact fields of a decrypted record.
///
/// `email` goes through [`mask_email`]; `number` and `phone` go through
/// [`mask_number`]. Non-string values are masked via their [`value_text`], so
/// a phone stored as a number or an array is redacted like a string one. A
/// field holding the decrypt-failure sentinel is left as-is so the failure
/// stays visible. Fields that mask to nothing are dropped; all other fields
/// are copied unchanged.
pub fn mask_contact_details(mut record: Map<String, Value>) -> Map<String, Value> {
    mask_in_place(&mut record, "email", mask_email);
    for name in ["number", "phone"] {
        mask_in_place(&mut record, name, mask_number);
    }
    record
}

fn mask_in_place(
    record: &mut Map<String, Value>,
    name: &str,
    mask: fn(Option<&str>) -> Option<String>,
) {
    let text = match record.get(name) {
        None => return,
        Some(Value::String(s)) if s == DECRYPT_FAILURE_SENTINEL => return,
        Some(value) => value_text(value),
    };
    match mask(text.as_deref()) {
        Some(masked) => {
            record.insert(name.to_owned(), Value::String(masked));
        }
        None => {
            record.remove(name);
        }
    }
}

/// Text form of a JSON value, as a browser client would render it.
///
/// Arrays join their elements with `,`, objects become `[object Object]`,
/// and `null` has no text.
pub fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(number_text(n)),
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => Some(
            items
                .iter()
                .map(|item| value_text(item).unwrap_or_default())
                .collect::<Vec<_>>()
                .join(","),
        ),
        Value::Object(_) => Some("[object Object]".to_owned()),
    }
}

/// Decimal text of a JSON number; integral floats print without a fraction.
///
/// `5550104242.0` becomes `"5550104242"`, so a phone number stored as a float
/// keeps its real last digits.
pub fn number_text(n: &Number) -> String {
    match n.as_f64() {
        Some(f) if n.is_f64() && f.is_finite() && f.fract() == 0.0 && f.abs() < 1e21 => {
            if f == 0.0 {
                "0".to_owned()
            } else {
                format!("{f:.0}")
            }
        }
        _ => n.to_string(),
    }
}
