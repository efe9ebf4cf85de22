//! Scalar value types, their zero values, and the coercion between
//! decrypted UTF-8 bytes and a typed in-memory representation.

use anyhow::{Context, Result};

use super::{binary::Base64String, date::UnixDate};

/// A scalar value type declared by the type model for an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum ValueType {
    String,
    Number,
    Date,
    Boolean,
    Bytes,
    CompressedString,
}

/// A decrypted (or zero) scalar value, coerced to its declared type.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Value {
    Str(String),
    Number(i64),
    Date(UnixDate),
    Boolean(bool),
    Bytes(Vec<u8>),
    CompressedString(String),
}

impl ValueType {
    /// The value substituted when decryption was attempted and failed, or
    /// when no session key was available.
    pub(crate) fn zero_value(self) -> Value {
        match self {
            Self::String => Value::Str(String::new()),
            Self::Number => Value::Number(0),
            Self::Date => Value::Date(UnixDate::epoch()),
            Self::Boolean => Value::Boolean(false),
            Self::Bytes => Value::Bytes(Vec::new()),
            Self::CompressedString => Value::CompressedString(String::new()),
        }
    }

    /// Coerces decrypted UTF-8 bytes into this value type.
    pub(crate) fn coerce(self, bytes: &[u8]) -> Result<Value> {
        Ok(match self {
            Self::String => Value::Str(String::from_utf8_lossy(bytes).into_owned()),
            Self::CompressedString => {
                Value::CompressedString(String::from_utf8_lossy(bytes).into_owned())
            }
            Self::Bytes => Value::Bytes(bytes.to_vec()),
            Self::Number => {
                let text = std::str::from_utf8(bytes).context("number is not UTF-8")?;
                let n = if text.is_empty() {
                    0
                } else {
                    text.parse::<i64>().context("invalid number text")?
                };
                Value::Number(n)
            }
            Self::Date => {
                let text = std::str::from_utf8(bytes).context("date is not UTF-8")?;
                let millis = text.parse::<i64>().context("invalid date text")?;
                let dt = chrono::NaiveDateTime::from_timestamp_millis(millis)
                    .context("date out of range")?;
                Value::Date(UnixDate(dt))
            }
            Self::Boolean => {
                let text = std::str::from_utf8(bytes).context("boolean is not UTF-8")?;
                Value::Boolean(text != "0")
            }
        })
    }
}

impl Value {
    /// The plaintext bytes this value would have been encrypted from.
    /// Used only by the zero-value round-trip property: `coerce(stringify(zero)) == zero`.
    pub(crate) fn stringify(&self) -> Vec<u8> {
        match self {
            Self::Str(s) | Self::CompressedString(s) => s.as_bytes().to_vec(),
            Self::Number(n) => n.to_string().into_bytes(),
            Self::Date(d) => d.0.and_utc().timestamp_millis().to_string().into_bytes(),
            Self::Boolean(b) => if *b { "1" } else { "0" }.as_bytes().to_vec(),
            Self::Bytes(b) => b.clone(),
        }
    }

    pub(crate) fn value_type(&self) -> ValueType {
        match self {
            Self::Str(_) => ValueType::String,
            Self::Number(_) => ValueType::Number,
            Self::Date(_) => ValueType::Date,
            Self::Boolean(_) => ValueType::Boolean,
            Self::Bytes(_) => ValueType::Bytes,
            Self::CompressedString(_) => ValueType::CompressedString,
        }
    }

    /// JSON representation used when writing this value back into a
    /// decrypted instance map.
    pub(crate) fn into_json(self) -> serde_json::Value {
        match self {
            Self::Str(s) | Self::CompressedString(s) => serde_json::Value::String(s),
            Self::Number(n) => serde_json::Value::String(n.to_string()),
            Self::Date(d) => serde_json::Value::String(d.0.and_utc().timestamp_millis().to_string()),
            Self::Boolean(b) => serde_json::Value::Bool(b),
            Self::Bytes(b) => serde_json::Value::String(Base64String::from(b.as_slice()).to_string()),
        }
    }
}

/// Unwraps a wire value that may have arrived as a one-element array
/// wrapper. Any other shape, including `null` and multi-element arrays,
/// passes through unchanged.
pub(crate) fn unwrap_single_element_array(value: &serde_json::Value) -> &serde_json::Value {
    match value {
        serde_json::Value::Array(items) if items.len() == 1 => &items[0],
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_value_roundtrip() {
        for ty in [
            ValueType::String,
            ValueType::Number,
            ValueType::Date,
            ValueType::Boolean,
            ValueType::Bytes,
            ValueType::CompressedString,
        ] {
            let zero = ty.zero_value();
            let bytes = zero.stringify();
            let recovered = ty.coerce(&bytes).unwrap();
            assert_eq!(zero, recovered, "type {ty:?} failed zero-value round-trip");
        }
    }

    #[test]
    fn test_coerce_number_empty_is_zero() {
        assert_eq!(ValueType::Number.coerce(b"").unwrap(), Value::Number(0));
    }

    #[test]
    fn test_coerce_boolean() {
        assert_eq!(ValueType::Boolean.coerce(b"0").unwrap(), Value::Boolean(false));
        assert_eq!(ValueType::Boolean.coerce(b"1").unwrap(), Value::Boolean(true));
        assert_eq!(ValueType::Boolean.coerce(b"yes").unwrap(), Value::Boolean(true));
    }

    #[test]
    fn test_unwrap_single_element_array() {
        assert_eq!(
            unwrap_single_element_array(&serde_json::json!([1])),
            &serde_json::json!(1),
        );
        assert_eq!(
            unwrap_single_element_array(&serde_json::json!([1, 2])),
            &serde_json::json!([1, 2]),
        );
        assert_eq!(
            unwrap_single_element_array(&serde_json::Value::Null),
            &serde_json::Value::Null,
        );
    }
}
