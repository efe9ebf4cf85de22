//! Byte/text conversions for the wire formats the service uses.
//!
//! The service mixes three incompatible base64 dialects on the wire:
//! standard base64 for opaque blobs, URL-safe unpadded base64 for access
//! tokens and auth verifiers, and a third "ext" alphabet (digits sort before
//! letters) for `GeneratedId`s such as list ids. Keeping these as distinct
//! newtypes avoids ever feeding one dialect's bytes through another's
//! engine by accident.

use anyhow::{Context, Result};
use base64::{
    alphabet::Alphabet,
    engine::{general_purpose::NO_PAD, GeneralPurpose},
    prelude::*,
};
use serde::{de::Error, Deserializer, Serializer};
use std::ops::Deref;
use std::sync::OnceLock;

fn ext_engine() -> &'static GeneralPurpose {
    static ENGINE: OnceLock<GeneralPurpose> = OnceLock::new();
    ENGINE.get_or_init(|| {
        let alphabet =
            Alphabet::new("-0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ_")
                .expect("valid 64 character alphabet");
        GeneralPurpose::new(&alphabet, NO_PAD)
    })
}

#[derive(Clone, PartialEq, Eq, Hash)]
pub(crate) struct Base64String(Box<[u8]>);

impl Base64String {
    pub(crate) fn try_new(s: &str) -> Result<Self> {
        let data = BASE64_STANDARD.decode(s).context("base64 decode")?;
        Ok(Self(data.into()))
    }

    fn base64(&self) -> String {
        BASE64_STANDARD.encode(self.0.as_ref())
    }
}

impl std::fmt::Debug for Base64String {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.base64())
    }
}

impl std::fmt::Display for Base64String {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.base64())
    }
}

impl From<Vec<u8>> for Base64String {
    fn from(value: Vec<u8>) -> Self {
        Self(value.into())
    }
}

impl From<&[u8]> for Base64String {
    fn from(value: &[u8]) -> Self {
        Self(value.into())
    }
}

impl AsRef<[u8]> for Base64String {
    fn as_ref(&self) -> &[u8] {
        self.0.as_ref()
    }
}

impl Deref for Base64String {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl serde::Serialize for Base64String {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.base64())
    }
}

impl<'de> serde::Deserialize<'de> for Base64String {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::try_new(&s).map_err(D::Error::custom)
    }
}

#[derive(Clone, PartialEq, Eq, Hash)]
pub(crate) struct Base64Url(Box<[u8]>);

impl Base64Url {
    pub(crate) fn try_new(s: &str) -> Result<Self> {
        let data = BASE64_URL_SAFE_NO_PAD
            .decode(s)
            .context("base64url decode")?;
        Ok(Self(data.into()))
    }

    fn url(&self) -> String {
        BASE64_URL_SAFE_NO_PAD.encode(self.0.as_ref())
    }
}

impl std::fmt::Debug for Base64Url {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.url())
    }
}

impl std::fmt::Display for Base64Url {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.url())
    }
}

impl From<Vec<u8>> for Base64Url {
    fn from(value: Vec<u8>) -> Self {
        Self(value.into())
    }
}

impl From<&[u8]> for Base64Url {
    fn from(value: &[u8]) -> Self {
        Self(value.into())
    }
}

impl AsRef<[u8]> for Base64Url {
    fn as_ref(&self) -> &[u8] {
        self.0.as_ref()
    }
}

impl Deref for Base64Url {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl serde::Serialize for Base64Url {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.url())
    }
}

impl<'de> serde::Deserialize<'de> for Base64Url {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::try_new(&s).map_err(D::Error::custom)
    }
}

/// The `GeneratedId` alphabet: digits sort before letters so ids stay
/// lexicographically ordered by creation time.
#[derive(Clone, PartialEq, Eq, Hash)]
pub(crate) struct Base64Ext(Box<[u8]>);

impl Base64Ext {
    pub(crate) fn encode(bytes: &[u8]) -> String {
        ext_engine().encode(bytes)
    }
}

impl From<&[u8]> for Base64Ext {
    fn from(value: &[u8]) -> Self {
        Self(value.into())
    }
}

impl std::fmt::Display for Base64Ext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", Self::encode(&self.0))
    }
}

/// Builds the "custom id" the list-range endpoint expects for a decimal
/// version number: base64url of the base64 of the UTF-8 bytes of the
/// decimal text. Two encoding passes, not one — see spec §4.G.
pub(crate) fn custom_id_from_decimal_text(text: &str) -> String {
    let inner = BASE64_STANDARD.encode(text.as_bytes());
    BASE64_URL_SAFE_NO_PAD.encode(inner.as_bytes())
}

/// Normalizes a wire value that is logically bytes but may have arrived as
/// a base64 string, a raw JSON string (already-decoded text), or an array
/// of small integers (a byte-array-of-numbers).
pub(crate) fn normalize_bytes(value: &serde_json::Value) -> Result<Vec<u8>> {
    match value {
        serde_json::Value::String(s) => {
            if let Ok(decoded) = BASE64_STANDARD.decode(s) {
                Ok(decoded)
            } else {
                Ok(s.as_bytes().to_vec())
            }
        }
        serde_json::Value::Array(items) => items
            .iter()
            .map(|v| {
                v.as_u64()
                    .filter(|n| *n <= u8::MAX as u64)
                    .map(|n| n as u8)
                    .context("array element is not a byte")
            })
            .collect(),
        other => anyhow::bail!("cannot interpret {other:?} as bytes"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::testing::assert_roundtrip;

    #[test]
    fn test_roundtrip_base64string() {
        assert_roundtrip(Base64String::from(b"".as_slice()), r#""""#);
        assert_roundtrip(Base64String::from(b"foo".as_slice()), r#""Zm9v""#);
    }

    #[test]
    fn test_roundtrip_base64url() {
        assert_roundtrip(Base64Url::from(b"".as_slice()), r#""""#);
        assert_roundtrip(Base64Url::from(b"foo".as_slice()), r#""Zm9v""#);
        assert_roundtrip(Base64Url::from([0xff, 0x00].as_slice()), r#""_wA""#);
    }

    #[test]
    fn test_base64ext_of_zero_bytes() {
        assert_eq!(Base64Ext::encode(&[0u8; 9]), "---------");
    }

    #[test]
    fn test_custom_id_from_decimal_text() {
        // "5" -> base64("5") = "NQ==" -> base64url("NQ==") = "TlE9PQ"
        assert_eq!(custom_id_from_decimal_text("5"), "TlE9PQ");
    }

    #[test]
    fn test_normalize_bytes_variants() {
        assert_eq!(
            normalize_bytes(&serde_json::json!("Zm9v")).unwrap(),
            b"foo"
        );
        assert_eq!(
            normalize_bytes(&serde_json::json!([102, 111, 111])).unwrap(),
            b"foo"
        );
    }
}
