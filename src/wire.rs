//! The wire instance shape: a numeric-id-keyed map of untyped JSON values
//! (spec §3, §9). Every accessor routes through
//! [`crate::model::value::unwrap_single_element_array`] first, since any
//! attribute may arrive wrapped in a one-element list.

use anyhow::{Context, Result};
use serde_json::Value;

use crate::model::binary::normalize_bytes;
use crate::model::value::unwrap_single_element_array;

/// A parsed wire or decrypted instance: numeric attribute id (as text) to
/// untyped value.
pub(crate) type Instance = serde_json::Map<String, Value>;

/// Reads and unwraps attribute `id`, returning `None` if absent or `null`.
pub(crate) fn attr<'a>(instance: &'a Instance, id: &str) -> Option<&'a Value> {
    instance.get(id).map(unwrap_single_element_array).filter(|v| !v.is_null())
}

/// Reads attribute `id` as a string.
pub(crate) fn attr_str<'a>(instance: &'a Instance, id: &str) -> Option<&'a str> {
    attr(instance, id).and_then(Value::as_str)
}

/// Reads attribute `id` as a string, failing if absent.
pub(crate) fn require_str(instance: &Instance, id: &str, what: &str) -> Result<String> {
    attr_str(instance, id)
        .map(str::to_owned)
        .with_context(|| format!("missing or malformed {what} (attribute {id})"))
}

/// Reads attribute `id` as a nested aggregation (object).
pub(crate) fn attr_object<'a>(instance: &'a Instance, id: &str) -> Option<&'a serde_json::Map<String, Value>> {
    attr(instance, id).and_then(Value::as_object)
}

/// Reads attribute `id` as a list of nested aggregations.
pub(crate) fn attr_array<'a>(instance: &'a Instance, id: &str) -> Option<&'a Vec<Value>> {
    attr(instance, id).and_then(Value::as_array)
}

/// Reads attribute `id` and normalizes it to raw bytes (base64 string, raw
/// string, or byte-array-of-numbers).
pub(crate) fn attr_bytes(instance: &Instance, id: &str) -> Option<Result<Vec<u8>>> {
    attr(instance, id).map(normalize_bytes)
}

/// Reads the service-private `_id` key, which addresses the instance
/// itself: a plain string for a standalone (element-id-addressed) entity,
/// or `[list_id, element_id]` for a list-typed one. Returns just the
/// element id either way.
pub(crate) fn element_id(instance: &Instance) -> Option<&str> {
    match instance.get("_id") {
        Some(Value::String(s)) => Some(s.as_str()),
        Some(Value::Array(items)) => items.last()?.as_str(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attr_unwraps_single_element_array() {
        let instance: Instance =
            serde_json::from_value(serde_json::json!({"1": ["hello"]})).unwrap();
        assert_eq!(attr_str(&instance, "1"), Some("hello"));
    }

    #[test]
    fn test_attr_missing_is_none() {
        let instance: Instance = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(attr(&instance, "1"), None);
    }

    #[test]
    fn test_attr_null_is_none() {
        let instance: Instance =
            serde_json::from_value(serde_json::json!({"1": null})).unwrap();
        assert_eq!(attr(&instance, "1"), None);
    }

    #[test]
    fn test_element_id_from_tuple() {
        let instance: Instance =
            serde_json::from_value(serde_json::json!({"_id": ["list", "elem"]})).unwrap();
        assert_eq!(element_id(&instance), Some("elem"));
    }

    #[test]
    fn test_element_id_from_plain_string() {
        let instance: Instance = serde_json::from_value(serde_json::json!({"_id": "elem"})).unwrap();
        assert_eq!(element_id(&instance), Some("elem"));
    }

    #[test]
    fn test_element_id_missing() {
        let instance: Instance = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(element_id(&instance), None);
    }
}
