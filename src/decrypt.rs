//! Session-key resolution and instance decryption (spec §4.H): the
//! fallback ladder that unwraps an instance's session key under its owner
//! group's key, and the per-attribute decrypt/coerce pass that uses it.

use tracing::{debug, warn};

use crate::crypto::encryption::{decrypt_authenticated, decrypt_key_wrap, decrypt_legacy};
use crate::keychain::KeyChain;
use crate::model::binary::normalize_bytes;
use crate::model::keys::Key;
use crate::model::registry::TypeModel;
use crate::wire::{attr, attr_bytes, attr_str, Instance};

/// Sink for decrypt diagnostics (spec §9). Default no-op implementations
/// keep call sites clean; a verbose run wires in [`TracingDiagnostics`]
/// instead.
pub(crate) trait DecryptDiagnostics {
    /// Which session-key unwrap method succeeded, if any.
    fn session_key_resolved(&self, _method: Option<&'static str>) {}
    /// A 128-bit companion rescued an attribute decryption that failed
    /// under the full session key.
    fn attribute_fallback_used(&self, _attribute_id: &str) {}
    /// An attribute's decryption failed under every method tried.
    fn attribute_failed(&self, _attribute_id: &str) {}
}

pub(crate) struct NoopDiagnostics;
impl DecryptDiagnostics for NoopDiagnostics {}

/// Default diagnostics sink: emits `tracing` events instead of requiring
/// the caller to supply one.
pub(crate) struct TracingDiagnostics;

impl DecryptDiagnostics for TracingDiagnostics {
    fn session_key_resolved(&self, method: Option<&'static str>) {
        match method {
            Some(method) => debug!(method, "session key resolved"),
            None => warn!("session key resolution failed"),
        }
    }

    fn attribute_fallback_used(&self, attribute_id: &str) {
        debug!(attribute_id, "attribute decrypted via 128-bit companion");
    }

    fn attribute_failed(&self, attribute_id: &str) {
        warn!(attribute_id, "attribute decryption failed, using zero value");
    }
}

/// Resolves the session key for an encrypted instance. Returns `None` if
/// the type is not encrypted, the owner attributes are missing, the key
/// chain has no key for `(owner_group, version)`, or every unwrap method
/// fails.
pub(crate) fn resolve_session_key(
    type_model: &TypeModel,
    instance: &Instance,
    chain: &KeyChain,
    version_override: Option<&str>,
    diag: &dyn DecryptDiagnostics,
) -> Option<Key> {
    let owner = type_model.owner?;

    let owner_group = attr_str(instance, owner.owner_group)?;
    let encrypted_session_key = attr_bytes(instance, owner.owner_enc_session_key)?.ok()?;

    let version = version_override
        .map(str::to_owned)
        .or_else(|| attr_str(instance, owner.owner_key_version).map(str::to_owned))
        .unwrap_or_default();

    let key = chain.get(owner_group, &version)?;

    let attempts: &[(&str, fn(&[u8], &[u8]) -> anyhow::Result<Vec<u8>>)] = if key.is_256_bit() {
        &[
            ("legacy-256", decrypt_legacy),
            ("authenticated-256", decrypt_authenticated),
            ("key-wrap-128-companion", decrypt_key_wrap),
        ]
    } else {
        &[
            ("key-wrap-128", decrypt_key_wrap),
            ("legacy-as-128", decrypt_legacy),
            ("authenticated-256", decrypt_authenticated),
        ]
    };

    let companion = key.companion_128();

    for (name, method) in attempts {
        let active_key = if *name == "key-wrap-128-companion" {
            match &companion {
                Some(c) => c,
                None => continue,
            }
        } else {
            key
        };

        if let Ok(bytes) = method(active_key, &encrypted_session_key) {
            if let Ok(session_key) = Key::try_new(bytes.into_boxed_slice()) {
                diag.session_key_resolved(Some(name));
                return Some(session_key);
            }
        }
    }

    diag.session_key_resolved(None);
    None
}

/// Auto-dispatching attribute-value decrypt: odd-length authenticated
/// ciphertext carries an HMAC tag, even-length is the unauthenticated
/// legacy format. Mirrors the marker convention the service actually uses
/// on the wire.
fn decrypt_attribute_value(key: &[u8], ciphertext: &[u8]) -> anyhow::Result<Vec<u8>> {
    if key.len() == 32 && ciphertext.len() % 2 == 1 {
        decrypt_authenticated(key, ciphertext)
    } else {
        decrypt_legacy(key, ciphertext)
    }
}

/// Decrypts every encrypted attribute in `type_model.values`, coercing to
/// the declared scalar type. Attributes not in the value table (list refs,
/// tuple refs, aggregations) pass through unchanged. A `None` session key
/// materializes zero values for every encrypted attribute.
pub(crate) fn decrypt_instance(
    type_model: &TypeModel,
    wire: &Instance,
    session_key: Option<&Key>,
    diag: &dyn DecryptDiagnostics,
) -> Instance {
    let mut out = wire.clone();

    for &(id, model) in type_model.values.iter() {
        if !model.encrypted {
            continue;
        }

        let raw = attr(wire, id);
        let is_empty = matches!(raw, Some(serde_json::Value::String(s)) if s.is_empty());

        let value = match (session_key, raw, is_empty) {
            (Some(key), Some(raw), false) => match normalize_bytes(raw)
                .ok()
                .and_then(|bytes| decrypt_attribute_value(key, &bytes).ok())
            {
                Some(plaintext) => model.value_type.coerce(&plaintext).unwrap_or_else(|_| {
                    diag.attribute_failed(id);
                    model.value_type.zero_value()
                }),
                None => match key.companion_128() {
                    Some(companion) => {
                        match normalize_bytes(raw)
                            .ok()
                            .and_then(|bytes| decrypt_attribute_value(&companion, &bytes).ok())
                            .and_then(|plaintext| model.value_type.coerce(&plaintext).ok())
                        {
                            Some(v) => {
                                diag.attribute_fallback_used(id);
                                v
                            }
                            None => {
                                diag.attribute_failed(id);
                                model.value_type.zero_value()
                            }
                        }
                    }
                    None => {
                        diag.attribute_failed(id);
                        model.value_type.zero_value()
                    }
                },
            },
            _ => model.value_type.zero_value(),
        };

        out.insert(id.to_owned(), value.into_json());
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::keys::Key;
    use crate::model::registry::MAIL_SET;

    #[test]
    fn test_resolve_session_key_skips_non_encrypted_type() {
        let instance: Instance = serde_json::from_value(serde_json::json!({})).unwrap();
        let chain = KeyChain::default();
        assert!(resolve_session_key(
            &crate::model::registry::MAILBOX_GROUP_ROOT,
            &instance,
            &chain,
            None,
            &NoopDiagnostics,
        )
        .is_none());
    }

    #[test]
    fn test_decrypt_instance_with_no_session_key_is_all_zeros() {
        let wire: Instance = serde_json::from_value(serde_json::json!({
            "435": "not actually decryptable without a key",
            "1479": "",
            "1459": "some-list-id",
        }))
        .unwrap();

        let out = decrypt_instance(&MAIL_SET, &wire, None, &NoopDiagnostics);
        assert_eq!(out.get("435").unwrap(), "");
        assert_eq!(out.get("1479").unwrap(), "");
        assert_eq!(out.get("1459").unwrap(), "some-list-id");
    }

    #[test]
    fn test_decrypt_instance_passthrough_unmapped_attribute() {
        let wire: Instance = serde_json::from_value(serde_json::json!({"9999": "untouched"})).unwrap();
        let out = decrypt_instance(&MAIL_SET, &wire, None, &NoopDiagnostics);
        assert_eq!(out.get("9999").unwrap(), "untouched");
    }

    #[test]
    fn test_companion_key_is_none_for_128_bit() {
        let key = Key::try_new(vec![1u8; 16].into_boxed_slice()).unwrap();
        assert!(key.companion_128().is_none());
    }
}
