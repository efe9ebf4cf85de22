//! The two-step login protocol (spec §4.E): fetch salt, derive the
//! passphrase key, post session creation, derive the session-id pair from
//! the resulting access token.

use anyhow::{bail, Context, Result};
use sha2::{Digest, Sha256};

use crate::client::Client;
use crate::crypto::auth::{build_auth_verifier, derive_passphrase_key};
use crate::error::CoreError;
use crate::model::binary::Base64Ext;
use crate::model::enums::KdfVersion;
use crate::session::Session;

/// Attribute ids for the salt and session-creation services. Neither is an
/// entity type in the sense of the type-model registry, so these ids are
/// not tabulated in spec §6; `format`/`mailAddress` on the salt request
/// are pinned by spec §8 scenario 1, the rest are assigned here.
mod attrs {
    pub(crate) const SALT_REQUEST_FORMAT: &str = "418";
    pub(crate) const SALT_REQUEST_MAIL_ADDRESS: &str = "419";
    pub(crate) const SALT_RESPONSE_SALT: &str = "420";
    pub(crate) const SALT_RESPONSE_KDF_VERSION: &str = "421";

    pub(crate) const SESSION_REQUEST_FORMAT: &str = "422";
    pub(crate) const SESSION_REQUEST_ACCESS_KEY: &str = "423";
    pub(crate) const SESSION_REQUEST_AUTH_TOKEN: &str = "424";
    pub(crate) const SESSION_REQUEST_AUTH_VERIFIER: &str = "425";
    pub(crate) const SESSION_REQUEST_CLIENT_IDENTIFIER: &str = "427";
    pub(crate) const SESSION_REQUEST_RECOVER_CODE_VERIFIER: &str = "430";
    pub(crate) const SESSION_REQUEST_USER: &str = "431";

    pub(crate) const SESSION_RESPONSE_ACCESS_TOKEN: &str = "432";
    pub(crate) const SESSION_RESPONSE_USER: &str = "433";
    pub(crate) const SESSION_RESPONSE_CHALLENGES: &str = "445";
}

const SALT_SERVICE_VERSION: &str = "1";
const SESSION_SERVICE_VERSION: &str = "3";

const SESSION_ID_PREFIX_LEN: usize = 9;

pub(crate) struct LoginResult {
    pub(crate) session: Session,
}

/// Normalizes an email address the way the salt request requires:
/// lower-cased, whitespace trimmed.
fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

/// Fetches the account salt and KDF version (step 1 of spec §4.E) and
/// derives the passphrase key from it. Reused both by the login protocol
/// and by the key-chain unlock path, which re-derives the same key on every
/// run since the derived key itself is never persisted (spec §3
/// Lifecycles).
pub(crate) async fn fetch_passphrase_key(client: &Client, email: &str, password: &str) -> Result<crate::model::keys::Key> {
    let mail_address = normalize_email(email);

    let salt_body = serde_json::json!({
        attrs::SALT_REQUEST_FORMAT: "0",
        attrs::SALT_REQUEST_MAIL_ADDRESS: mail_address,
    });
    let salt_resp: serde_json::Map<String, serde_json::Value> = client
        .get_with_body("sys/saltservice", &salt_body, SALT_SERVICE_VERSION, None)
        .await
        .context("fetch salt")?;

    let salt_b64 = salt_resp
        .get(attrs::SALT_RESPONSE_SALT)
        .and_then(|v| v.as_str())
        .context("salt response missing salt")?;
    let salt = crate::model::binary::normalize_bytes(&serde_json::Value::String(salt_b64.to_owned()))
        .context("decode salt")?;
    let kdf_version_text = salt_resp
        .get(attrs::SALT_RESPONSE_KDF_VERSION)
        .and_then(|v| v.as_str())
        .context("salt response missing kdfVersion")?;
    let kdf_version: KdfVersion =
        serde_json::from_value(serde_json::Value::String(kdf_version_text.to_owned()))
            .context("parse kdfVersion")?;

    derive_passphrase_key(password, &salt, kdf_version).context("derive passphrase key")
}

/// Runs the full login protocol against `base_url`.
pub(crate) async fn login(client: &Client, base_url: &str, email: &str, password: &str) -> Result<LoginResult> {
    let mail_address = normalize_email(email);

    let passphrase_key = fetch_passphrase_key(client, email, password).await?;
    let auth_verifier = build_auth_verifier(&passphrase_key);

    let session_body = serde_json::json!({
        attrs::SESSION_REQUEST_FORMAT: "0",
        attrs::SESSION_REQUEST_ACCESS_KEY: serde_json::Value::Null,
        attrs::SESSION_REQUEST_AUTH_TOKEN: serde_json::Value::Null,
        attrs::SESSION_REQUEST_AUTH_VERIFIER: auth_verifier,
        attrs::SESSION_REQUEST_CLIENT_IDENTIFIER: env!("CARGO_PKG_NAME"),
        attrs::SALT_REQUEST_MAIL_ADDRESS: mail_address,
        attrs::SESSION_REQUEST_RECOVER_CODE_VERIFIER: serde_json::Value::Null,
        attrs::SESSION_REQUEST_USER: serde_json::Value::Array(vec![]),
    });
    let session_resp: serde_json::Map<String, serde_json::Value> = client
        .post("sys/sessionservice", &session_body, SESSION_SERVICE_VERSION, None)
        .await
        .context("create session")?;

    let challenges = session_resp
        .get(attrs::SESSION_RESPONSE_CHALLENGES)
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();
    if !challenges.is_empty() {
        return Err(CoreError::TwoFactorRequired.into());
    }

    let access_token = session_resp
        .get(attrs::SESSION_RESPONSE_ACCESS_TOKEN)
        .and_then(|v| v.as_str())
        .context("session response missing accessToken")?
        .to_owned();
    let user_id = session_resp
        .get(attrs::SESSION_RESPONSE_USER)
        .and_then(|v| v.as_str())
        .context("session response missing user")?
        .to_owned();

    let session_id = session_id_from_access_token(&access_token).ok();

    Ok(LoginResult {
        session: Session {
            base_url: base_url.to_owned(),
            access_token,
            user_id,
            session_id,
        },
    })
}

/// Derives `(list_id, element_id)` from a base64url access token: the
/// first nine bytes become the list id (re-encoded in the base64-ext
/// alphabet), the remainder is SHA-256-hashed and the digest base64url
/// encoded to form the element id.
fn session_id_from_access_token(access_token: &str) -> Result<(String, String)> {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

    let bytes = URL_SAFE_NO_PAD
        .decode(access_token)
        .context("decode access token")?;
    if bytes.len() <= SESSION_ID_PREFIX_LEN {
        bail!("access token too short");
    }

    let list_id = Base64Ext::encode(&bytes[..SESSION_ID_PREFIX_LEN]);

    let mut hasher = Sha256::new();
    hasher.update(&bytes[SESSION_ID_PREFIX_LEN..]);
    let digest = hasher.finalize().to_vec();
    let element_id = URL_SAFE_NO_PAD.encode(digest);

    Ok((list_id, element_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email(" Alice@Example.COM "), "alice@example.com");
    }

    #[test]
    fn test_session_id_from_access_token_deterministic() {
        use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

        let mut raw = vec![0u8; SESSION_ID_PREFIX_LEN];
        raw.extend_from_slice(b"abc");
        let token = URL_SAFE_NO_PAD.encode(&raw);

        let (list_id, element_id) = session_id_from_access_token(&token).unwrap();
        let (list_id_2, element_id_2) = session_id_from_access_token(&token).unwrap();
        assert_eq!(list_id, list_id_2);
        assert_eq!(element_id, element_id_2);
        assert_eq!(list_id, "---------");

        let mut hasher = Sha256::new();
        hasher.update(b"abc");
        let expected_element_id = URL_SAFE_NO_PAD.encode(hasher.finalize());
        assert_eq!(element_id, expected_element_id);
    }

    #[test]
    fn test_session_id_rejects_short_token() {
        use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
        let token = URL_SAFE_NO_PAD.encode([0u8; 3]);
        assert!(session_id_from_access_token(&token).is_err());
    }
}
