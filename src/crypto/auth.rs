//! Passphrase key derivation and the auth verifier built from it.

use anyhow::{Context, Result};
use argon2::{Algorithm, Argon2, Params, Version};
use sha2::{Digest, Sha256};

use crate::model::{binary::Base64Url, enums::KdfVersion, keys::Key};

const ARGON2ID_TIME_COST: u32 = 4;
const ARGON2ID_MEMORY_COST_KIB: u32 = 32 * 1024;
const ARGON2ID_PARALLELISM: u32 = 1;
const ARGON2ID_OUTPUT_LEN: usize = 32;

/// Derives the passphrase key from a (passphrase, salt, kdf-version)
/// triple. `kdf_version == Bcrypt` produces a 128-bit key; any other
/// version uses Argon2id with fixed parameters and a 32-byte raw output.
pub(crate) fn derive_passphrase_key(
    passphrase: &str,
    salt: &[u8],
    kdf_version: KdfVersion,
) -> Result<Key> {
    let bytes = match kdf_version {
        KdfVersion::Bcrypt => derive_bcrypt(passphrase, salt)?,
        KdfVersion::Argon2id => derive_argon2id(passphrase, salt)?,
    };
    Key::try_new(bytes.into_boxed_slice())
}

fn derive_bcrypt(passphrase: &str, salt: &[u8]) -> Result<Vec<u8>> {
    let mut hasher = Sha256::new();
    hasher.update(passphrase.as_bytes());
    let passphrase_digest = hasher.finalize();

    let salt: [u8; 16] = salt.try_into().context("bcrypt salt must be 16 bytes")?;
    let hashed = bcrypt::bcrypt(8, salt, &passphrase_digest);
    Ok(hashed[..16].to_vec())
}

fn derive_argon2id(passphrase: &str, salt: &[u8]) -> Result<Vec<u8>> {
    let params = Params::new(
        ARGON2ID_MEMORY_COST_KIB,
        ARGON2ID_TIME_COST,
        ARGON2ID_PARALLELISM,
        Some(ARGON2ID_OUTPUT_LEN),
    )
    .map_err(|e| anyhow::anyhow!("{e}"))
    .context("build Argon2id params")?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut out = [0u8; ARGON2ID_OUTPUT_LEN];
    argon2
        .hash_password_into(passphrase.as_bytes(), salt, &mut out)
        .map_err(|e| anyhow::anyhow!("{e}"))
        .context("Argon2id derivation")?;
    Ok(out.to_vec())
}

/// Builds the auth verifier proving knowledge of the passphrase: a
/// base64url digest of the derived passphrase key.
pub(crate) fn build_auth_verifier(passphrase_key: &Key) -> String {
    let mut hasher = Sha256::new();
    hasher.update(passphrase_key.as_ref());
    let digest = hasher.finalize().to_vec();
    Base64Url::from(digest).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_bcrypt_and_verifier() {
        let key =
            derive_passphrase_key("password", b"saltsaltsaltsalt", KdfVersion::Bcrypt).unwrap();
        assert_eq!(key.len(), 16);
        assert_eq!(
            build_auth_verifier(&key),
            "r3YdONamUCQ7yFZwPFX8KLWZ4kKnAZLyt7rwi1DCE1I",
        );
    }

    #[test]
    fn test_derive_argon2id_produces_32_bytes() {
        let key =
            derive_passphrase_key("password", b"saltsaltsaltsalt", KdfVersion::Argon2id).unwrap();
        assert_eq!(key.len(), 32);
    }

    #[test]
    fn test_derive_argon2id_deterministic() {
        let a = derive_passphrase_key("hunter2", b"0123456789abcdef", KdfVersion::Argon2id).unwrap();
        let b = derive_passphrase_key("hunter2", b"0123456789abcdef", KdfVersion::Argon2id).unwrap();
        assert_eq!(a.as_ref(), b.as_ref());
    }
}
