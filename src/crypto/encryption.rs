//! The three AES decryption methods the session-key/attribute ladder tries,
//! generalized across both 128-bit and 256-bit keys. See spec §4.H for the
//! ordering in which a caller should attempt them.

use anyhow::{anyhow, bail, Context, Result};
use cbc::cipher::{
    block_padding::{NoPadding, Pkcs7},
    BlockDecryptMut, KeyIvInit,
};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256, Sha512};

type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;
type HmacSha256 = Hmac<Sha256>;

/// Fixed IV used by the key-wrap decrypt (method 1). Not secret; the
/// security of a key-wrap scheme does not depend on IV randomness.
const KEY_WRAP_IV: [u8; 16] = [136u8; 16];

/// Method 1: fixed-IV, no-padding AES-CBC "key wrap" decrypt. Valid for
/// both 16- and 32-byte keys.
pub(crate) fn decrypt_key_wrap(key: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
    match key.len() {
        16 => {
            let k: [u8; 16] = key.try_into().expect("checked length");
            Aes128CbcDec::new(&k.into(), &KEY_WRAP_IV.into())
                .decrypt_padded_vec_mut::<NoPadding>(ciphertext)
                .map_err(|e| anyhow!("{e}"))
                .context("AES-128 key-wrap decrypt")
        }
        32 => {
            let k: [u8; 32] = key.try_into().expect("checked length");
            Aes256CbcDec::new(&k.into(), &KEY_WRAP_IV.into())
                .decrypt_padded_vec_mut::<NoPadding>(ciphertext)
                .map_err(|e| anyhow!("{e}"))
                .context("AES-256 key-wrap decrypt")
        }
        n => bail!("invalid key length: {n}"),
    }
}

/// Method 2: "legacy" AES-CBC decrypt. IV is the first 16 bytes of the
/// ciphertext, Pkcs7-padded, no MAC. Valid for both 16- and 32-byte keys.
pub(crate) fn decrypt_legacy(key: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
    const IV_LEN: usize = 16;
    if ciphertext.len() < IV_LEN {
        bail!("IV missing");
    }
    let iv: [u8; IV_LEN] = ciphertext[..IV_LEN].try_into().expect("checked length");
    let payload = &ciphertext[IV_LEN..];

    match key.len() {
        16 => {
            let k: [u8; 16] = key.try_into().expect("checked length");
            Aes128CbcDec::new(&k.into(), &iv.into())
                .decrypt_padded_vec_mut::<Pkcs7>(payload)
                .map_err(|e| anyhow!("{e}"))
                .context("AES-128 legacy decrypt")
        }
        32 => {
            let k: [u8; 32] = key.try_into().expect("checked length");
            Aes256CbcDec::new(&k.into(), &iv.into())
                .decrypt_padded_vec_mut::<Pkcs7>(payload)
                .map_err(|e| anyhow!("{e}"))
                .context("AES-256 legacy decrypt")
        }
        n => bail!("invalid key length: {n}"),
    }
}

/// Method 3: authenticated AES-256-CBC decrypt. The 256-bit key is split
/// via SHA-512 into a cipher subkey and a MAC subkey; the ciphertext is
/// `[marker byte][IV][payload][HMAC-SHA256 tag]`. Only valid for 32-byte
/// keys.
pub(crate) fn decrypt_authenticated(key: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
    let k: [u8; 32] = key.try_into().context("invalid key length")?;
    let subkeys = Aes256Subkeys::from(k);

    const MAC_LEN: usize = 32;
    const IV_LEN: usize = 16;
    if ciphertext.len() < 1 + IV_LEN + MAC_LEN {
        bail!("ciphertext too short");
    }

    let payload_with_iv = &ciphertext[1..ciphertext.len() - MAC_LEN];
    let mac = &ciphertext[ciphertext.len() - MAC_LEN..];

    let mut m = HmacSha256::new_from_slice(&subkeys.mkey).expect("checked length");
    m.update(payload_with_iv);
    m.verify_slice(mac)
        .map_err(|e| anyhow!("{e}"))
        .context("HMAC verification")?;

    let iv: [u8; IV_LEN] = payload_with_iv[..IV_LEN].try_into().expect("checked length");
    let payload = &payload_with_iv[IV_LEN..];

    Aes256CbcDec::new(&subkeys.ckey.into(), &iv.into())
        .decrypt_padded_vec_mut::<Pkcs7>(payload)
        .map_err(|e| anyhow!("{e}"))
        .context("AES-256 authenticated decrypt")
}

struct Aes256Subkeys {
    ckey: [u8; 32],
    mkey: [u8; 32],
}

impl From<[u8; 32]> for Aes256Subkeys {
    fn from(k: [u8; 32]) -> Self {
        let mut hasher = Sha512::new();
        hasher.update(k);
        let hashed = hasher.finalize().to_vec();

        Self {
            ckey: hashed[..32].try_into().expect("checked length"),
            mkey: hashed[32..].try_into().expect("checked length"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decrypt_key_wrap_128() {
        assert_eq!(
            decrypt_key_wrap(
                &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16],
                &[10u8, 20, 30, 40, 50, 60, 70, 80, 90, 100, 110, 120, 130, 140, 150, 160]
            )
            .unwrap(),
            vec![177u8, 11, 11, 117, 32, 75, 2, 15, 107, 230, 248, 94, 26, 11, 143, 0],
        );
    }

    #[test]
    fn test_decrypt_authenticated() {
        let k = [
            163, 52, 230, 134, 76, 199, 13, 61, 124, 69, 58, 80, 3, 1, 198, 219, 215, 51, 42, 8,
            59, 76, 55, 188, 101, 165, 209, 167, 111, 205, 128, 60,
        ];

        let v = [
            1, 1, 221, 88, 186, 70, 178, 125, 28, 66, 245, 102, 7, 214, 121, 162, 88, 138, 118,
            208, 12, 173, 154, 251, 201, 68, 94, 254, 228, 178, 138, 73, 52, 118, 21, 143, 248,
            117, 32, 158, 29, 154, 194, 98, 55, 215, 5, 129, 18, 13, 32, 165, 44, 185, 129, 14, 78,
            146, 134, 10, 134, 81, 50, 252, 212,
        ];

        assert_eq!(decrypt_authenticated(&k, &v).unwrap(), b"fooooo".to_owned());

        let mut v_broken = v;
        v_broken[1] = 0;

        assert_eq!(
            decrypt_authenticated(&k, &v_broken).unwrap_err().to_string(),
            "HMAC verification",
        );
    }

    #[test]
    fn test_decrypt_authenticated_rejects_128_bit_key() {
        assert!(decrypt_authenticated(&[0u8; 16], &[0u8; 49]).is_err());
    }

    #[test]
    fn test_decrypt_legacy_too_short() {
        assert_eq!(
            decrypt_legacy(&[0u8; 16], &[0u8; 4]).unwrap_err().to_string(),
            "IV missing",
        );
    }
}
