//! Symmetric keys and the wire-encoded blobs that wrap them.
//!
//! The core treats keys opaquely apart from two things: their raw length in
//! bytes (16 = 128-bit, 32 = 256-bit) and the ability to derive a "128-bit
//! companion" by truncating a 256-bit key to its first 16 bytes. Both
//! widths must be retained side by side during decryption attempts, so a
//! `Key` never discards its original bytes in favor of the companion.

use anyhow::Result;
use std::ops::Deref;

#[derive(Clone, PartialEq, Eq)]
pub(crate) struct Key(Box<[u8]>);

impl Key {
    pub(crate) fn try_new(bytes: impl Into<Box<[u8]>>) -> Result<Self> {
        let bytes = bytes.into();
        match bytes.len() {
            16 | 32 => Ok(Self(bytes)),
            n => anyhow::bail!("invalid key length: {n}"),
        }
    }

    pub(crate) fn is_256_bit(&self) -> bool {
        self.0.len() == 32
    }

    /// Truncates a 256-bit key to its first 16 bytes. `None` for a key
    /// that is already 128-bit.
    pub(crate) fn companion_128(&self) -> Option<Self> {
        if self.0.len() == 32 {
            Some(Self(self.0[..16].into()))
        } else {
            None
        }
    }
}

impl std::fmt::Debug for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let bits = if self.0.len() == 32 { 256 } else { 128 };
        write!(f, "Key{bits}(")?;
        fmt_hex(&self.0, f)?;
        write!(f, ")")
    }
}

fn fmt_hex(v: &[u8], f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    for b in v {
        write!(f, "{:02x}", b)?;
    }
    Ok(())
}

impl AsRef<[u8]> for Key {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Deref for Key {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;

    #[test]
    fn test_key_companion() {
        let k256 = Key::try_new(vec![42u8; 32].into_boxed_slice()).unwrap();
        let companion = k256.companion_128().unwrap();
        assert_eq!(companion.len(), 16);
        assert!(companion.iter().all(|&b| b == 42));

        let k128 = Key::try_new(vec![7u8; 16].into_boxed_slice()).unwrap();
        assert!(k128.companion_128().is_none());

        assert!(Key::try_new(vec![1u8; 20].into_boxed_slice()).is_err());
    }

    #[test]
    fn test_key_debug() {
        assert_eq!(
            format!(
                "{:?}",
                Key::try_new(hex!("3556747514a3da176d423cf3153b27ba").to_vec().into_boxed_slice()).unwrap()
            ),
            "Key128(3556747514a3da176d423cf3153b27ba)",
        );
    }
}
