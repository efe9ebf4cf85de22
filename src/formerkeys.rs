//! Former-key walker: given a group and a target (older) key version,
//! walks the group's former-key list from the current version downward,
//! decrypting each link with the next-newer key (spec §4.G).
//!
//! `Group`/`GroupKey` attribute ids are not tabulated in spec §6 (which
//! only lists app/version/encrypted for these two types); the ids below
//! are assigned here and noted as inferred in `DESIGN.md`.

use anyhow::{Context, Result};

use crate::crypto::encryption::decrypt_key_wrap;
use crate::keychain::KeyChain;
use crate::model::binary::custom_id_from_decimal_text;
use crate::model::keys::Key;
use crate::model::registry::{GROUP, GROUP_KEY};
use crate::rest::Rest;
use crate::wire::{attr_bytes, attr_object, attr_str};

mod attrs {
    /// `Group` -> single-element-array-wrapped aggregation carrying the
    /// former-keys list id.
    pub(crate) const GROUP_FORMER_GROUP_KEYS: &str = "827";
    /// Inner aggregation -> the former-keys list id.
    pub(crate) const FORMER_GROUP_KEYS_LIST: &str = "828";
    /// `GroupKey` -> the group key at this version, wrapped under the
    /// next-newer version's key.
    pub(crate) const GROUP_KEY_OWNER_ENC_G_KEY: &str = "830";
}

/// Walks a group's former-key chain from `current_version` down to
/// `target_version`, inserting every version encountered into `chain`.
/// Returns the key at `target_version`, or `None` if the chain could not
/// be fully decrypted.
pub(crate) async fn walk_to_version(
    rest: &Rest<'_>,
    chain: &mut KeyChain,
    group_id: &str,
    current_version: &str,
    target_version: &str,
) -> Result<Option<Key>> {
    let current: u64 = current_version.parse().context("parse current version")?;
    let target: u64 = target_version.parse().context("parse target version")?;

    if current <= target {
        return Ok(chain.get(group_id, target_version).cloned());
    }

    let group = rest.load_entity(&GROUP, group_id).await.context("load Group")?;
    let former_keys_ref = attr_object(&group, attrs::GROUP_FORMER_GROUP_KEYS)
        .context("Group has no former-keys reference")?;
    let former_keys_ref = serde_json::Map::clone(former_keys_ref);
    let list_id = attr_str(&former_keys_ref, attrs::FORMER_GROUP_KEYS_LIST)
        .context("former-keys reference has no list id")?
        .to_owned();

    let start = custom_id_from_decimal_text(current_version);
    let count = (current - target) as usize;
    let links = rest
        .load_range(&GROUP_KEY, &list_id, &start, count, true)
        .await
        .context("load former-keys range")?;

    let mut current_key = match chain.get(group_id, current_version) {
        Some(k) => k.clone(),
        None => return Ok(None),
    };
    let mut version = current;

    for link in &links {
        let Some(wrapped) = attr_bytes(link, attrs::GROUP_KEY_OWNER_ENC_G_KEY) else {
            return Ok(None);
        };
        let Ok(wrapped) = wrapped else { return Ok(None) };

        let Ok(bytes) = decrypt_key_wrap(&current_key, &wrapped) else {
            return Ok(None);
        };
        let Ok(next_key) = Key::try_new(bytes.into_boxed_slice()) else {
            return Ok(None);
        };

        version -= 1;
        current_key = next_key;
        chain.insert(group_id, &version.to_string(), current_key.clone());
    }

    if version != target {
        return Ok(None);
    }

    Ok(Some(current_key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_parsing_boundary() {
        assert_eq!("5".parse::<u64>().unwrap(), 5);
    }
}
