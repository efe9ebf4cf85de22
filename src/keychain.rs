//! Key chain: unlocks the user group key from the passphrase key, derives
//! the mail group key from the mail membership, and caches `(group,
//! version) -> Key` (spec §4.F).

use std::collections::HashMap;

use anyhow::{Context, Result};

use crate::crypto::encryption::decrypt_key_wrap;
use crate::model::enums::GroupType;
use crate::model::keys::Key;
use crate::wire::{attr_array, attr_bytes, attr_object, attr_str, Instance};

/// Attribute ids on `User.userGroup` (a `UserGroupMembership`
/// aggregation) and on each element of `User.memberships` (a
/// `GroupMembership`), per spec §8 scenario 4.
mod attrs {
    pub(crate) const USER_GROUP: &str = "95";
    pub(crate) const MEMBERSHIPS: &str = "96";
    pub(crate) const SYM_ENC_G_KEY: &str = "27";
    pub(crate) const GROUP: &str = "29";
    pub(crate) const GROUP_TYPE: &str = "1030";
    pub(crate) const GROUP_KEY_VERSION: &str = "2246";
}

#[derive(Debug, Clone)]
struct GroupKeyEntry {
    current_version: String,
    /// Insertion order matters for `versions()`; a handful of entries per
    /// group makes linear lookup the simpler choice over indexing.
    keys: Vec<(String, Key)>,
}

#[derive(Debug, Default)]
pub(crate) struct KeyChain {
    groups: HashMap<String, GroupKeyEntry>,
}

impl KeyChain {
    pub(crate) fn get(&self, group_id: &str, version: &str) -> Option<&Key> {
        self.groups
            .get(group_id)?
            .keys
            .iter()
            .find(|(v, _)| v == version)
            .map(|(_, k)| k)
    }

    pub(crate) fn insert(&mut self, group_id: &str, version: &str, key: Key) {
        let entry = self.groups.entry(group_id.to_owned()).or_insert_with(|| GroupKeyEntry {
            current_version: version.to_owned(),
            keys: Vec::new(),
        });
        if !entry.keys.iter().any(|(v, _)| v == version) {
            entry.keys.push((version.to_owned(), key));
        }
    }

    pub(crate) fn versions(&self, group_id: &str) -> Vec<String> {
        self.groups
            .get(group_id)
            .map(|e| e.keys.iter().map(|(v, _)| v.clone()).collect())
            .unwrap_or_default()
    }

    pub(crate) fn current_version(&self, group_id: &str) -> Option<&str> {
        self.groups.get(group_id).map(|e| e.current_version.as_str())
    }

    /// Unlocks the user group key from `passphrase_key`, then the mail
    /// group key (if the user has a mail membership) from the
    /// just-unlocked user group key. Returns the chain plus the mail
    /// group's id, if any, so the mailbox reader knows which group to read.
    pub(crate) fn unlock(passphrase_key: &Key, user: &Instance) -> Result<(Self, Option<String>)> {
        let mut chain = Self::default();

        let user_group = attr_object(user, attrs::USER_GROUP).context("missing userGroup")?;
        let user_group = serde_json::Map::clone(user_group);
        let wrapped = attr_bytes(&user_group, attrs::SYM_ENC_G_KEY)
            .context("missing userGroup.symEncGKey")??;
        let group_id = attr_str(&user_group, attrs::GROUP)
            .context("missing userGroup.group")?
            .to_owned();
        let version = attr_str(&user_group, attrs::GROUP_KEY_VERSION)
            .context("missing userGroup.groupKeyVersion")?
            .to_owned();

        let user_group_key = unwrap_group_key(passphrase_key, &wrapped)
            .context("unwrap user group key")?;
        chain.insert(&group_id, &version, user_group_key.clone());

        let mut mail_group_id = None;
        if let Some(mail_membership) = mail_membership(user)? {
            let wrapped = attr_bytes(&mail_membership, attrs::SYM_ENC_G_KEY)
                .context("missing membership.symEncGKey")??;
            let group_id = attr_str(&mail_membership, attrs::GROUP)
                .context("missing membership.group")?
                .to_owned();
            let version = attr_str(&mail_membership, attrs::GROUP_KEY_VERSION)
                .context("missing membership.groupKeyVersion")?
                .to_owned();

            let mail_group_key = unwrap_group_key(&user_group_key, &wrapped)
                .context("unwrap mail group key")?;
            chain.insert(&group_id, &version, mail_group_key);
            mail_group_id = Some(group_id);
        }

        Ok((chain, mail_group_id))
    }
}

/// Finds the `Mail` (`groupType == "5"`) membership, if any.
fn mail_membership(user: &Instance) -> Result<Option<Instance>> {
    let Some(memberships) = attr_array(user, attrs::MEMBERSHIPS) else {
        return Ok(None);
    };

    for m in memberships {
        let Some(m) = m.as_object() else { continue };
        let m = serde_json::Map::clone(m);
        let Some(group_type) = attr_str(&m, attrs::GROUP_TYPE) else {
            continue;
        };
        if GroupType::from_wire(group_type)? == GroupType::Mail {
            return Ok(Some(m));
        }
    }

    Ok(None)
}

/// The 128-bit/256-bit two-step unwrap dance (spec §4.F): a legacy
/// account may have a 128-bit key server-side while this client derived a
/// wider key, so a wider wrapping key retries truncated-then-full.
fn unwrap_group_key(wrapping_key: &Key, wrapped: &[u8]) -> Result<Key> {
    if wrapping_key.is_256_bit() {
        let companion = wrapping_key.companion_128().expect("256-bit key has a companion");
        if let Ok(bytes) = decrypt_key_wrap(&companion, wrapped) {
            if let Ok(key) = Key::try_new(bytes.into_boxed_slice()) {
                return Ok(key);
            }
        }
        let bytes = decrypt_key_wrap(wrapping_key, wrapped).context("decrypt group key")?;
        Key::try_new(bytes.into_boxed_slice())
    } else {
        let bytes = decrypt_key_wrap(wrapping_key, wrapped).context("decrypt group key")?;
        Key::try_new(bytes.into_boxed_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get() {
        let mut chain = KeyChain::default();
        let key = Key::try_new(vec![1u8; 16].into_boxed_slice()).unwrap();
        chain.insert("g1", "0", key.clone());
        assert_eq!(chain.get("g1", "0").unwrap().as_ref(), key.as_ref());
        assert!(chain.get("g1", "1").is_none());
        assert!(chain.get("g2", "0").is_none());
    }

    #[test]
    fn test_versions_insertion_order() {
        let mut chain = KeyChain::default();
        let k = |b: u8| Key::try_new(vec![b; 16].into_boxed_slice()).unwrap();
        chain.insert("g1", "3", k(1));
        chain.insert("g1", "2", k(2));
        chain.insert("g1", "1", k(3));
        assert_eq!(chain.versions("g1"), vec!["3", "2", "1"]);
    }

    #[test]
    fn test_mail_membership_lookup() {
        let user: Instance = serde_json::from_value(serde_json::json!({
            "95": {"27": "AAAAAAAAAAAAAAAAAAAAAA==", "29": "ug", "2246": "1", "2247": "0"},
            "96": [
                {"27": "AAAAAAAAAAAAAAAAAAAAAA==", "29": "mail-g", "1030": "5", "2246": "1", "2247": "0"},
                {"27": "AAAAAAAAAAAAAAAAAAAAAA==", "29": "x", "1030": "4", "2246": "1", "2247": "0"},
            ]
        }))
        .unwrap();

        let m = mail_membership(&user).unwrap().unwrap();
        assert_eq!(attr_str(&m, attrs::GROUP), Some("mail-g"));
    }

    #[test]
    fn test_unlock_plants_user_and_mail_group_keys() {
        // Same key-wrap test vector as crypto::encryption::test_decrypt_key_wrap_128.
        let passphrase_key =
            Key::try_new(vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16].into_boxed_slice())
                .unwrap();
        let wrapped = "ChQeKDI8RlBaZG54goyWoA==";

        let user: Instance = serde_json::from_value(serde_json::json!({
            "95": {"27": wrapped, "29": "ug", "2246": "7"},
            "96": [
                {"27": wrapped, "29": "mail-g", "1030": "5", "2246": "3"},
            ],
        }))
        .unwrap();

        let (chain, mail_group_id) = KeyChain::unlock(&passphrase_key, &user).unwrap();
        assert_eq!(mail_group_id.as_deref(), Some("mail-g"));
        assert!(chain.get("ug", "7").is_some());
        assert!(chain.get("mail-g", "3").is_some());
        assert_eq!(chain.current_version("ug"), Some("7"));
    }
}
