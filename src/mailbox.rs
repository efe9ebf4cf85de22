//! The mailbox reader (spec §4.J): composes the key chain, former-key
//! walker, session-key decryptor and REST accessor into the
//! `MailboxGroupRoot → MailBox → MailSet list → MailSetEntry list → Mail`
//! walk, with bounded concurrency and the per-instance key-version retry
//! loop.

use std::cell::RefCell;
use std::collections::HashSet;

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};

use crate::constants::{GENERATED_MAX_ID, GENERATED_MIN_ID, MAIL_LIST_PAGE_SIZE, MAX_CONCURRENT_REQUESTS, MAIL_SET_PAGE_SIZE};
use crate::decrypt::{decrypt_instance, resolve_session_key, DecryptDiagnostics, NoopDiagnostics};
use crate::formerkeys;
use crate::keychain::KeyChain;
use crate::model::enums::FolderType;
use crate::model::registry::{assoc, MAIL, MAILBOX_GROUP_ROOT, MAIL_BOX, MAIL_SET, MAIL_SET_ENTRY};
use crate::rest::Rest;
use crate::wire::{attr_array, attr_object, attr_str, element_id, require_str, Instance};

/// Folder-type attribute id on `MailSet`. Not tabulated in spec §6 (which
/// only names the encrypted `name`/`color` attributes); assigned here and
/// noted as inferred in `DESIGN.md`. Carried in cleartext on the wire, so
/// it passes through `decrypt_instance` unchanged regardless of session
/// key availability.
const FOLDER_TYPE: &str = "1766";

#[derive(Debug, Clone)]
pub(crate) struct Folder {
    pub(crate) id: String,
    pub(crate) display_name: String,
}

#[derive(Debug, Clone)]
pub(crate) struct MailSummary {
    pub(crate) subject: Option<String>,
}

/// A sink recording which attributes failed decryption during one
/// `decrypt_instance` call, used by the version retry loop to detect an
/// "effective failure" without plumbing extra state through `decrypt.rs`.
#[derive(Default)]
struct FailureRecorder {
    failed: RefCell<HashSet<String>>,
}

impl DecryptDiagnostics for FailureRecorder {
    fn attribute_failed(&self, attribute_id: &str) {
        self.failed.borrow_mut().insert(attribute_id.to_owned());
    }
}

impl FailureRecorder {
    fn failed_any(&self, ids: &[&str]) -> bool {
        let failed = self.failed.borrow();
        ids.iter().any(|id| failed.contains(*id))
    }
}

/// Reads the mailbox id off the mail group's `MailboxGroupRoot`.
async fn load_mailbox_id(rest: &Rest<'_>, mail_group_id: &str) -> Result<String> {
    let root = rest
        .load_entity(&MAILBOX_GROUP_ROOT, mail_group_id)
        .await
        .context("load MailboxGroupRoot")?;
    require_str(&root, assoc::MAILBOX_GROUP_ROOT_MAILBOX, "MailboxGroupRoot.mailbox")
}

/// Reads the mail-sets list id off the decrypted `MailBox`.
async fn load_mail_sets_list_id(rest: &Rest<'_>, chain: &KeyChain, mailbox_id: &str) -> Result<String> {
    let wire = rest.load_entity(&MAIL_BOX, mailbox_id).await.context("load MailBox")?;
    let session_key = resolve_session_key(&MAIL_BOX, &wire, chain, None, &NoopDiagnostics);
    let decrypted = decrypt_instance(&MAIL_BOX, &wire, session_key.as_ref(), &NoopDiagnostics);

    let mail_set_ref = attr_object(&decrypted, assoc::MAIL_BOX_MAIL_SET_REF)
        .context("MailBox has no mailSets reference")?;
    let mail_set_ref = serde_json::Map::clone(mail_set_ref);
    require_str(&mail_set_ref, assoc::MAIL_SET_REF_LIST_ID, "MailSetRef.list")
}

/// Resolves the mail group's `MailSet` list id, the id `list_folders` and
/// `list_mails` both need to address the group's folders.
pub(crate) async fn mail_sets_list_id(rest: &Rest<'_>, chain: &KeyChain, mail_group_id: &str) -> Result<String> {
    let mailbox_id = load_mailbox_id(rest, mail_group_id).await?;
    load_mail_sets_list_id(rest, chain, &mailbox_id).await
}

/// Decrypts one `MailSet` element, retrying at other known key versions
/// when `name`/`color` decryption fails, per spec §4.H's per-instance
/// retry loop.
fn decrypt_mail_set_with_retry(chain: &KeyChain, mail_group_id: &str, wire: &Instance) -> Instance {
    let owner_key_version = MAIL_SET.owner.expect("MailSet is encrypted").owner_key_version;

    let mut candidates: Vec<String> = Vec::new();
    if let Some(v) = attr_str(wire, owner_key_version) {
        candidates.push(v.to_owned());
    }
    for v in chain.versions(mail_group_id) {
        if !candidates.contains(&v) {
            candidates.push(v);
        }
    }

    for version in &candidates {
        let recorder = FailureRecorder::default();
        let session_key = resolve_session_key(&MAIL_SET, wire, chain, Some(version), &recorder);
        if session_key.is_none() {
            continue;
        }
        let decrypted = decrypt_instance(&MAIL_SET, wire, session_key.as_ref(), &recorder);
        if !recorder.failed_any(&["435", "1479"]) {
            return decrypted;
        }
    }

    decrypt_instance(&MAIL_SET, wire, None, &NoopDiagnostics)
}

/// Substitutes the folder-type fallback name (spec §4.J step 4) when the
/// decrypted name is empty or whitespace-only.
fn folder_display_name(decrypted: &Instance, decrypted_name: &str) -> String {
    if !decrypted_name.trim().is_empty() {
        return decrypted_name.to_owned();
    }
    match attr_str(decrypted, FOLDER_TYPE).and_then(|s| FolderType::from_wire(s).ok()) {
        Some(ft) => ft.fallback_name().to_owned(),
        None => FolderType::NoName.fallback_name().to_owned(),
    }
}

/// Lists every folder in the mail group's mailbox (spec §4.J steps 1-4).
pub(crate) async fn list_folders(rest: &Rest<'_>, chain: &mut KeyChain, mail_group_id: &str) -> Result<Vec<Folder>> {
    let mail_sets_list_id = mail_sets_list_id(rest, chain, mail_group_id).await?;

    let elements = rest
        .load_range(&MAIL_SET, &mail_sets_list_id, GENERATED_MIN_ID, MAIL_SET_PAGE_SIZE, false)
        .await
        .context("load MailSet range")?;

    let owner_key_version = MAIL_SET.owner.expect("MailSet is encrypted").owner_key_version;
    let current_version = chain.current_version(mail_group_id).unwrap_or_default().to_owned();

    let mut seen_versions = HashSet::new();
    for element in &elements {
        if let Some(v) = attr_str(element, owner_key_version) {
            if v != current_version && seen_versions.insert(v.to_owned()) {
                let _ = formerkeys::walk_to_version(rest, chain, mail_group_id, &current_version, v).await;
            }
        }
    }

    let chain_ref: &KeyChain = &*chain;
    let folders = stream::iter(elements.into_iter())
        .map(|element| async move {
            let id = element_id(&element)?.to_owned();
            let decrypted = decrypt_mail_set_with_retry(chain_ref, mail_group_id, &element);
            let name = attr_str(&decrypted, "435").unwrap_or_default().to_owned();
            let display_name = folder_display_name(&decrypted, &name);
            Some(Folder { id, display_name })
        })
        .buffered(MAX_CONCURRENT_REQUESTS)
        .collect::<Vec<Option<Folder>>>()
        .await
        .into_iter()
        .flatten()
        .collect();

    Ok(folders)
}

/// Lists the most recent mails in a folder (spec §4.J step 5). `folder_id` is
/// the `MailSet`'s own element id, as exposed on [`Folder::id`]; its
/// entries-list (attribute `1459`) is resolved here rather than by the
/// caller.
pub(crate) async fn list_mails(
    rest: &Rest<'_>,
    chain: &KeyChain,
    mail_group_id: &str,
    mail_sets_list_id: &str,
    folder_id: &str,
) -> Result<Vec<MailSummary>> {
    let mail_set_wire = rest
        .load_entity_tuple(&MAIL_SET, mail_sets_list_id, folder_id)
        .await
        .context("load MailSet")?;
    let mail_set = decrypt_mail_set_with_retry(chain, mail_group_id, &mail_set_wire);
    let entries_list_id = require_str(&mail_set, assoc::MAIL_SET_ENTRIES_LIST, "MailSet.entries")?;

    let entries = rest
        .load_range(&MAIL_SET_ENTRY, &entries_list_id, GENERATED_MAX_ID, MAIL_LIST_PAGE_SIZE, true)
        .await
        .context("load MailSetEntry range")?;

    let mail_refs: Vec<(String, String)> = entries
        .iter()
        .filter_map(|entry| {
            let pair = attr_array(entry, assoc::MAIL_SET_ENTRY_MAIL_REF)?;
            let list_id = pair.first()?.as_str()?.to_owned();
            let element_id = pair.get(1)?.as_str()?.to_owned();
            Some((list_id, element_id))
        })
        .collect();

    let summaries = stream::iter(mail_refs.into_iter())
        .map(|(list_id, element_id)| async move {
            match rest.load_entity_tuple(&MAIL, &list_id, &element_id).await {
                Ok(wire) => {
                    let session_key = resolve_session_key(&MAIL, &wire, chain, None, &NoopDiagnostics);
                    let decrypted = decrypt_instance(&MAIL, &wire, session_key.as_ref(), &NoopDiagnostics);
                    let subject = attr_str(&decrypted, "105").map(str::to_owned);
                    MailSummary { subject }
                }
                Err(_) => MailSummary { subject: None },
            }
        })
        .buffered(MAX_CONCURRENT_REQUESTS)
        .collect::<Vec<_>>()
        .await;

    Ok(summaries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_folder_display_name_substitution() {
        let decrypted: Instance = serde_json::from_value(serde_json::json!({"1766": "2"})).unwrap();
        assert_eq!(folder_display_name(&decrypted, ""), "Sent");

        let decrypted: Instance = serde_json::from_value(serde_json::json!({"1766": "8"})).unwrap();
        assert_eq!(folder_display_name(&decrypted, ""), "Label (no name)");
    }

    #[test]
    fn test_folder_display_name_keeps_decrypted_name() {
        let decrypted: Instance = serde_json::from_value(serde_json::json!({"1766": "2"})).unwrap();
        assert_eq!(folder_display_name(&decrypted, "Work"), "Work");
    }
}
