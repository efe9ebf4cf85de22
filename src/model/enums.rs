use anyhow::Result;
use serde::{de::Error, Deserializer, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum KdfVersion {
    Bcrypt,
    Argon2id,
}

impl serde::Serialize for KdfVersion {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let s = match self {
            Self::Bcrypt => "0",
            Self::Argon2id => "1",
        };
        serializer.serialize_str(s)
    }
}

impl<'de> serde::Deserialize<'de> for KdfVersion {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        match s.as_str() {
            "0" => Ok(Self::Bcrypt),
            _ => Ok(Self::Argon2id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum GroupType {
    User,
    Admin,
    MailingList,
    Customer,
    External,
    Mail,
    Contact,
    File,
    LocalAdmin,
    Calendar,
    Template,
    ContactList,
}

impl GroupType {
    pub(crate) fn from_wire(s: &str) -> Result<Self> {
        match s {
            "0" => Ok(Self::User),
            "1" => Ok(Self::Admin),
            "2" => Ok(Self::MailingList),
            "3" => Ok(Self::Customer),
            "4" => Ok(Self::External),
            "5" => Ok(Self::Mail),
            "6" => Ok(Self::Contact),
            "7" => Ok(Self::File),
            "8" => Ok(Self::LocalAdmin),
            "9" => Ok(Self::Calendar),
            "10" => Ok(Self::Template),
            "11" => Ok(Self::ContactList),
            s => anyhow::bail!("invalid group type: {s}"),
        }
    }
}

impl serde::Serialize for GroupType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let s = match self {
            Self::User => "0",
            Self::Admin => "1",
            Self::MailingList => "2",
            Self::Customer => "3",
            Self::External => "4",
            Self::Mail => "5",
            Self::Contact => "6",
            Self::File => "7",
            Self::LocalAdmin => "8",
            Self::Calendar => "9",
            Self::Template => "10",
            Self::ContactList => "11",
        };
        serializer.serialize_str(s)
    }
}

impl<'de> serde::Deserialize<'de> for GroupType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_wire(&s).map_err(D::Error::custom)
    }
}

/// Folder kind, per the `folderType` attribute on `MailSet`.
///
/// Variants and numeric values come from spec §4.J step 4's substitution
/// table; `Custom`/`Label` cover everything without a fixed numeric slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum FolderType {
    NoName,
    Inbox,
    Sent,
    Trash,
    Archive,
    Spam,
    Draft,
    Label,
    Scheduled,
    Other(u32),
}

impl FolderType {
    pub(crate) fn from_wire(s: &str) -> Result<Self> {
        let n: u32 = s.parse().map_err(|_| anyhow::anyhow!("invalid folder type: {s}"))?;
        Ok(match n {
            0 => Self::NoName,
            1 => Self::Inbox,
            2 => Self::Sent,
            3 => Self::Trash,
            4 => Self::Archive,
            5 => Self::Spam,
            6 => Self::Draft,
            8 => Self::Label,
            10 => Self::Scheduled,
            other => Self::Other(other),
        })
    }

    /// Fallback display name used when the decrypted folder name is empty
    /// or whitespace-only (spec §4.J step 4).
    pub(crate) fn fallback_name(&self) -> &'static str {
        match self {
            Self::NoName => "(no name)",
            Self::Inbox => "Inbox",
            Self::Sent => "Sent",
            Self::Trash => "Trash",
            Self::Archive => "Archive",
            Self::Spam => "Spam",
            Self::Draft => "Draft",
            Self::Label => "Label (no name)",
            Self::Scheduled => "Scheduled",
            Self::Other(_) => "(no name)",
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::model::testing::assert_deser_error;

    use super::*;

    #[test]
    fn test_roundtrip_kdf_version() {
        assert_eq!(serde_json::to_string(&KdfVersion::Bcrypt).unwrap(), r#""0""#);
        assert_eq!(serde_json::to_string(&KdfVersion::Argon2id).unwrap(), r#""1""#);
        assert_eq!(
            serde_json::from_str::<KdfVersion>(r#""2""#).unwrap(),
            KdfVersion::Argon2id,
        );
    }

    #[test]
    fn test_roundtrip_group_type() {
        for (gt, n) in [
            (GroupType::User, "0"),
            (GroupType::Admin, "1"),
            (GroupType::MailingList, "2"),
            (GroupType::Customer, "3"),
            (GroupType::External, "4"),
            (GroupType::Mail, "5"),
            (GroupType::Contact, "6"),
            (GroupType::File, "7"),
            (GroupType::LocalAdmin, "8"),
            (GroupType::Calendar, "9"),
            (GroupType::Template, "10"),
            (GroupType::ContactList, "11"),
        ] {
            assert_eq!(serde_json::to_string(&gt).unwrap(), format!(r#""{n}""#));
            assert_eq!(GroupType::from_wire(n).unwrap(), gt);
        }

        assert_deser_error::<GroupType>(r#""20""#, "invalid group type: 20");
    }

    #[test]
    fn test_folder_type_fallback_names() {
        assert_eq!(FolderType::from_wire("2").unwrap().fallback_name(), "Sent");
        assert_eq!(FolderType::from_wire("8").unwrap().fallback_name(), "Label (no name)");
        assert_eq!(FolderType::from_wire("0").unwrap().fallback_name(), "(no name)");
        assert_eq!(FolderType::from_wire("10").unwrap().fallback_name(), "Scheduled");
    }
}
