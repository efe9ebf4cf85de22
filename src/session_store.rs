//! Local session persistence (spec §6 "Persistence layout"): path
//! resolution, file/directory permissions, and the environment-variable
//! opt-out.

use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::debug;

use crate::session::Session;

const FILE_MODE: u32 = 0o600;
const DIR_MODE: u32 = 0o700;

fn is_persistence_disabled() -> bool {
    std::env::var("TUTANOTA_NO_SESSION_PERSISTENCE")
        .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

fn session_path() -> Result<PathBuf> {
    let config_home = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|_| std::env::var("HOME").map(|h| PathBuf::from(h).join(".config")))
        .context("cannot resolve config directory: neither XDG_CONFIG_HOME nor HOME is set")?;
    Ok(config_home.join("tutanota-cli").join("session.json"))
}

/// Reads the persisted session. Returns `Ok(None)` if persistence is
/// disabled or no session file exists.
pub(crate) async fn load() -> Result<Option<Session>> {
    if is_persistence_disabled() {
        debug!("session persistence disabled, skipping load");
        return Ok(None);
    }

    let path = session_path()?;
    match tokio::fs::read(&path).await {
        Ok(bytes) => {
            let session = serde_json::from_slice(&bytes).context("parse session file")?;
            Ok(Some(session))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).context("read session file"),
    }
}

/// Persists a session, creating the parent directory (mode 0700) and
/// writing the file (mode 0600) if needed. A no-op if persistence is
/// disabled.
pub(crate) async fn save(session: &Session) -> Result<()> {
    if is_persistence_disabled() {
        debug!("session persistence disabled, skipping save");
        return Ok(());
    }

    let path = session_path()?;
    let dir = path.parent().context("session path has no parent")?;

    tokio::fs::create_dir_all(dir).await.context("create session directory")?;
    tokio::fs::set_permissions(dir, std::fs::Permissions::from_mode(DIR_MODE))
        .await
        .context("set session directory permissions")?;

    let json = serde_json::to_vec_pretty(session).context("serialize session")?;
    tokio::fs::write(&path, json).await.context("write session file")?;
    tokio::fs::set_permissions(&path, std::fs::Permissions::from_mode(FILE_MODE))
        .await
        .context("set session file permissions")?;

    Ok(())
}

/// Deletes the persisted session file, if any.
pub(crate) async fn clear() -> Result<()> {
    let path = session_path()?;
    match tokio::fs::remove_file(&path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).context("remove session file"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persistence_disabled_values() {
        std::env::set_var("TUTANOTA_NO_SESSION_PERSISTENCE", "yes");
        assert!(is_persistence_disabled());
        std::env::set_var("TUTANOTA_NO_SESSION_PERSISTENCE", "0");
        assert!(!is_persistence_disabled());
        std::env::remove_var("TUTANOTA_NO_SESSION_PERSISTENCE");
        assert!(!is_persistence_disabled());
    }
}
