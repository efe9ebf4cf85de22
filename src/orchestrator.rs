//! The auth orchestrator (spec §4.L): validates a persisted session against
//! an authenticated probe endpoint, falling back to credential prompt plus
//! the login protocol when no session is persisted or the probe fails.
//! Also composes the key-chain unlock (spec §4.F) on top of a live session,
//! and implements the "clear session, log in again, retry once" rule for a
//! `401` encountered anywhere in a command (spec §5 Cancellation).

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::client::Client;
use crate::constants::SYS_SERVICE_VERSION;
use crate::credentials::Credentials;
use crate::error::CoreError;
use crate::keychain::KeyChain;
use crate::login;
use crate::model::registry::USER;
use crate::rest::Rest;
use crate::session::Session;
use crate::session_store;

/// Loads an authenticated endpoint cheap enough to use purely as a
/// liveness/validity probe (spec §4.L: "the system-keys endpoint is
/// adequate").
async fn probe(client: &Client, access_token: &str) -> Result<()> {
    let _: serde_json::Value = client
        .get("sys/systemkeysservice", SYS_SERVICE_VERSION, Some(access_token))
        .await?;
    Ok(())
}

/// Get-or-create a session: reuse a persisted, still-valid session; else
/// obtain credentials and log in fresh, persisting the result.
///
/// `obtain_credentials` is called lazily, only when a fresh login is
/// actually needed, so a command that merely checks session validity
/// doesn't prompt for a password it won't use.
pub(crate) async fn get_or_create_session<F>(
    client: &Client,
    base_url: &str,
    obtain_credentials: F,
) -> Result<Session>
where
    F: FnOnce() -> Result<Credentials>,
{
    if let Some(session) = session_store::load().await? {
        match probe(client, &session.access_token).await {
            Ok(()) => {
                debug!("reusing persisted session");
                return Ok(session);
            }
            Err(e) => {
                match e.downcast_ref::<CoreError>() {
                    Some(CoreError::NetworkUnavailable(cause)) => {
                        warn!(%cause, "persisted session probe failed: network unavailable")
                    }
                    Some(CoreError::AuthFailed) => {
                        warn!("persisted session probe failed: authentication rejected")
                    }
                    _ => warn!(%e, "persisted session probe failed"),
                }
                session_store::clear().await.ok();
            }
        }
    }

    let credentials = obtain_credentials()?;
    let result = login::login(client, base_url, &credentials.email, &credentials.password).await?;
    session_store::save(&result.session).await?;
    Ok(result.session)
}

/// Unlocks the key chain for an already-established session: re-derives the
/// passphrase key (never persisted, spec §3 Lifecycles), loads the
/// authenticated `User` entity, and runs spec §4.F's unlock. Returns the
/// chain plus the mail group id, if the user has a mail membership.
pub(crate) async fn unlock_key_chain(
    client: &Client,
    session: &Session,
    credentials: &Credentials,
) -> Result<(KeyChain, Option<String>)> {
    let passphrase_key = login::fetch_passphrase_key(client, &credentials.email, &credentials.password)
        .await
        .context("derive passphrase key")?;

    let rest = Rest::new(client, &session.access_token);
    let user = rest
        .load_entity(&USER, &session.user_id)
        .await
        .context("load User")?;

    KeyChain::unlock(&passphrase_key, &user).context("unlock key chain")
}

/// Runs `body` once; if it fails with [`CoreError::AuthFailed`], clears the
/// persisted session and retries exactly once. A second `401` is fatal
/// (spec §5).
pub(crate) async fn run_with_auth_retry<F, Fut, T>(mut body: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    match body().await {
        Ok(v) => Ok(v),
        Err(e) if matches!(e.downcast_ref::<CoreError>(), Some(CoreError::AuthFailed)) => {
            warn!("authentication rejected, clearing session and retrying once");
            session_store::clear().await.ok();
            body().await
        }
        Err(e) => Err(e),
    }
}
