//! Typed error kinds the core surfaces to its callers (spec §7).
//!
//! Most call sites stay on `anyhow::Result` + `.context(...)`; a `CoreError`
//! is constructed only at the points that need to match on a specific kind
//! (the auth orchestrator's 401-vs-network dispatch, the CLI's JSON error
//! output).

use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum CoreError {
    #[error("two-factor authentication is required but not supported")]
    TwoFactorRequired,

    #[error("authentication failed")]
    AuthFailed,

    #[error("network unavailable: {0}")]
    NetworkUnavailable(String),

    #[error("protocol mismatch: {0}")]
    ProtocolMismatch(String),

    #[error("key unavailable for group {group} version {version}")]
    KeyUnavailable { group: String, version: String },

    #[error("decrypt failure: {0}")]
    DecryptFailure(String),
}

impl CoreError {
    /// Classifies a transport-level failure as network-unavailable vs.
    /// auth-failed vs. something else, for the orchestrator's recovery
    /// decision (spec §4.L, §5 Cancellation/timeouts).
    pub(crate) fn from_reqwest(e: &reqwest::Error) -> Option<Self> {
        if e.is_connect() || e.is_timeout() || e.is_request() {
            Some(Self::NetworkUnavailable(e.to_string()))
        } else if e.status() == Some(reqwest::StatusCode::UNAUTHORIZED) {
            Some(Self::AuthFailed)
        } else {
            None
        }
    }
}
