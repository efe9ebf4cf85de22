//! Credential sourcing (spec §6 "Environment"): `TUTANOTA_EMAIL` and
//! `TUTANOTA_PASSWORD`, falling back to an interactive prompt when either is
//! missing. The password prompt is plain stdin with no echo suppression —
//! the retrieved example pack carries no crate for that, so this is a
//! CLI-layer limitation rather than a core one (see `SPEC_FULL.md` §A.3).

use std::io::Write;

use anyhow::{Context, Result};
use clap::Parser;

use crate::non_empty_string::NonEmptyString;

/// Credentials CLI config.
#[derive(Debug, Clone, Parser)]
pub(crate) struct CredentialsCLIConfig {
    /// Account email address. Prompted for if not set.
    #[clap(long, env = "TUTANOTA_EMAIL")]
    email: Option<NonEmptyString>,

    /// Account password. Prompted for if not set.
    #[clap(long, env = "TUTANOTA_PASSWORD")]
    password: Option<NonEmptyString>,
}

/// A resolved (email, password) pair.
#[derive(Clone)]
pub(crate) struct Credentials {
    pub(crate) email: String,
    pub(crate) password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Resolves credentials from the config, prompting on stdin for whichever
/// half is missing.
pub(crate) fn obtain(config: CredentialsCLIConfig) -> Result<Credentials> {
    let email = match config.email {
        Some(e) => e.to_string(),
        None => prompt_line("Email: ")?,
    };
    let password = match config.password {
        Some(p) => p.to_string(),
        None => prompt_line("Password: ")?,
    };
    Ok(Credentials { email, password })
}

fn prompt_line(label: &str) -> Result<String> {
    eprint!("{label}");
    std::io::stderr().flush().ok();
    let mut line = String::new();
    std::io::stdin().read_line(&mut line).context("read from stdin")?;
    Ok(line.trim().to_owned())
}
