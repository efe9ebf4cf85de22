use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use client::Client;
use constants::DEFAULT_API_URL;
use credentials::CredentialsCLIConfig;
use logging::{setup_logging, LoggingCLIConfig};
use rest::Rest;
use signal::FutureSignalExt;

mod client;
mod constants;
mod credentials;
mod crypto;
mod decrypt;
mod error;
mod formerkeys;
mod keychain;
mod logging;
mod login;
mod mailbox;
mod model;
mod non_empty_string;
mod orchestrator;
mod rest;
mod retry;
mod session;
mod session_store;
mod signal;
mod wire;

/// CLI args.
#[derive(Debug, Parser)]
struct Args {
    /// Logging config.
    #[clap(flatten)]
    logging_cfg: LoggingCLIConfig,

    /// Base URL of the mail service.
    #[clap(long, env = "TUTANOTA_API_URL", default_value_t = DEFAULT_API_URL.to_owned())]
    base_url: String,

    /// Credentials config.
    #[clap(flatten)]
    credentials_cfg: CredentialsCLIConfig,

    /// Command
    #[clap(subcommand)]
    command: Command,
}

/// Command
#[derive(Debug, Subcommand)]
enum Command {
    /// Session management.
    #[clap(subcommand)]
    Auth(AuthCommand),

    /// Print the authenticated user's profile.
    Profile {
        /// Emit machine-readable JSON instead of plain text.
        #[clap(long)]
        json: bool,
    },

    /// Mailbox folders.
    #[clap(subcommand)]
    Folders(FoldersCommand),

    /// Mail listing.
    #[clap(subcommand)]
    Mails(MailsCommand),
}

#[derive(Debug, Subcommand)]
enum AuthCommand {
    /// Verify (and establish, if needed) a session.
    Check {
        /// Emit machine-readable JSON instead of plain text.
        #[clap(long)]
        json: bool,
    },
    /// Discard the persisted session.
    Logout,
}

#[derive(Debug, Subcommand)]
enum FoldersCommand {
    /// List the mailbox's folders.
    List {
        /// Emit machine-readable JSON instead of plain text.
        #[clap(long)]
        json: bool,
    },
}

#[derive(Debug, Subcommand)]
enum MailsCommand {
    /// List the most recent mails in a folder.
    List {
        /// Folder id, as printed by `folders list`.
        folder_id: String,

        /// Emit machine-readable JSON instead of plain text.
        #[clap(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    setup_logging(args.logging_cfg).context("logging setup")?;

    let client = Client::try_new(args.base_url.clone()).context("build HTTP client")?;

    run(&client, &args.base_url, args.credentials_cfg, args.command)
        .cancel_on_signal()
        .await
}

async fn run(
    client: &Client,
    base_url: &str,
    credentials_cfg: CredentialsCLIConfig,
    command: Command,
) -> Result<()> {
    match command {
        Command::Auth(AuthCommand::Check { json }) => cmd_auth_check(client, base_url, credentials_cfg, json).await,
        Command::Auth(AuthCommand::Logout) => cmd_auth_logout().await,
        Command::Profile { json } => cmd_profile(client, base_url, credentials_cfg, json).await,
        Command::Folders(FoldersCommand::List { json }) => {
            cmd_folders_list(client, base_url, credentials_cfg, json).await
        }
        Command::Mails(MailsCommand::List { folder_id, json }) => {
            cmd_mails_list(client, base_url, credentials_cfg, &folder_id, json).await
        }
    }
}

/// Re-runs `get_or_create_session` with the 401-retry-once rule, lazily
/// prompting for credentials only on the path that actually needs a fresh
/// login (a reused persisted session never touches `credentials_cfg`).
async fn obtain_session(
    client: &Client,
    base_url: &str,
    credentials_cfg: &CredentialsCLIConfig,
) -> Result<session::Session> {
    orchestrator::run_with_auth_retry(|| {
        let cfg = credentials_cfg.clone();
        orchestrator::get_or_create_session(client, base_url, move || credentials::obtain(cfg))
    })
    .await
}

async fn cmd_auth_check(
    client: &Client,
    base_url: &str,
    credentials_cfg: CredentialsCLIConfig,
    json: bool,
) -> Result<()> {
    match obtain_session(client, base_url, &credentials_cfg).await {
        Ok(session) => {
            if json {
                let session_id = session.session_id.clone().map(|(list, elem)| [list, elem]);
                println!(
                    "{}",
                    serde_json::json!({"ok": true, "userId": session.user_id, "sessionId": session_id})
                );
            } else {
                println!("ok (user {})", session.user_id);
            }
            Ok(())
        }
        Err(e) => {
            if json {
                println!("{}", serde_json::json!({"ok": false, "error": e.to_string()}));
                std::process::exit(1);
            }
            Err(e).context("auth check")
        }
    }
}

async fn cmd_auth_logout() -> Result<()> {
    session_store::clear().await.context("clear session")?;
    println!("logged out");
    Ok(())
}

async fn cmd_profile(
    client: &Client,
    base_url: &str,
    credentials_cfg: CredentialsCLIConfig,
    json: bool,
) -> Result<()> {
    let credentials = credentials::obtain(credentials_cfg)?;
    let session = obtain_session_with_credentials(client, base_url, &credentials).await?;
    let (_chain, mail_group_id) = orchestrator::unlock_key_chain(client, &session, &credentials).await?;

    if json {
        println!(
            "{}",
            serde_json::json!({"userId": session.user_id, "mailGroupId": mail_group_id})
        );
    } else {
        println!("user: {}", session.user_id);
        match &mail_group_id {
            Some(g) => println!("mail group: {g}"),
            None => println!("mail group: (none)"),
        }
    }
    Ok(())
}

async fn cmd_folders_list(
    client: &Client,
    base_url: &str,
    credentials_cfg: CredentialsCLIConfig,
    json: bool,
) -> Result<()> {
    let credentials = credentials::obtain(credentials_cfg)?;
    let session = obtain_session_with_credentials(client, base_url, &credentials).await?;
    let (mut chain, mail_group_id) = orchestrator::unlock_key_chain(client, &session, &credentials).await?;
    let mail_group_id = mail_group_id.context("account has no mail membership")?;

    let rest = Rest::new(client, &session.access_token);
    let folders = mailbox::list_folders(&rest, &mut chain, &mail_group_id)
        .await
        .context("list folders")?;

    if json {
        let names: Vec<&str> = folders.iter().map(|f| f.display_name.as_str()).collect();
        println!("{}", serde_json::to_string(&names)?);
    } else {
        for folder in &folders {
            println!("{}\t{}", folder.id, folder.display_name);
        }
    }
    Ok(())
}

async fn cmd_mails_list(
    client: &Client,
    base_url: &str,
    credentials_cfg: CredentialsCLIConfig,
    folder_id: &str,
    json: bool,
) -> Result<()> {
    let credentials = credentials::obtain(credentials_cfg)?;
    let session = obtain_session_with_credentials(client, base_url, &credentials).await?;
    let (chain, mail_group_id) = orchestrator::unlock_key_chain(client, &session, &credentials).await?;
    let mail_group_id = mail_group_id.context("account has no mail membership")?;

    let rest = Rest::new(client, &session.access_token);
    let mail_sets_list_id = mailbox::mail_sets_list_id(&rest, &chain, &mail_group_id)
        .await
        .context("resolve mail sets")?;

    let mails = mailbox::list_mails(&rest, &chain, &mail_group_id, &mail_sets_list_id, folder_id)
        .await
        .with_context(|| format!("no such folder: {folder_id}"))?;

    if json {
        let subjects: Vec<Option<&str>> = mails.iter().map(|m| m.subject.as_deref()).collect();
        println!("{}", serde_json::to_string(&subjects)?);
    } else {
        for mail in &mails {
            println!("{}", mail.subject.as_deref().unwrap_or("(decryption failed)"));
        }
    }
    Ok(())
}

/// Like [`obtain_session`], but for commands that already resolved
/// credentials eagerly (they need them again for the key-chain unlock), so
/// the login fallback just clones the already-resolved pair instead of
/// prompting a second time.
async fn obtain_session_with_credentials(
    client: &Client,
    base_url: &str,
    credentials: &credentials::Credentials,
) -> Result<session::Session> {
    orchestrator::run_with_auth_retry(|| {
        let creds = credentials.clone();
        orchestrator::get_or_create_session(client, base_url, move || Ok(creds))
    })
    .await
}
