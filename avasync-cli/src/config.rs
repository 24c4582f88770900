//! Turns parsed arguments into a validated run configuration.
//!
//! Everything that can be rejected without touching the network is rejected
//! here: malformed URLs, a malformed MD5 override, missing credentials that
//! cannot be prompted for.

use std::io::{self, BufRead, IsTerminal, Write};

use anyhow::{bail, Context, Result};
use url::Url;

use avasync_core::{Credentials, PlatformKind, UserId};
use avasync_sync::{SyncOptions, Targets};

use crate::Cli;

/// Interactive source of missing credentials.
pub trait Prompt {
    fn username(&mut self, label: &str) -> io::Result<String>;
    fn password(&mut self, label: &str) -> io::Result<String>;
}

/// Reads from the controlling terminal. Passwords are not echoed.
pub struct TerminalPrompt;

impl TerminalPrompt {
    fn ensure_interactive() -> io::Result<()> {
        if io::stdin().is_terminal() {
            Ok(())
        } else {
            Err(io::Error::new(
                io::ErrorKind::Other,
                "stdin is not a terminal",
            ))
        }
    }
}

impl Prompt for TerminalPrompt {
    fn username(&mut self, label: &str) -> io::Result<String> {
        Self::ensure_interactive()?;
        eprint!("{label}: ");
        io::stderr().flush()?;
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok(line.trim().to_string())
    }

    fn password(&mut self, label: &str) -> io::Result<String> {
        Self::ensure_interactive()?;
        rpassword::prompt_password(format!("{label}: "))
    }
}

/// Everything a run needs, resolved and validated.
#[derive(Debug)]
pub struct RunConfig {
    pub platform: PlatformKind,
    pub destination_url: String,
    pub source_url: String,
    pub destination_credentials: Credentials,
    pub source_credentials: Credentials,
    pub options: SyncOptions,
    pub targets: Targets,
    pub bitbucket_default_md5: Option<String>,
}

impl RunConfig {
    /// Validate `cli` and fill in missing credentials through `prompt`.
    ///
    /// Destination credentials are asked for before source credentials.
    pub fn resolve(cli: Cli, prompt: &mut dyn Prompt) -> Result<Self> {
        let platform = PlatformKind::from(cli.platform);
        let destination_url = validate_url("destination", &cli.dest_url)?;
        let source_url = validate_url("source", &cli.source_url)?;

        let bitbucket_default_md5 = match cli.bitbucket_default_md5 {
            Some(digest) => Some(validate_md5(&digest)?),
            None => None,
        };

        let destination_credentials = credentials(
            prompt,
            &platform.to_string(),
            cli.dest_user,
            cli.dest_password,
        )?;
        let source_credentials = credentials(
            prompt,
            &PlatformKind::Jira.to_string(),
            cli.source_user,
            cli.source_password,
        )?;

        let users: Vec<UserId> = cli.users.into_iter().map(UserId::from).collect();

        Ok(Self {
            platform,
            destination_url,
            source_url,
            destination_credentials,
            source_credentials,
            options: SyncOptions {
                force: cli.force,
                dry_run: cli.dry_run,
            },
            targets: Targets::from(users),
            bitbucket_default_md5,
        })
    }
}

fn credentials(
    prompt: &mut dyn Prompt,
    platform: &str,
    username: Option<String>,
    password: Option<String>,
) -> Result<Credentials> {
    let username = match username {
        Some(name) => name,
        None => prompt
            .username(&format!("{platform} username"))
            .with_context(|| format!("no {platform} username given"))?,
    };
    if username.trim().is_empty() {
        bail!("{platform} username must not be empty");
    }

    let password = match password {
        Some(secret) => secret,
        None => prompt
            .password(&format!("{platform} password for {username}"))
            .with_context(|| format!("no {platform} password given"))?,
    };

    Ok(Credentials::new(username, password))
}

/// Accept only absolute http(s) URLs; the trailing slash is dropped.
fn validate_url(role: &str, raw: &str) -> Result<String> {
    let parsed =
        Url::parse(raw).with_context(|| format!("invalid {role} URL '{raw}'"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        bail!("invalid {role} URL '{raw}': expected http or https");
    }
    Ok(raw.trim_end_matches('/').to_string())
}

fn validate_md5(raw: &str) -> Result<String> {
    let digest = raw.trim().to_ascii_lowercase();
    if digest.len() != 32 || !digest.chars().all(|c| c.is_ascii_hexdigit()) {
        bail!("--bitbucket-default-md5 expects 32 hex digits, got '{raw}'");
    }
    Ok(digest)
}
