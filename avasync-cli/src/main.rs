//! avasync: copy Jira avatars to Confluence or Bitbucket.
//!
//! # Usage
//!
//! ```text
//! avasync [OPTIONS] <DEST_URL> <SOURCE_URL> [USERS]...
//! avasync https://wiki.example.com https://jira.example.com
//! avasync -p bitbucket --force https://git.example.com https://jira.example.com ann bob
//! ```
//!
//! With no `USERS`, every user the destination lists is synced.

mod config;
mod logging;
mod output;

use std::fmt;
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::Parser;

use avasync_core::PlatformKind;
use avasync_platform::{AvatarPlatform, BitbucketClient, ConfluenceClient, JiraClient};
use avasync_sync::Syncer;

use config::{RunConfig, TerminalPrompt};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "avasync",
    version,
    about = "Synchronize user avatars from Jira to Confluence or Bitbucket",
    long_about = None,
    after_help = "Missing usernames and passwords are prompted for on the terminal; \
when stdin is not a terminal they must be given as options or environment variables.\n\
RUST_LOG, when set, overrides the log level chosen by --verbose.",
)]
pub struct Cli {
    /// Base URL of the destination (Confluence or Bitbucket).
    pub dest_url: String,

    /// Base URL of the Jira instance avatars are copied from.
    pub source_url: String,

    /// Users to sync. Omit to sync every user of the destination.
    pub users: Vec<String>,

    /// Destination platform: confluence | bitbucket.
    #[arg(long, short = 'p', value_name = "PLATFORM", default_value = "confluence")]
    pub platform: DestinationArg,

    /// Replace destination avatars even when the user uploaded one.
    #[arg(long, short = 'f')]
    pub force: bool,

    /// Decide what would change without uploading anything.
    #[arg(long, short = 'n')]
    pub dry_run: bool,

    /// Destination username (prompted on a terminal when missing).
    #[arg(long, env = "AVASYNC_DEST_USER")]
    pub dest_user: Option<String>,

    /// Destination password (prompted on a terminal when missing).
    #[arg(long, env = "AVASYNC_DEST_PASSWORD", hide_env_values = true)]
    pub dest_password: Option<String>,

    /// Jira username (prompted on a terminal when missing).
    #[arg(long, env = "AVASYNC_SOURCE_USER")]
    pub source_user: Option<String>,

    /// Jira password (prompted on a terminal when missing).
    #[arg(long, env = "AVASYNC_SOURCE_PASSWORD", hide_env_values = true)]
    pub source_password: Option<String>,

    /// Append log records to this file instead of stderr.
    #[arg(long, short = 'l', value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Log requests and decisions at debug level (ignored when RUST_LOG is set).
    #[arg(long, short = 'v')]
    pub verbose: bool,

    /// Emit the run report as JSON.
    #[arg(long)]
    pub json: bool,

    /// MD5 of the avatar Bitbucket serves to users without one. The built-in
    /// value is a placeholder; without this, only --force replaces avatars.
    #[arg(long, value_name = "HEX")]
    pub bitbucket_default_md5: Option<String>,
}

// ---------------------------------------------------------------------------
// Destination argument, parsed from CLI strings
// ---------------------------------------------------------------------------

/// Thin wrapper so clap can parse the destination [`PlatformKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DestinationArg(pub PlatformKind);

impl FromStr for DestinationArg {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "confluence" | "wiki" => Ok(Self(PlatformKind::Confluence)),
            "bitbucket" | "stash" => Ok(Self(PlatformKind::Bitbucket)),
            other => Err(format!(
                "unknown platform '{other}'; expected: confluence, bitbucket"
            )),
        }
    }
}

impl fmt::Display for DestinationArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<DestinationArg> for PlatformKind {
    fn from(p: DestinationArg) -> Self {
        p.0
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // --help and --version are reported through the same path.
            let code = if err.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
            let _ = err.print();
            return code;
        }
    };

    let code = match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    };
    logging::flush();
    code
}

/// Resolve configuration, sync, report. `Ok(false)` when any user failed.
fn run(cli: Cli) -> Result<bool> {
    logging::init(cli.verbose, cli.log_file.as_deref())?;
    let json = cli.json;
    let config = RunConfig::resolve(cli, &mut TerminalPrompt)?;
    tracing::info!(
        "syncing avatars from {} to {} {}",
        config.source_url,
        config.platform,
        config.destination_url
    );

    let source = JiraClient::new(&config.source_url, config.source_credentials.clone());
    let destination = connect_destination(&config);
    let syncer = Syncer::new(&source, destination.as_ref(), config.options);

    let report = syncer
        .run(config.targets.clone())
        .with_context(|| format!("sync to {} failed", config.destination_url))?;

    if json {
        output::print_json(config.platform, &report, config.options.dry_run)?;
    } else {
        output::print_report(config.platform, &report, config.options.dry_run);
    }

    Ok(report.is_success())
}

fn connect_destination(config: &RunConfig) -> Box<dyn AvatarPlatform> {
    let credentials = config.destination_credentials.clone();
    match config.platform {
        PlatformKind::Bitbucket => {
            let client = BitbucketClient::new(&config.destination_url, credentials);
            match &config.bitbucket_default_md5 {
                Some(digest) => Box::new(client.with_default_md5(digest.clone())),
                None => {
                    tracing::warn!(
                        "bitbucket: no --bitbucket-default-md5 given; the built-in digest \
                         is a placeholder, so existing avatars are only replaced with --force"
                    );
                    Box::new(client)
                }
            }
        }
        // DestinationArg never parses to Jira.
        PlatformKind::Confluence | PlatformKind::Jira => {
            Box::new(ConfluenceClient::new(&config.destination_url, credentials))
        }
    }
}
