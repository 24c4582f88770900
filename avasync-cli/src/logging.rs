//! Process-wide logger setup.
//!
//! `RUST_LOG` takes precedence over `--verbose`. With `--log-file`, records
//! are appended to that file without colour codes.

use std::fs::OpenOptions;
use std::path::Path;

use anyhow::{Context, Result};
use env_logger::{Env, Target, WriteStyle};

pub fn init(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };
    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or(level));
    builder.format_target(false);

    if let Some(path) = log_file {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("cannot open log file {}", path.display()))?;
        builder
            .target(Target::Pipe(Box::new(file)))
            .write_style(WriteStyle::Never);
    }

    builder.try_init().context("logger already initialised")?;
    Ok(())
}

/// Flush buffered records before the process exits.
pub fn flush() {
    tracing::logger().flush();
}
