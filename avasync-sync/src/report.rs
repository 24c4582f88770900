//! Per-user outcomes and the summary of a run.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use avasync_core::UserId;

/// Step of the per-user sync that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    PullSource,
    PullDestination,
    Push,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::PullSource => write!(f, "pull source"),
            Stage::PullDestination => write!(f, "pull destination"),
            Stage::Push => write!(f, "push"),
        }
    }
}

/// What happened to one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum UserOutcome {
    /// The source avatar was uploaded to the destination.
    Pushed,
    /// `--dry-run`: the source avatar *would* have been uploaded.
    WouldPush,
    /// The user never uploaded an avatar to the source.
    SkippedDefault,
    /// The source image is not png, jpeg or gif.
    SkippedUnsupportedType { content_type: String },
    /// Destination already matches, or is a custom avatar and force is off.
    UpToDate,
    /// A request failed; counts as an error.
    Failed { stage: Stage, message: String },
}

impl UserOutcome {
    pub fn is_error(&self) -> bool {
        matches!(self, UserOutcome::Failed { .. })
    }

    /// Short label for tables and logs.
    pub fn label(&self) -> &'static str {
        match self {
            UserOutcome::Pushed => "pushed",
            UserOutcome::WouldPush => "would push",
            UserOutcome::SkippedDefault => "default avatar",
            UserOutcome::SkippedUnsupportedType { .. } => "unsupported type",
            UserOutcome::UpToDate => "up to date",
            UserOutcome::Failed { .. } => "failed",
        }
    }
}

/// Outcome for a single user, in processing order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserReport {
    pub user: UserId,
    #[serde(flatten)]
    pub outcome: UserOutcome,
}

/// Outcome of a whole run.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub users: Vec<UserReport>,
}

impl SyncReport {
    pub fn error_count(&self) -> usize {
        self.count(UserOutcome::is_error)
    }

    pub fn pushed_count(&self) -> usize {
        self.count(|o| matches!(o, UserOutcome::Pushed | UserOutcome::WouldPush))
    }

    /// Users left alone for a policy reason (warnings, not errors).
    pub fn skipped_count(&self) -> usize {
        self.users.len() - self.error_count() - self.pushed_count()
    }

    /// A run succeeds iff no user failed.
    pub fn is_success(&self) -> bool {
        self.error_count() == 0
    }

    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }

    fn count(&self, pred: impl Fn(&UserOutcome) -> bool) -> usize {
        self.users.iter().filter(|r| pred(&r.outcome)).count()
    }
}
