//! Sync pipeline: pull from the source, compare, push to the destination.
//!
//! Per user, strictly in order:
//!
//! 1. Pull the source avatar.
//! 2. Skip if it is the source's default avatar.
//! 3. Skip if its content type is not png, jpeg or gif.
//! 4. Pull the destination avatar.
//! 5. Skip if both match, or if force is off and the destination avatar is
//!    custom.
//! 6. Stage the source content on the destination avatar and push it.
//!
//! A failure at any step only ends that user's sync.

use chrono::Utc;

use avasync_core::{is_supported_image, Avatar, UserId};
use avasync_platform::AvatarPlatform;

use crate::error::SyncError;
use crate::report::{Stage, SyncReport, UserOutcome, UserReport};

/// Which users a run covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Targets {
    /// Every user the destination lists.
    All,
    /// These users, in this order.
    Users(Vec<UserId>),
}

impl From<Vec<UserId>> for Targets {
    /// An empty list means every destination user.
    fn from(users: Vec<UserId>) -> Self {
        if users.is_empty() {
            Targets::All
        } else {
            Targets::Users(users)
        }
    }
}

/// Run-wide switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOptions {
    /// Overwrite destination avatars the user customised themselves.
    pub force: bool,
    /// Decide everything, push nothing.
    pub dry_run: bool,
}

/// Result of comparing a source and destination avatar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    UpToDate,
    Overwrite,
}

/// Without force only a still-default destination avatar is replaced, even
/// when the two pictures differ.
pub fn decide(source: &Avatar, destination: &Avatar, force: bool) -> Decision {
    if source.is_equal(destination) || (!force && !destination.is_default()) {
        Decision::UpToDate
    } else {
        Decision::Overwrite
    }
}

/// Copies avatars from one platform to another.
pub struct Syncer<'a> {
    source: &'a dyn AvatarPlatform,
    destination: &'a dyn AvatarPlatform,
    options: SyncOptions,
    label: String,
}

impl<'a> Syncer<'a> {
    pub fn new(
        source: &'a dyn AvatarPlatform,
        destination: &'a dyn AvatarPlatform,
        options: SyncOptions,
    ) -> Self {
        let label = format!("{}->{}", source.kind(), destination.kind());
        Self {
            source,
            destination,
            options,
            label,
        }
    }

    /// Expand [`Targets::All`] through the destination's user listing.
    pub fn resolve(&self, targets: Targets) -> Result<Vec<UserId>, SyncError> {
        match targets {
            Targets::Users(users) => Ok(users),
            Targets::All => {
                let users = self
                    .destination
                    .list_users()
                    .map_err(|source| SyncError::Listing {
                        platform: self.destination.kind(),
                        source,
                    })?;
                tracing::info!("[{}] {} users to check", self.label, users.len());
                Ok(users)
            }
        }
    }

    /// Sync every target user and collect the outcomes.
    pub fn run(&self, targets: Targets) -> Result<SyncReport, SyncError> {
        let started_at = Utc::now();
        let users = self.resolve(targets)?;

        let mut reports = Vec::with_capacity(users.len());
        for user in users {
            let outcome = self.sync_user(&user);
            reports.push(UserReport { user, outcome });
        }

        Ok(SyncReport {
            started_at,
            finished_at: Utc::now(),
            users: reports,
        })
    }

    /// Sync one user. Never fails; failures become [`UserOutcome::Failed`].
    pub fn sync_user(&self, user: &UserId) -> UserOutcome {
        let label = &self.label;

        let source = match self.source.fetch_avatar(user) {
            Ok(avatar) => avatar,
            Err(err) => return self.failed(user, Stage::PullSource, err),
        };

        if source.is_default() {
            tracing::warn!("[{label}] {user}: no new avatar uploaded");
            return UserOutcome::SkippedDefault;
        }

        if !is_supported_image(source.content_type()) {
            tracing::warn!(
                "[{label}] {user}: unsupported type {}",
                source.content_type()
            );
            return UserOutcome::SkippedUnsupportedType {
                content_type: source.content_type().to_string(),
            };
        }

        let mut destination = match self.destination.fetch_avatar(user) {
            Ok(avatar) => avatar,
            Err(err) => return self.failed(user, Stage::PullDestination, err),
        };

        if decide(&source, &destination, self.options.force) == Decision::UpToDate {
            tracing::warn!("[{label}] {user}: already up to date");
            return UserOutcome::UpToDate;
        }

        if self.options.dry_run {
            tracing::info!("[dry-run] [{label}] {user}: would push avatar");
            return UserOutcome::WouldPush;
        }

        destination.set_data(
            source.content_type(),
            source.data().to_vec(),
            source.origin().map(str::to_string),
        );
        match self.destination.push_avatar(&destination) {
            Ok(()) => {
                tracing::info!(
                    "[{label}] {user}: pushed {} ({} bytes)",
                    destination.content_type(),
                    destination.data().len()
                );
                UserOutcome::Pushed
            }
            Err(err) => self.failed(user, Stage::Push, err),
        }
    }

    fn failed(&self, user: &UserId, stage: Stage, err: impl std::fmt::Display) -> UserOutcome {
        tracing::error!("[{}] {user}: {stage} failed: {err}", self.label);
        UserOutcome::Failed {
            stage,
            message: err.to_string(),
        }
    }
}
