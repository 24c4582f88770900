//! Error types for avasync-sync.

use thiserror::Error;

use avasync_core::{PlatformError, PlatformKind};

/// Errors that abort a whole sync run.
///
/// Per-user failures never surface here; they are recorded as
/// [`UserOutcome::Failed`](crate::UserOutcome::Failed) in the report.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The destination could not enumerate its users, so there is nothing
    /// to iterate.
    #[error("cannot list {platform} users: {source}")]
    Listing {
        platform: PlatformKind,
        #[source]
        source: PlatformError,
    },
}
