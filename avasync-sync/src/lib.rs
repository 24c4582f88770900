//! # avasync-sync
//!
//! Sequential avatar sync orchestration.
//!
//! Build a [`Syncer`] from a source and a destination
//! [`AvatarPlatform`](avasync_platform::AvatarPlatform), then call
//! [`Syncer::run`] with the [`Targets`] to process. The returned
//! [`SyncReport`] records one [`UserOutcome`] per user.

pub mod error;
pub mod pipeline;
pub mod report;

pub use error::SyncError;
pub use pipeline::{decide, Decision, SyncOptions, Syncer, Targets};
pub use report::{Stage, SyncReport, UserOutcome, UserReport};
