//! avasync core library: domain types, avatar policy, errors.
//!
//! - [`types`]: [`UserId`], [`PlatformKind`], [`Credentials`]
//! - [`avatar`]: [`Avatar`] and the default/equality rules per platform
//! - [`digest`]: MD5 and basename helpers shared by the rules
//! - [`error`]: [`PlatformError`]

pub mod avatar;
pub mod digest;
pub mod error;
pub mod types;

pub use avatar::{is_supported_image, Avatar, SUPPORTED_CONTENT_TYPES};
pub use error::PlatformError;
pub use types::{Credentials, PlatformKind, UserId};
