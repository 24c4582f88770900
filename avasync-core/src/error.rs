//! Error types for avasync-core.

use thiserror::Error;

use crate::types::PlatformKind;

/// All errors that can arise while talking to a platform.
///
/// `operation` always names what was attempted and for whom, e.g.
/// `get user 'jdoe'`, so the rendered message carries platform, user and
/// status line together.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// Connection, TLS, or timeout failure before any status line was received.
    #[error("{platform}: {operation} failed: {message}")]
    Transport {
        platform: PlatformKind,
        operation: String,
        message: String,
    },

    /// The server answered with a non-2xx status.
    #[error("{platform}: {operation} failed: HTTP {status} {status_text}")]
    Status {
        platform: PlatformKind,
        operation: String,
        status: u16,
        status_text: String,
    },

    /// The response body did not have the expected shape.
    #[error("{platform}: {operation}: unexpected response: {message}")]
    Data {
        platform: PlatformKind,
        operation: String,
        message: String,
    },

    /// A JSON-RPC endpoint reported an `error.message`.
    #[error("{platform}: {operation}: remote error: {message}")]
    Rpc {
        platform: PlatformKind,
        operation: String,
        message: String,
    },

    /// The platform cannot perform this operation (e.g. listing Jira users).
    #[error("{platform} does not support {operation}")]
    Unsupported {
        platform: PlatformKind,
        operation: &'static str,
    },
}

impl PlatformError {
    /// Convenience constructor for [`PlatformError::Data`].
    pub fn data(
        platform: PlatformKind,
        operation: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Data {
            platform,
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// HTTP status code, when the failure was a non-success response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result type for platform operations.
pub type Result<T> = std::result::Result<T, PlatformError>;
