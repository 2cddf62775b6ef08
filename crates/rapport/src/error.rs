//! Error types for rapport operations.
//!
//! The first group of variants is the user-facing taxonomy: every one of them
//! is recoverable at the operation boundary and maps to a short message in the
//! command surface. Everything else is an unexpected collaborator failure.

use crate::domain::ChannelId;
use std::io;
use thiserror::Error;

/// The error type for rapport operations.
#[derive(Debug, Error)]
pub enum Error {
    /// No designated channel has been configured for the community.
    #[error("No designated channel is configured for this community")]
    NotConfigured,

    /// The operation was attempted outside the designated channel.
    #[error("This operation is only available in the designated channel ({expected})")]
    WrongChannel {
        /// The channel graph operations are bound to.
        expected: ChannelId,
    },

    /// The request carried the wrong number of participants.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The requester lacks the permission the command needs.
    #[error("Permission denied: {0} permission required")]
    PermissionDenied(&'static str),

    /// The object publisher could not store the artifact.
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    /// No confirming reply arrived within the confirmation window.
    #[error("Confirmation timed out")]
    ConfirmationTimeout,

    /// A reply arrived but was not the affirmative token.
    #[error("Confirmation declined")]
    ConfirmationDeclined,

    /// Storage backend error.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// A renderer failed to produce its artifact.
    #[error("Render error: {0}")]
    Render(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// No `.rapport/` directory was found.
    #[error("Not a rapport workspace (or any parent directory). Run 'rapport init' first")]
    NotInitialized,

    /// IO error occurred.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns `true` for the recoverable taxonomy members that callers turn
    /// into a specific message, `false` for unexpected collaborator failures.
    #[must_use]
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Error::NotConfigured
                | Error::WrongChannel { .. }
                | Error::InvalidRequest(_)
                | Error::PermissionDenied(_)
                | Error::UploadFailed(_)
                | Error::ConfirmationTimeout
                | Error::ConfirmationDeclined
        )
    }
}

/// Errors raised by storage backends.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backing file is not in the expected format.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// A record could not be serialized.
    #[error("Serialization failed: {0}")]
    Serialization(#[source] serde_json::Error),

    /// The backend cannot be reached.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// A specialized Result type for rapport operations.
pub type Result<T> = std::result::Result<T, Error>;
