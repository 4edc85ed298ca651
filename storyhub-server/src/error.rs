//! Error types for hub operations.

use crate::store::StoreError;
use thiserror::Error;

/// Error type for hub and connection operations.
#[derive(Debug, Error)]
pub enum ServerError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Frame error on a client connection, such as an over-long line.
    #[error("codec error: {0}")]
    Codec(#[from] tokio_util::codec::AnyDelimiterCodecError),

    /// Command table failed validation at startup.
    #[error("invalid command table: {message}")]
    InvalidCommandTable {
        /// Error message.
        message: String,
    },

    /// The hub loop is no longer running.
    #[error("hub closed")]
    Closed,
}

/// Error raised while executing a single command.
///
/// Everything except [`CommandError::Encode`] is turned into the command's
/// failure envelope. Encode failures are logged and the response dropped.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Request data did not match the command's payload shape.
    #[error("invalid request data: {0}")]
    Decode(#[source] serde_json::Error),

    /// Result payload could not be encoded.
    #[error("failed to encode response: {0}")]
    Encode(#[source] serde_json::Error),

    /// The store collaborator reported a failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Handler-specific failure.
    #[error("{message}")]
    Failed {
        /// Error message.
        message: String,
    },
}

impl CommandError {
    /// Creates a handler-specific failure.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }

    /// Returns true if this error should reach the client as a failure envelope.
    #[must_use]
    pub fn is_client_visible(&self) -> bool {
        !matches!(self, Self::Encode(_))
    }
}
