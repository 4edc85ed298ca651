//! Error types for StoryHub wire operations.

use thiserror::Error;

/// Core error type for envelope encoding and decoding.
#[derive(Debug, Error)]
pub enum Error {
    /// Inbound bytes were not a valid envelope.
    #[error("malformed envelope: {0}")]
    Decode(#[source] serde_json::Error),

    /// An outbound envelope could not be serialized.
    #[error("failed to encode envelope: {0}")]
    Encode(#[source] serde_json::Error),

    /// Envelope was valid JSON but carried an empty command name.
    #[error("envelope has an empty command")]
    EmptyCommand,
}

/// Result type alias for StoryHub core operations.
pub type Result<T> = std::result::Result<T, Error>;
