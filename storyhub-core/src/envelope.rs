//! The command envelope exchanged with clients.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Command-name plus payload unit used for both requests and responses.
///
/// On the wire this is `{ "command": "<name>", "data": <json> }`. A missing
/// (or `null`) `data` means "no payload" and is never an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Request command or response tag.
    pub command: String,
    /// Optional command-specific payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Envelope {
    /// Creates an envelope without a payload.
    #[must_use]
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            data: None,
        }
    }

    /// Creates an envelope carrying `data`.
    #[must_use]
    pub fn with_data(command: impl Into<String>, data: Value) -> Self {
        Self {
            command: command.into(),
            data: Some(data),
        }
    }

    /// Decodes an envelope from raw inbound bytes.
    ///
    /// # Errors
    /// Returns [`Error::Decode`] for malformed JSON or a missing command, and
    /// [`Error::EmptyCommand`] when the command is blank.
    pub fn decode(raw: &[u8]) -> Result<Self> {
        let envelope: Self = serde_json::from_slice(raw).map_err(Error::Decode)?;
        if envelope.command.trim().is_empty() {
            return Err(Error::EmptyCommand);
        }
        Ok(envelope)
    }

    /// Encodes the envelope as a single-line JSON string.
    ///
    /// # Errors
    /// Returns [`Error::Encode`] if the payload cannot be serialized.
    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self).map_err(Error::Encode)
    }

    /// Returns true if the envelope carries a payload.
    #[must_use]
    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }
}
