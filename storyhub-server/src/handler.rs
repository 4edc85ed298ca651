//! Command handler traits.

use crate::error::CommandError;
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Object-safe handler stored in the command table.
///
/// The hub invokes `handle` inside its loop, one command at a time, so
/// implementations must not wait without bound.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Response tag sent when the command succeeds.
    fn success_tag(&self) -> &str;

    /// Response tag sent when the command fails.
    fn failure_tag(&self) -> &str;

    /// Whether the failure envelope carries the error text.
    fn exposes_failure_reason(&self) -> bool {
        true
    }

    /// Runs the command against the raw envelope data.
    ///
    /// # Errors
    /// Returns `CommandError` when the request cannot be decoded or the
    /// command itself fails.
    async fn handle(&self, data: Option<Value>) -> Result<Option<Value>, CommandError>;
}

/// A command with typed request and response payloads.
#[async_trait]
pub trait Command: Send + Sync + 'static {
    /// Request command name.
    const NAME: &'static str;
    /// Success response tag.
    const SUCCESS: &'static str;
    /// Failure response tag.
    const FAILURE: &'static str;
    /// Whether failures reach the client with their error text.
    const EXPOSES_FAILURE_REASON: bool = true;

    /// Decoded request payload.
    type Request: DeserializeOwned + Send;
    /// Success payload.
    type Response: Serialize + Send;

    /// Executes the command.
    ///
    /// `Ok(None)` means success without a payload.
    ///
    /// # Errors
    /// Returns `CommandError` if the command fails.
    async fn execute(&self, request: Self::Request)
    -> Result<Option<Self::Response>, CommandError>;
}

/// Adapts a [`Command`] into a [`CommandHandler`].
///
/// Missing data is decoded as JSON `null`, so commands with a required
/// payload fail through their failure tag.
pub struct TypedHandler<C> {
    command: C,
}

impl<C: Command> TypedHandler<C> {
    /// Wraps a command.
    pub fn new(command: C) -> Self {
        Self { command }
    }
}

#[async_trait]
impl<C: Command> CommandHandler for TypedHandler<C> {
    fn success_tag(&self) -> &str {
        C::SUCCESS
    }

    fn failure_tag(&self) -> &str {
        C::FAILURE
    }

    fn exposes_failure_reason(&self) -> bool {
        C::EXPOSES_FAILURE_REASON
    }

    async fn handle(&self, data: Option<Value>) -> Result<Option<Value>, CommandError> {
        let request: C::Request =
            serde_json::from_value(data.unwrap_or(Value::Null)).map_err(CommandError::Decode)?;
        let response = self.command.execute(request).await?;
        response
            .map(serde_json::to_value)
            .transpose()
            .map_err(CommandError::Encode)
    }
}

/// Wrapper to convert a closure into a CommandHandler.
pub struct FnHandler<F> {
    success: String,
    failure: String,
    handler: F,
}

impl<F> FnHandler<F>
where
    F: Fn(Option<Value>) -> Result<Option<Value>, CommandError> + Send + Sync,
{
    /// Creates a new function handler with its response tags.
    pub fn new(success: impl Into<String>, failure: impl Into<String>, handler: F) -> Self {
        Self {
            success: success.into(),
            failure: failure.into(),
            handler,
        }
    }
}

#[async_trait]
impl<F> CommandHandler for FnHandler<F>
where
    F: Fn(Option<Value>) -> Result<Option<Value>, CommandError> + Send + Sync,
{
    fn success_tag(&self) -> &str {
        &self.success
    }

    fn failure_tag(&self) -> &str {
        &self.failure
    }

    async fn handle(&self, data: Option<Value>) -> Result<Option<Value>, CommandError> {
        (self.handler)(data)
    }
}
