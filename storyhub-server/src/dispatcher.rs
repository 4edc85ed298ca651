//! Command table routing envelopes to handlers by command name.

use crate::error::ServerError;
use crate::handler::{Command, CommandHandler, TypedHandler};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use storyhub_core::Envelope;

/// Response tag sent for commands with no registered handler.
///
/// Only named commands get this reply. An envelope whose command is blank
/// fails to decode and is dropped without any response.
pub const UNKNOWN_COMMAND: &str = "unknownCommand";

/// Static mapping from command name to handler.
///
/// Built once through [`CommandTableBuilder`] and read-only afterwards.
pub struct CommandTable {
    handlers: HashMap<String, Arc<dyn CommandHandler>>,
}

impl CommandTable {
    /// Starts building a table.
    #[must_use]
    pub fn builder() -> CommandTableBuilder {
        CommandTableBuilder::new()
    }

    /// Returns true if a handler is registered for the given command.
    #[must_use]
    pub fn has_handler(&self, command: &str) -> bool {
        self.handlers.contains_key(command)
    }

    /// Returns the number of registered commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns true if no commands are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Returns the registered command names, sorted.
    #[must_use]
    pub fn commands(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Runs the handler for `request` and builds the response envelope.
    ///
    /// Returns `None` when no response should be sent (the result could not
    /// be encoded).
    pub async fn dispatch(&self, request: Envelope) -> Option<Envelope> {
        let Envelope { command, data } = request;

        let Some(handler) = self.handlers.get(&command) else {
            tracing::warn!(command = %command, "unknown command");
            return Some(Envelope::with_data(UNKNOWN_COMMAND, Value::String(command)));
        };

        match handler.handle(data).await {
            Ok(result) => Some(Envelope {
                command: handler.success_tag().to_string(),
                data: result,
            }),
            Err(err) if !err.is_client_visible() => {
                tracing::error!(command = %command, "dropping response: {}", err);
                None
            }
            Err(err) => {
                tracing::warn!(command = %command, "command failed: {}", err);
                let data = handler
                    .exposes_failure_reason()
                    .then(|| Value::String(err.to_string()));
                Some(Envelope {
                    command: handler.failure_tag().to_string(),
                    data,
                })
            }
        }
    }
}

impl std::fmt::Debug for CommandTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandTable")
            .field("commands", &self.commands())
            .finish()
    }
}

/// Builder validating a [`CommandTable`] before the hub starts.
#[derive(Default)]
pub struct CommandTableBuilder {
    entries: Vec<(String, Arc<dyn CommandHandler>)>,
}

impl CommandTableBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a typed command under its own name.
    #[must_use]
    pub fn command<C: Command>(self, command: C) -> Self {
        self.handler(C::NAME, TypedHandler::new(command))
    }

    /// Registers a handler for a command name.
    #[must_use]
    pub fn handler<H: CommandHandler + 'static>(
        mut self,
        name: impl Into<String>,
        handler: H,
    ) -> Self {
        self.entries.push((name.into(), Arc::new(handler)));
        self
    }

    /// Validates and builds the table.
    ///
    /// # Errors
    /// Returns `ServerError::InvalidCommandTable` for blank names or tags,
    /// duplicate names, or a name that collides with [`UNKNOWN_COMMAND`].
    pub fn build(self) -> Result<CommandTable, ServerError> {
        let mut handlers = HashMap::with_capacity(self.entries.len());

        for (name, handler) in self.entries {
            if name.trim().is_empty() {
                return Err(invalid("command name must not be empty"));
            }
            if name == UNKNOWN_COMMAND {
                return Err(invalid(format!("{UNKNOWN_COMMAND} is reserved")));
            }
            if handler.success_tag().is_empty() || handler.failure_tag().is_empty() {
                return Err(invalid(format!("command {name} has an empty response tag")));
            }
            if handlers.contains_key(&name) {
                return Err(invalid(format!("duplicate command {name}")));
            }
            handlers.insert(name, handler);
        }

        Ok(CommandTable { handlers })
    }
}

fn invalid(message: impl Into<String>) -> ServerError {
    ServerError::InvalidCommandTable {
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CommandError;
    use crate::handler::FnHandler;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn echo() -> FnHandler<impl Fn(Option<Value>) -> Result<Option<Value>, CommandError>> {
        FnHandler::new("echoed", "echoFailed", |data| Ok(data))
    }

    #[test]
    fn test_table_empty() {
        let table = CommandTable::builder().build().unwrap();
        assert!(table.is_empty());
        assert!(!table.has_handler("savePage"));
    }

    #[test]
    fn test_table_register() {
        let table = CommandTable::builder()
            .handler("echo", echo())
            .handler("ping", FnHandler::new("pong", "pingFailed", |_| Ok(None)))
            .build()
            .unwrap();

        assert!(table.has_handler("echo"));
        assert!(!table.has_handler("savePage"));
        assert_eq!(table.commands(), vec!["echo", "ping"]);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_table_rejects_duplicates() {
        let result = CommandTable::builder()
            .handler("echo", echo())
            .handler("echo", echo())
            .build();

        assert!(matches!(result, Err(ServerError::InvalidCommandTable { .. })));
    }

    #[test]
    fn test_table_rejects_blank_and_reserved_names() {
        assert!(CommandTable::builder().handler(" ", echo()).build().is_err());
        assert!(CommandTable::builder().handler(UNKNOWN_COMMAND, echo()).build().is_err());
    }

    #[test]
    fn test_table_rejects_empty_tags() {
        let handler = FnHandler::new("", "failed", |_| Ok(None));
        assert!(CommandTable::builder().handler("x", handler).build().is_err());
    }

    #[tokio::test]
    async fn test_dispatch_success() {
        let called = Arc::new(AtomicBool::new(false));
        let called_clone = called.clone();
        let table = CommandTable::builder()
            .handler(
                "echo",
                FnHandler::new("echoed", "echoFailed", move |data| {
                    called_clone.store(true, Ordering::SeqCst);
                    Ok(data)
                }),
            )
            .build()
            .unwrap();

        let response = table
            .dispatch(Envelope::with_data("echo", json!({"n": 1})))
            .await
            .unwrap();

        assert!(called.load(Ordering::SeqCst));
        assert_eq!(response, Envelope::with_data("echoed", json!({"n": 1})));
    }

    #[tokio::test]
    async fn test_dispatch_failure_carries_reason() {
        let table = CommandTable::builder()
            .handler(
                "save",
                FnHandler::new("saved", "saveFailed", |_| Err(CommandError::failed("disk full"))),
            )
            .build()
            .unwrap();

        let response = table.dispatch(Envelope::new("save")).await.unwrap();
        assert_eq!(response, Envelope::with_data("saveFailed", json!("disk full")));
    }

    #[tokio::test]
    async fn test_dispatch_unknown_command() {
        let table = CommandTable::builder().handler("echo", echo()).build().unwrap();

        let response = table.dispatch(Envelope::new("renamePage")).await.unwrap();
        assert_eq!(
            response,
            Envelope::with_data(UNKNOWN_COMMAND, json!("renamePage"))
        );
    }

    #[tokio::test]
    async fn test_dispatch_encode_error_drops_response() {
        let table = CommandTable::builder()
            .handler(
                "broken",
                FnHandler::new("ok", "failed", |_| {
                    let source = serde_json::from_str::<u8>("x").unwrap_err();
                    Err(CommandError::Encode(source))
                }),
            )
            .build()
            .unwrap();

        assert!(table.dispatch(Envelope::new("broken")).await.is_none());
    }
}
