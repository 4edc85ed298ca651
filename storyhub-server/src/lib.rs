//! # StoryHub Server
//!
//! Real-time coordination core for collaborative story editing.
//!
//! This crate provides:
//! - The hub: one loop owning the live-session set and dispatching every command
//! - Session handles with per-session outbound queues
//! - Command handler traits and the validated command table
//! - The story commands and their persistence contract
//! - A line-framed connection driver

pub mod commands;
pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod hub;
pub mod session;
pub mod store;

pub use commands::story_commands;
pub use connection::serve_connection;
pub use dispatcher::{CommandTable, CommandTableBuilder, UNKNOWN_COMMAND};
pub use error::{CommandError, ServerError};
pub use handler::{Command, CommandHandler, FnHandler, TypedHandler};
pub use hub::{Hub, HubBuilder, HubConfig, HubEvent, HubHandle, HubStats};
pub use session::{Outbound, Session, SessionId, SessionRegistry};
pub use store::{InMemoryStore, StoreError, StoreOperation, StoryStore};
