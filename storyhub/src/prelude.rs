//! Prelude module for convenient imports.
//!
//! ```ignore
//! use storyhub::prelude::*;
//! ```

// Wire types
pub use storyhub_core::{
    Association, AssociationRequest, Envelope, Error as CoreError, PageId, PageRequest,
    StoryRequest,
};

// Hub types
pub use storyhub_server::{
    Command, CommandError, CommandHandler, CommandTable, FnHandler, Hub, HubBuilder, HubConfig,
    HubHandle, HubStats, InMemoryStore, Outbound, ServerError, Session, SessionId, StoreError,
    StoryStore, serve_connection, story_commands,
};
