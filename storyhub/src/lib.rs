//! # StoryHub
//!
//! Real-time coordination core for a collaborative document editor.
//!
//! Every connected editor is a session registered with one [`server::Hub`].
//! The hub drains register, unregister and inbound-message events in arrival
//! order, runs the matching command and sends the response back to the
//! session that asked.
//!
//! ## Quick Start
//!
//! ```ignore
//! use storyhub::prelude::*;
//! use std::sync::Arc;
//!
//! let store: Arc<dyn StoryStore> = Arc::new(InMemoryStore::new());
//! let (hub, handle) = HubBuilder::new(story_commands(store)?).build();
//! tokio::spawn(hub.run());
//!
//! // For every accepted connection:
//! tokio::spawn(serve_connection(stream, handle.clone()));
//! ```
//!
//! ## Crate Organization
//!
//! - [`core`] - Envelope and story payload types
//! - [`server`] - Hub, sessions, command table, story commands, connection driver

pub mod prelude;

/// Wire types shared with clients.
pub mod core {
    pub use storyhub_core::*;
}

/// Coordination loop and command dispatch.
pub mod server {
    pub use storyhub_server::*;
}
