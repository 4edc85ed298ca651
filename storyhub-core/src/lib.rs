//! # StoryHub Core
//!
//! Wire types shared by the StoryHub coordination loop and its clients.
//!
//! This crate provides:
//! - [`Envelope`], the `{ "command", "data" }` unit used for requests and responses
//! - Story payloads carried in envelope data (pages and associations)
//! - Error types for envelope encoding/decoding

pub mod envelope;
pub mod error;
pub mod model;

pub use envelope::Envelope;
pub use error::{Error, Result};
pub use model::{Association, AssociationRequest, PageId, PageRequest, StoryRequest};
