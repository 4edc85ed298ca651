//! Story persistence collaborator.
//!
//! The hub only needs this narrow contract; real deployments plug in their
//! own database-backed [`StoryStore`]. [`InMemoryStore`] backs tests, the
//! benchmarks and the demo server.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use storyhub_core::{Association, PageId};
use thiserror::Error;

/// Failure reported by a story store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct StoreError {
    /// Human-readable description sent to the client.
    pub message: String,
}

impl StoreError {
    /// Creates a store error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Persistence operations the story commands call.
#[async_trait]
pub trait StoryStore: Send + Sync {
    /// Creates or replaces a page body.
    async fn save_page(&self, page_id: &PageId, body: &Value, story_id: &str)
    -> Result<(), StoreError>;

    /// Removes a page. Removing a missing page succeeds.
    async fn delete_page(&self, page_id: &PageId, story_id: &str) -> Result<(), StoreError>;

    /// Lists the associations of a story.
    async fn fetch_associations(&self, story_id: &str) -> Result<Vec<Association>, StoreError>;

    /// Creates an association.
    async fn create_association(
        &self,
        name: &str,
        kind: i32,
        story_id: &str,
    ) -> Result<(), StoreError>;
}

/// Store operations that can be forced to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    /// `save_page`.
    SavePage,
    /// `delete_page`.
    DeletePage,
    /// `fetch_associations`.
    FetchAssociations,
    /// `create_association`.
    CreateAssociation,
}

/// In-process [`StoryStore`].
#[derive(Debug, Default)]
pub struct InMemoryStore {
    pages: RwLock<HashMap<(String, PageId), Value>>,
    associations: RwLock<HashMap<String, Vec<Association>>>,
    failures: Mutex<HashMap<StoreOperation, String>>,
    next_association_id: AtomicU64,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later call of `operation` fail with `message`.
    pub fn fail(&self, operation: StoreOperation, message: impl Into<String>) {
        self.failures.lock().insert(operation, message.into());
    }

    /// Clears a failure installed with [`InMemoryStore::fail`].
    pub fn heal(&self, operation: StoreOperation) {
        self.failures.lock().remove(&operation);
    }

    /// Returns a stored page body.
    #[must_use]
    pub fn page(&self, story_id: &str, page_id: &PageId) -> Option<Value> {
        self.pages
            .read()
            .get(&(story_id.to_string(), page_id.clone()))
            .cloned()
    }

    /// Returns the number of stored pages across all stories.
    #[must_use]
    pub fn page_count(&self) -> usize {
        self.pages.read().len()
    }

    fn check(&self, operation: StoreOperation) -> Result<(), StoreError> {
        match self.failures.lock().get(&operation) {
            Some(message) => Err(StoreError::new(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl StoryStore for InMemoryStore {
    async fn save_page(
        &self,
        page_id: &PageId,
        body: &Value,
        story_id: &str,
    ) -> Result<(), StoreError> {
        self.check(StoreOperation::SavePage)?;
        self.pages
            .write()
            .insert((story_id.to_string(), page_id.clone()), body.clone());
        Ok(())
    }

    async fn delete_page(&self, page_id: &PageId, story_id: &str) -> Result<(), StoreError> {
        self.check(StoreOperation::DeletePage)?;
        self.pages
            .write()
            .remove(&(story_id.to_string(), page_id.clone()));
        Ok(())
    }

    async fn fetch_associations(&self, story_id: &str) -> Result<Vec<Association>, StoreError> {
        self.check(StoreOperation::FetchAssociations)?;
        Ok(self
            .associations
            .read()
            .get(story_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_association(
        &self,
        name: &str,
        kind: i32,
        story_id: &str,
    ) -> Result<(), StoreError> {
        self.check(StoreOperation::CreateAssociation)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::new("association name must not be empty"));
        }

        let id = self.next_association_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.associations
            .write()
            .entry(story_id.to_string())
            .or_default()
            .push(Association::new(format!("assoc-{id}"), name, kind, story_id));
        Ok(())
    }
}
