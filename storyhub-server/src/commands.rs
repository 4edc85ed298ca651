//! Story editing commands.
//!
//! | request             | success              | failure                |
//! |---------------------|----------------------|------------------------|
//! | `savePage`          | `saveSuccessful`     | `saveFailed`           |
//! | `deletePage`        | `deletionSuccessful` | `deletionFailed`       |
//! | `fetchAssociations` | `pushAssociations`   | `pushAssociations`     |
//! | `newAssociation`    | `pushAssociations`   | `newAssociationFailed` |

use crate::dispatcher::CommandTable;
use crate::error::{CommandError, ServerError};
use crate::handler::Command;
use crate::store::StoryStore;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use storyhub_core::{Association, AssociationRequest, PageRequest, StoryRequest};

/// Builds the command table for the story editor.
///
/// # Errors
/// Returns `ServerError::InvalidCommandTable` if validation fails.
pub fn story_commands(store: Arc<dyn StoryStore>) -> Result<CommandTable, ServerError> {
    CommandTable::builder()
        .command(SavePage::new(Arc::clone(&store)))
        .command(DeletePage::new(Arc::clone(&store)))
        .command(FetchAssociations::new(Arc::clone(&store)))
        .command(NewAssociation::new(store))
        .build()
}

/// Writes a page body.
pub struct SavePage {
    store: Arc<dyn StoryStore>,
}

impl SavePage {
    /// Creates the command.
    #[must_use]
    pub fn new(store: Arc<dyn StoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Command for SavePage {
    const NAME: &'static str = "savePage";
    const SUCCESS: &'static str = "saveSuccessful";
    const FAILURE: &'static str = "saveFailed";

    type Request = PageRequest;
    type Response = ();

    async fn execute(&self, request: PageRequest) -> Result<Option<()>, CommandError> {
        let body = request.body.unwrap_or(Value::Null);
        self.store
            .save_page(&request.page_id, &body, &request.story_id)
            .await?;
        Ok(None)
    }
}

/// Removes a page.
pub struct DeletePage {
    store: Arc<dyn StoryStore>,
}

impl DeletePage {
    /// Creates the command.
    #[must_use]
    pub fn new(store: Arc<dyn StoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Command for DeletePage {
    const NAME: &'static str = "deletePage";
    const SUCCESS: &'static str = "deletionSuccessful";
    const FAILURE: &'static str = "deletionFailed";

    type Request = PageRequest;
    type Response = ();

    async fn execute(&self, request: PageRequest) -> Result<Option<()>, CommandError> {
        self.store
            .delete_page(&request.page_id, &request.story_id)
            .await?;
        Ok(None)
    }
}

/// Pushes the story's associations to the requester.
///
/// A failed lookup still answers `pushAssociations`, without data; the
/// reason only goes to the log.
pub struct FetchAssociations {
    store: Arc<dyn StoryStore>,
}

impl FetchAssociations {
    /// Creates the command.
    #[must_use]
    pub fn new(store: Arc<dyn StoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Command for FetchAssociations {
    const NAME: &'static str = "fetchAssociations";
    const SUCCESS: &'static str = "pushAssociations";
    const FAILURE: &'static str = "pushAssociations";
    const EXPOSES_FAILURE_REASON: bool = false;

    type Request = StoryRequest;
    type Response = Vec<Association>;

    async fn execute(
        &self,
        request: StoryRequest,
    ) -> Result<Option<Vec<Association>>, CommandError> {
        let associations = self.store.fetch_associations(&request.story_id).await?;
        Ok(Some(associations))
    }
}

/// Creates an association, then pushes the refreshed list.
pub struct NewAssociation {
    store: Arc<dyn StoryStore>,
}

impl NewAssociation {
    /// Creates the command.
    #[must_use]
    pub fn new(store: Arc<dyn StoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Command for NewAssociation {
    const NAME: &'static str = "newAssociation";
    const SUCCESS: &'static str = "pushAssociations";
    const FAILURE: &'static str = "newAssociationFailed";

    type Request = AssociationRequest;
    type Response = Vec<Association>;

    async fn execute(
        &self,
        request: AssociationRequest,
    ) -> Result<Option<Vec<Association>>, CommandError> {
        self.store
            .create_association(&request.name, request.kind, &request.story_id)
            .await?;

        // The association exists now; a failed refresh must not report failure.
        match self.store.fetch_associations(&request.story_id).await {
            Ok(associations) => Ok(Some(associations)),
            Err(err) => {
                tracing::warn!(
                    story = %request.story_id,
                    "association created but refresh failed: {}",
                    err
                );
                Ok(None)
            }
        }
    }
}
