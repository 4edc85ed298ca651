//! Story payloads carried in envelope data.
//!
//! Field names follow the browser editor's camelCase JSON. Older clients send
//! the numeric page index as `page` and the story as `storyID`; both are
//! accepted as aliases.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Identifier of a page within a story.
///
/// Accepts either a JSON string or an integer on input and always
/// serializes as a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct PageId(String);

impl PageId {
    /// Creates a page id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PageId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl<'de> Deserialize<'de> for PageId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Index(u64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(text) => Self(text),
            RawId::Index(index) => Self(index.to_string()),
        })
    }
}

/// Payload of `savePage` and `deletePage`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    /// Page being written or removed.
    #[serde(alias = "page")]
    pub page_id: PageId,
    /// Story owning the page.
    #[serde(alias = "storyID")]
    pub story_id: String,
    /// Raw editor content; absent for deletions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

/// Payload of `fetchAssociations`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryRequest {
    /// Story whose associations are requested.
    #[serde(alias = "storyID")]
    pub story_id: String,
}

/// Payload of `newAssociation`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssociationRequest {
    /// Display name matched in page text.
    pub name: String,
    /// Association kind (character, place, event, ...).
    #[serde(rename = "type")]
    pub kind: i32,
    /// Story the association belongs to.
    #[serde(alias = "storyID")]
    pub story_id: String,
}

/// A named entity linked to a story.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Association {
    /// Store-assigned id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Association kind.
    #[serde(rename = "type")]
    pub kind: i32,
    /// Owning story.
    pub story_id: String,
    /// Free-form details (aliases, description, ...).
    #[serde(default = "empty_details")]
    pub details: Value,
}

impl Association {
    /// Creates an association with empty details.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        kind: i32,
        story_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            story_id: story_id.into(),
            details: empty_details(),
        }
    }
}

fn empty_details() -> Value {
    Value::Object(serde_json::Map::new())
}
