//! # StoryHub Bench
//!
//! Fixtures shared by the StoryHub benchmarks.

use std::sync::Arc;
use storyhub_server::{
    CommandTable, HubBuilder, HubHandle, InMemoryStore, Outbound, ServerError, SessionId,
    story_commands,
};

/// Raw `savePage` request for page `n` of story `bench`.
#[must_use]
pub fn save_page_request(n: u64) -> Vec<u8> {
    serde_json::json!({
        "command": "savePage",
        "data": {
            "pageId": n.to_string(),
            "storyId": "bench",
            "body": {"blocks": [{"text": "It was a dark and stormy night."}]}
        }
    })
    .to_string()
    .into_bytes()
}

/// Story command table over a fresh in-memory store.
///
/// # Errors
/// Returns `ServerError` if the table fails validation.
pub fn story_table() -> Result<(Arc<InMemoryStore>, CommandTable), ServerError> {
    let store = Arc::new(InMemoryStore::new());
    let table = story_commands(store.clone())?;
    Ok((store, table))
}

/// Starts a story hub on the current runtime with one registered session.
///
/// # Errors
/// Returns `ServerError` if the table is invalid or the hub stopped early.
pub async fn start_story_hub() -> Result<(HubHandle, SessionId, Outbound), ServerError> {
    let (_store, table) = story_table()?;
    let (hub, handle) = HubBuilder::new(table).build();
    tokio::spawn(hub.run());

    let (session, outbound) = handle.new_session();
    let id = session.id();
    handle.register(session).await?;
    Ok((handle, id, outbound))
}

#[cfg(test)]
mod tests {
    use super::*;
    use storyhub_core::Envelope;

    #[test]
    fn test_save_page_request_decodes() {
        let envelope = Envelope::decode(&save_page_request(7)).unwrap();
        assert_eq!(envelope.command, "savePage");
        assert_eq!(envelope.data.unwrap()["pageId"], "7");
    }

    #[tokio::test]
    async fn test_start_story_hub_round_trip() {
        let (handle, id, mut outbound) = start_story_hub().await.unwrap();

        handle.submit(id, save_page_request(1)).await.unwrap();
        assert_eq!(outbound.recv().await.unwrap().command, "saveSuccessful");
    }
}
