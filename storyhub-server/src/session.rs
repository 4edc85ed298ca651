//! Session handles and the live-session set.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use storyhub_core::Envelope;
use tokio::sync::mpsc;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identity of one client connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    /// Allocates a process-unique session id.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A connected client as seen by the hub.
///
/// Holds the only sender of the session's outbound channel. Moving the
/// session into the hub hands over that sender, so the channel closes when
/// the hub drops the session.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    tx: mpsc::Sender<Envelope>,
}

impl Session {
    /// Creates a session with a fresh id and an outbound channel of `capacity`.
    #[must_use]
    pub fn new(capacity: usize) -> (Self, Outbound) {
        Self::with_id(SessionId::next(), capacity)
    }

    /// Creates a session with a caller-chosen id.
    #[must_use]
    pub fn with_id(id: SessionId, capacity: usize) -> (Self, Outbound) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { id, tx }, Outbound { id, rx })
    }

    /// Returns the session id.
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    pub(crate) fn sender(&self) -> &mpsc::Sender<Envelope> {
        &self.tx
    }
}

/// Receiving half of a session's outbound channel.
///
/// This is the transport write handle: a writer task drains it and pushes
/// each envelope to the client. `recv` yields `None` once the session has
/// been unregistered and every queued envelope was consumed.
#[derive(Debug)]
pub struct Outbound {
    id: SessionId,
    rx: mpsc::Receiver<Envelope>,
}

impl Outbound {
    /// Returns the id of the owning session.
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Waits for the next response.
    pub async fn recv(&mut self) -> Option<Envelope> {
        self.rx.recv().await
    }

    /// Non-blocking receive.
    pub fn try_recv(&mut self) -> Option<Envelope> {
        self.rx.try_recv().ok()
    }

    /// Returns true once the hub has dropped the session and the queue is empty.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.rx.is_closed() && self.rx.is_empty()
    }
}

/// The live-session set.
///
/// Owned exclusively by the hub loop, so it needs no interior locking.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<SessionId, Session>,
}

impl SessionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a session.
    ///
    /// Returns false, dropping `session`, if its id is already live.
    pub fn insert(&mut self, session: Session) -> bool {
        if self.sessions.contains_key(&session.id) {
            return false;
        }
        self.sessions.insert(session.id, session);
        true
    }

    /// Removes a session, closing its outbound channel.
    pub fn remove(&mut self, id: SessionId) -> Option<Session> {
        self.sessions.remove(&id)
    }

    /// Gets a live session by id.
    #[must_use]
    pub fn get(&self, id: SessionId) -> Option<&Session> {
        self.sessions.get(&id)
    }

    /// Returns true if the session is live.
    #[must_use]
    pub fn contains(&self, id: SessionId) -> bool {
        self.sessions.contains_key(&id)
    }

    /// Returns the number of live sessions.
    #[must_use]
    pub fn count(&self) -> usize {
        self.sessions.len()
    }

    /// Returns all live session ids.
    #[must_use]
    pub fn session_ids(&self) -> Vec<SessionId> {
        self.sessions.keys().copied().collect()
    }

    /// Drops every session and returns how many were live.
    pub fn clear(&mut self) -> usize {
        let count = self.sessions.len();
        self.sessions.clear();
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_ids_are_unique() {
        let (first, _rx1) = Session::new(4);
        let (second, _rx2) = Session::new(4);

        assert_ne!(first.id(), second.id());
    }

    #[test]
    fn test_insert_and_count() {
        let mut registry = SessionRegistry::new();
        let (first, _rx1) = Session::new(4);
        let (second, _rx2) = Session::new(4);

        assert!(registry.insert(first));
        assert!(registry.insert(second));
        assert_eq!(registry.count(), 2);
    }

    #[test]
    fn test_duplicate_insert_is_rejected() {
        let mut registry = SessionRegistry::new();
        let id = SessionId::next();
        let (original, mut original_rx) = Session::with_id(id, 4);
        let (duplicate, duplicate_rx) = Session::with_id(id, 4);

        assert!(registry.insert(original));
        assert!(!registry.insert(duplicate));
        assert_eq!(registry.count(), 1);

        // The rejected duplicate is dropped, the live entry keeps its channel.
        assert!(duplicate_rx.is_closed());
        assert!(!original_rx.is_closed());
        assert!(original_rx.try_recv().is_none());
    }

    #[test]
    fn test_remove_closes_outbound() {
        let mut registry = SessionRegistry::new();
        let (session, outbound) = Session::new(4);
        let id = session.id();
        registry.insert(session);

        assert!(registry.remove(id).is_some());
        assert!(outbound.is_closed());
        assert!(registry.remove(id).is_none());
        assert_eq!(registry.count(), 0);
    }

    #[test]
    fn test_get_session() {
        let mut registry = SessionRegistry::new();
        let (session, outbound) = Session::new(4);
        let id = session.id();
        registry.insert(session);

        let live = registry.get(id).unwrap();
        assert_eq!(live.id(), id);
        assert_eq!(outbound.id(), id);
        assert!(registry.contains(id));
        assert_eq!(registry.session_ids(), vec![id]);
    }

    #[test]
    fn test_clear() {
        let mut registry = SessionRegistry::new();
        let (first, rx1) = Session::new(4);
        let (second, rx2) = Session::new(4);
        registry.insert(first);
        registry.insert(second);

        assert_eq!(registry.clear(), 2);
        assert!(rx1.is_closed());
        assert!(rx2.is_closed());
    }

    #[tokio::test]
    async fn test_outbound_drains_after_close() {
        let (session, mut outbound) = Session::new(4);
        session
            .sender()
            .send(Envelope::new("saveSuccessful"))
            .await
            .unwrap();
        drop(session);

        assert_eq!(outbound.recv().await, Some(Envelope::new("saveSuccessful")));
        assert_eq!(outbound.recv().await, None);
    }
}
