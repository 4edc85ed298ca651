//! Hub builder and the coordination loop.
//!
//! The [`Hub`] is the single owner of the live-session set and the command
//! table. Every register, unregister and inbound message travels through one
//! FIFO queue into [`Hub::run`], which handles them one at a time. That
//! queue is the only synchronization: nothing else touches the session map.

use crate::dispatcher::CommandTable;
use crate::error::ServerError;
use crate::session::{Outbound, Session, SessionId, SessionRegistry};
use std::time::Duration;
use storyhub_core::Envelope;
use tokio::sync::mpsc::error::SendTimeoutError;
use tokio::sync::{mpsc, oneshot};

/// Tunables for a hub and the connections it serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HubConfig {
    /// Capacity of the intake queue shared by all producers.
    pub intake_capacity: usize,
    /// Capacity of each session's outbound queue.
    pub outbound_capacity: usize,
    /// Longest the loop waits on a full outbound queue before dropping a response.
    pub delivery_timeout: Duration,
    /// Maximum length of one inbound line on a connection.
    pub max_frame_length: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            intake_capacity: 1024,
            outbound_capacity: 256,
            delivery_timeout: Duration::from_millis(50),
            max_frame_length: 1024 * 1024,
        }
    }
}

/// Builder for configuring and creating a hub.
pub struct HubBuilder {
    commands: CommandTable,
    config: HubConfig,
}

impl HubBuilder {
    /// Creates a builder dispatching to `commands`, with default settings.
    #[must_use]
    pub fn new(commands: CommandTable) -> Self {
        Self {
            commands,
            config: HubConfig::default(),
        }
    }

    /// Replaces the whole configuration.
    #[must_use]
    pub fn config(mut self, config: HubConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the intake queue capacity.
    #[must_use]
    pub fn intake_capacity(mut self, capacity: usize) -> Self {
        self.config.intake_capacity = capacity;
        self
    }

    /// Sets the per-session outbound queue capacity.
    #[must_use]
    pub fn outbound_capacity(mut self, capacity: usize) -> Self {
        self.config.outbound_capacity = capacity;
        self
    }

    /// Sets the delivery timeout.
    #[must_use]
    pub fn delivery_timeout(mut self, timeout: Duration) -> Self {
        self.config.delivery_timeout = timeout;
        self
    }

    /// Sets the maximum inbound line length.
    #[must_use]
    pub fn max_frame_length(mut self, length: usize) -> Self {
        self.config.max_frame_length = length;
        self
    }

    /// Builds the hub and its handle.
    #[must_use]
    pub fn build(self) -> (Hub, HubHandle) {
        let mut config = self.config;
        config.intake_capacity = config.intake_capacity.max(1);
        config.outbound_capacity = config.outbound_capacity.max(1);

        let (tx, rx) = mpsc::channel(config.intake_capacity);

        let hub = Hub {
            commands: self.commands,
            sessions: SessionRegistry::new(),
            config,
            rx,
            stats: HubStats::default(),
        };

        (hub, HubHandle { tx, config })
    }
}

/// Events drained by the hub loop.
#[derive(Debug)]
pub enum HubEvent {
    /// Add a session to the live set.
    Register(Session),
    /// Remove a session from the live set.
    Unregister(SessionId),
    /// Raw message received from a session.
    Inbound {
        /// Originating session.
        session: SessionId,
        /// Undecoded envelope bytes.
        payload: Vec<u8>,
    },
    /// Report a statistics snapshot.
    Stats(oneshot::Sender<HubStats>),
    /// Stop the loop, closing every live session.
    Shutdown,
}

/// Counters reported by [`HubHandle::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HubStats {
    /// Sessions currently registered.
    pub live_sessions: usize,
    /// Inbound messages that reached a handler or the unknown-command reply.
    pub dispatched: u64,
    /// Inbound messages dropped before dispatch.
    pub dropped: u64,
    /// Responses that could not be delivered.
    pub undelivered: u64,
}

/// The coordination loop.
pub struct Hub {
    commands: CommandTable,
    sessions: SessionRegistry,
    config: HubConfig,
    rx: mpsc::Receiver<HubEvent>,
    stats: HubStats,
}

impl Hub {
    /// Runs until [`HubHandle::shutdown`] is called or every handle is dropped.
    pub async fn run(mut self) {
        tracing::info!(
            commands = self.commands.len(),
            "Hub started with commands {:?}",
            self.commands.commands()
        );

        while let Some(event) = self.rx.recv().await {
            if let HubEvent::Shutdown = event {
                tracing::info!("Hub shutdown requested");
                break;
            }
            self.handle_event(event).await;
        }

        self.rx.close();
        let closed = self.sessions.clear();
        tracing::info!(closed, "Hub stopped");
    }

    async fn handle_event(&mut self, event: HubEvent) {
        match event {
            HubEvent::Register(session) => {
                let id = session.id();
                if self.sessions.insert(session) {
                    tracing::debug!(session = %id, "session registered");
                } else {
                    tracing::warn!(session = %id, "session already registered, ignoring");
                }
            }
            HubEvent::Unregister(id) => {
                if self.sessions.remove(id).is_some() {
                    tracing::debug!(session = %id, "session unregistered");
                }
            }
            HubEvent::Inbound { session, payload } => {
                self.handle_inbound(session, &payload).await;
            }
            HubEvent::Stats(reply) => {
                let mut stats = self.stats;
                stats.live_sessions = self.sessions.count();
                let _ = reply.send(stats);
            }
            HubEvent::Shutdown => {}
        }
    }

    async fn handle_inbound(&mut self, id: SessionId, payload: &[u8]) {
        if !self.sessions.contains(id) {
            tracing::debug!(session = %id, "message from unregistered session dropped");
            self.stats.dropped += 1;
            return;
        }

        let request = match Envelope::decode(payload) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(session = %id, "dropping message: {}", e);
                self.stats.dropped += 1;
                return;
            }
        };

        tracing::debug!(session = %id, command = %request.command, "dispatching");
        self.stats.dispatched += 1;

        if let Some(response) = self.commands.dispatch(request).await {
            self.deliver(id, response).await;
        }
    }

    async fn deliver(&mut self, id: SessionId, response: Envelope) {
        let Some(tx) = self.sessions.get(id).map(|s| s.sender().clone()) else {
            self.stats.undelivered += 1;
            return;
        };

        match tx.send_timeout(response, self.config.delivery_timeout).await {
            Ok(()) => {}
            Err(SendTimeoutError::Timeout(response)) => {
                tracing::warn!(
                    session = %id,
                    command = %response.command,
                    "outbound queue full, response dropped"
                );
                self.stats.undelivered += 1;
            }
            Err(SendTimeoutError::Closed(response)) => {
                tracing::info!(
                    session = %id,
                    command = %response.command,
                    "session gone, response dropped"
                );
                self.sessions.remove(id);
                self.stats.undelivered += 1;
            }
        }
    }
}

/// Cloneable producer side of a hub.
#[derive(Debug, Clone)]
pub struct HubHandle {
    tx: mpsc::Sender<HubEvent>,
    config: HubConfig,
}

impl HubHandle {
    /// Returns the hub configuration.
    #[must_use]
    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Creates a session sized for this hub. Register it with [`HubHandle::register`].
    #[must_use]
    pub fn new_session(&self) -> (Session, Outbound) {
        Session::new(self.config.outbound_capacity)
    }

    /// Adds a session to the live set.
    ///
    /// # Errors
    /// Returns `ServerError::Closed` if the hub has stopped.
    pub async fn register(&self, session: Session) -> Result<(), ServerError> {
        self.send(HubEvent::Register(session)).await
    }

    /// Removes a session and closes its outbound queue. Unknown ids are ignored.
    ///
    /// # Errors
    /// Returns `ServerError::Closed` if the hub has stopped.
    pub async fn unregister(&self, session: SessionId) -> Result<(), ServerError> {
        self.send(HubEvent::Unregister(session)).await
    }

    /// Queues a raw message from `session` for dispatch.
    ///
    /// Waits only for queue space, never for the handler.
    ///
    /// # Errors
    /// Returns `ServerError::Closed` if the hub has stopped.
    pub async fn submit(
        &self,
        session: SessionId,
        payload: impl Into<Vec<u8>>,
    ) -> Result<(), ServerError> {
        self.send(HubEvent::Inbound {
            session,
            payload: payload.into(),
        })
        .await
    }

    /// Returns a statistics snapshot, taken in queue order.
    ///
    /// # Errors
    /// Returns `ServerError::Closed` if the hub has stopped.
    pub async fn stats(&self) -> Result<HubStats, ServerError> {
        let (reply, rx) = oneshot::channel();
        self.send(HubEvent::Stats(reply)).await?;
        rx.await.map_err(|_| ServerError::Closed)
    }

    /// Requests hub shutdown after already queued events.
    ///
    /// # Errors
    /// Returns `ServerError::Closed` if the hub has stopped.
    pub async fn shutdown(&self) -> Result<(), ServerError> {
        self.send(HubEvent::Shutdown).await
    }

    /// Returns true once the hub loop has stopped.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    async fn send(&self, event: HubEvent) -> Result<(), ServerError> {
        self.tx.send(event).await.map_err(|_| ServerError::Closed)
    }
}
