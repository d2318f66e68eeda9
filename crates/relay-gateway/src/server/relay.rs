//! Relay server core
//!
//! Owns the registry, the broadcaster and the lifecycle handlers.

use crate::broadcast::{BroadcastConfig, Broadcaster};
use crate::connection::{ConnectionState, Registry, Session, DEFAULT_ID_LENGTH};
use crate::handlers::LifecycleHandlers;
use crate::protocol::CloseCode;
use relay_common::RelaySettings;
use std::sync::Arc;

/// Per-connection limits
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Largest accepted message, in bytes
    pub max_payload_bytes: usize,
    /// Length of generated session ids
    pub id_length: usize,
    /// Per-session outbound queue capacity
    pub outbound_buffer: usize,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            max_payload_bytes: 1024 * 1024,
            id_length: DEFAULT_ID_LENGTH,
            outbound_buffer: 100,
        }
    }
}

impl From<&RelaySettings> for ServerOptions {
    fn from(settings: &RelaySettings) -> Self {
        Self {
            max_payload_bytes: settings.max_payload_bytes,
            id_length: settings.id_length,
            outbound_buffer: settings.outbound_buffer,
        }
    }
}

impl From<&RelaySettings> for BroadcastConfig {
    fn from(settings: &RelaySettings) -> Self {
        Self {
            max_in_flight: settings.max_in_flight_sends,
        }
    }
}

/// The relay: accepts connections and routes their lifecycle events
pub struct RelayServer {
    pub(super) registry: Registry,
    pub(super) broadcaster: Broadcaster,
    pub(super) handlers: LifecycleHandlers,
    pub(super) options: ServerOptions,
}

impl RelayServer {
    /// Create a server delivering through `broadcaster`
    ///
    /// The broadcaster's registry becomes the server's registry, so handlers
    /// holding a clone of the broadcaster see the same sessions.
    pub fn new(broadcaster: Broadcaster, handlers: LifecycleHandlers, options: ServerOptions) -> Self {
        Self {
            registry: broadcaster.registry().clone(),
            broadcaster,
            handlers,
            options,
        }
    }

    /// Create a new server wrapped in Arc
    pub fn new_shared(
        broadcaster: Broadcaster,
        handlers: LifecycleHandlers,
        options: ServerOptions,
    ) -> Arc<Self> {
        Arc::new(Self::new(broadcaster, handlers, options))
    }

    /// Get the session registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Get the broadcaster
    pub fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    /// Get the connection limits
    pub fn options(&self) -> &ServerOptions {
        &self.options
    }

    /// Get the number of live sessions
    pub fn session_count(&self) -> usize {
        self.registry.len()
    }

    /// Send `payload` to every session except `sender`, without waiting
    pub fn broadcast_others(&self, sender: &Session, payload: &[u8]) -> usize {
        self.broadcaster.broadcast_others(sender, payload)
    }

    /// Ask a live session to close normally
    ///
    /// Only wakes the connection's receive loop, which then runs on-error,
    /// unregisters the session and runs on-disconnect in that order. Returns
    /// false if closing had already started.
    pub fn close(&self, session: &Session) -> bool {
        session.close_with_status(CloseCode::Normal)
    }

    /// Unregister a session, then run on-disconnect
    ///
    /// Idempotent; only the first call for a session has any effect and the
    /// return value says whether this call was it. Also asks the writer to
    /// send a normal close frame if no other status was requested.
    pub(crate) fn release(&self, session: &Arc<Session>) -> bool {
        session.close_with_status(CloseCode::Normal);

        if !session.release() {
            return false;
        }

        self.registry.remove(session);
        session.set_state(ConnectionState::Closed);

        tracing::info!(
            session_id = %session.id(),
            age_ms = session.age().as_millis(),
            "Session closed"
        );

        self.handlers.disconnect(session);
        true
    }
}

impl std::fmt::Debug for RelayServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayServer")
            .field("registry", &self.registry)
            .field("broadcaster", &self.broadcaster)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
