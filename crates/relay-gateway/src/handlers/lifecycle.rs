//! Lifecycle callbacks
//!
//! The four user-supplied hooks a relay server invokes for every connection.

use crate::connection::{ConnectionError, Session};
use std::sync::Arc;

/// Invoked once a session is registered, before any message is read
pub type ConnectHandler = Arc<dyn Fn(&Arc<Session>) + Send + Sync>;

/// Invoked for each received message, on the sending connection's task
pub type MessageHandler = Arc<dyn Fn(&Arc<Session>, &[u8]) + Send + Sync>;

/// Invoked once after the session leaves the registry
pub type DisconnectHandler = Arc<dyn Fn(&Arc<Session>) + Send + Sync>;

/// Invoked with the reason the receive loop ended
pub type ErrorHandler = Arc<dyn Fn(&Arc<Session>, &ConnectionError) + Send + Sync>;

/// The set of lifecycle callbacks
///
/// Built once before serving and never mutated afterwards, so every
/// connection task reads it without synchronization. Callbacks run
/// synchronously on the connection's task; they may call
/// [`Broadcaster::broadcast_others`](crate::broadcast::Broadcaster::broadcast_others)
/// since that never blocks.
#[derive(Clone)]
pub struct LifecycleHandlers {
    pub on_connect: ConnectHandler,
    pub on_message: MessageHandler,
    pub on_disconnect: DisconnectHandler,
    pub on_error: ErrorHandler,
}

impl LifecycleHandlers {
    /// Create handlers from four callbacks
    pub fn new<C, M, D, E>(on_connect: C, on_message: M, on_disconnect: D, on_error: E) -> Self
    where
        C: Fn(&Arc<Session>) + Send + Sync + 'static,
        M: Fn(&Arc<Session>, &[u8]) + Send + Sync + 'static,
        D: Fn(&Arc<Session>) + Send + Sync + 'static,
        E: Fn(&Arc<Session>, &ConnectionError) + Send + Sync + 'static,
    {
        Self {
            on_connect: Arc::new(on_connect),
            on_message: Arc::new(on_message),
            on_disconnect: Arc::new(on_disconnect),
            on_error: Arc::new(on_error),
        }
    }

    /// Handlers that do nothing
    pub fn noop() -> Self {
        Self::new(|_| {}, |_, _| {}, |_| {}, |_, _| {})
    }

    pub(crate) fn connect(&self, session: &Arc<Session>) {
        tracing::trace!(session_id = %session.id(), "Dispatching on_connect");
        (self.on_connect)(session);
    }

    pub(crate) fn message(&self, session: &Arc<Session>, payload: &[u8]) {
        tracing::trace!(
            session_id = %session.id(),
            bytes = payload.len(),
            "Dispatching on_message"
        );
        (self.on_message)(session, payload);
    }

    pub(crate) fn disconnect(&self, session: &Arc<Session>) {
        tracing::trace!(session_id = %session.id(), "Dispatching on_disconnect");
        (self.on_disconnect)(session);
    }

    pub(crate) fn error(&self, session: &Arc<Session>, error: &ConnectionError) {
        tracing::trace!(session_id = %session.id(), error = %error, "Dispatching on_error");
        (self.on_error)(session, error);
    }
}

impl Default for LifecycleHandlers {
    fn default() -> Self {
        Self::noop()
    }
}

impl std::fmt::Debug for LifecycleHandlers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleHandlers").finish_non_exhaustive()
    }
}
