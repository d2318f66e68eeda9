//! Default relay behavior
//!
//! Rebroadcasts every message to the other clients and keeps the session
//! directory in step with connects and disconnects.

use super::LifecycleHandlers;
use crate::broadcast::Broadcaster;
use crate::connection::{ConnectionError, Session};
use crate::directory::SessionDirectory;
use std::sync::Arc;

/// Build the handlers the relay binary runs with
pub fn relay_handlers(broadcaster: Broadcaster, directory: SessionDirectory) -> LifecycleHandlers {
    let on_connect = {
        let directory = directory.clone();
        move |session: &Arc<Session>| {
            if let Some(previous) = directory.insert(session) {
                tracing::warn!(
                    session_id = %session.id(),
                    previous_serial = previous.serial(),
                    "Session id collision, directory entry replaced"
                );
            }
            tracing::info!(
                session_id = %session.id(),
                host = session.host().unwrap_or("-"),
                "Client connected"
            );
        }
    };

    let on_message = move |session: &Arc<Session>, payload: &[u8]| {
        tracing::debug!(
            session_id = %session.id(),
            message = %String::from_utf8_lossy(payload),
            "Message received"
        );
        broadcaster.broadcast_others(session, payload);
    };

    let on_disconnect = move |session: &Arc<Session>| {
        directory.remove(session);
        tracing::info!(session_id = %session.id(), "Client disconnected");
    };

    let on_error = |session: &Arc<Session>, error: &ConnectionError| {
        if error.is_disconnect() {
            tracing::debug!(session_id = %session.id(), reason = %error, "Connection ended");
        } else {
            tracing::warn!(session_id = %session.id(), error = %error, "Connection error");
        }
    };

    LifecycleHandlers::new(on_connect, on_message, on_disconnect, on_error)
}
