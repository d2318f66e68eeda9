//! A single relay session
//!
//! Wraps one live WebSocket connection together with its generated identity.

use super::{ConnectionState, SendError};
use crate::protocol::CloseCode;
use axum::extract::ws::Message;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, watch};

/// Source of process-unique session serials
static NEXT_SERIAL: AtomicU64 = AtomicU64::new(1);

/// Server-side handle for one connected client
///
/// Outgoing frames go through a bounded channel drained by the connection's
/// writer task; the session itself never touches the socket.
pub struct Session {
    /// Generated identity (unique with high probability only)
    id: String,

    /// Process-unique key, distinguishes sessions that share an id
    serial: u64,

    /// `Host` header of the upgrade request
    host: Option<String>,

    /// Lifecycle state
    state: RwLock<ConnectionState>,

    /// Channel to the writer task
    outbound: mpsc::Sender<Message>,

    /// Requested close status; `Some` once closing has started
    close_status: watch::Sender<Option<u16>>,

    /// Set once the session has been released from the registry
    released: AtomicBool,

    /// Session creation time
    created_at: Instant,
}

impl Session {
    /// Create a new session
    pub fn new(id: String, host: Option<String>, outbound: mpsc::Sender<Message>) -> Arc<Self> {
        let (close_status, _) = watch::channel(None);

        Arc::new(Self {
            id,
            serial: NEXT_SERIAL.fetch_add(1, Ordering::Relaxed),
            host,
            state: RwLock::new(ConnectionState::Accepted),
            outbound,
            close_status,
            released: AtomicBool::new(false),
            created_at: Instant::now(),
        })
    }

    /// Get the session ID
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get the process-unique serial
    pub fn serial(&self) -> u64 {
        self.serial
    }

    /// Get the host the client connected to
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    /// Get the current state
    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    pub(crate) fn set_state(&self, state: ConnectionState) {
        *self.state.write() = state;
    }

    /// Get session age
    pub fn age(&self) -> std::time::Duration {
        self.created_at.elapsed()
    }

    /// Queue a binary message for this session
    ///
    /// Returns the number of bytes queued. Waits if the outbound queue is full.
    pub async fn write(&self, payload: &[u8]) -> Result<usize, SendError> {
        if self.is_closing() {
            return Err(SendError::Closed(self.id.clone()));
        }

        self.outbound
            .send(Message::Binary(payload.to_vec()))
            .await
            .map_err(|_| SendError::Closed(self.id.clone()))?;

        Ok(payload.len())
    }

    /// Close the connection with a status code
    ///
    /// Wakes the receive loop and makes the writer send a close frame.
    /// Only the first call has an effect; returns whether this call started the close.
    pub fn close_with_status(&self, code: impl Into<u16>) -> bool {
        let code = code.into();
        let started = self.close_status.send_if_modified(|status| {
            if status.is_some() {
                return false;
            }
            *status = Some(code);
            true
        });

        if started {
            tracing::debug!(session_id = %self.id, code = code, "Session close requested");
        }

        started
    }

    /// Check if closing has started
    pub fn is_closing(&self) -> bool {
        self.close_status.borrow().is_some()
    }

    /// Get the requested close status, if any
    pub fn close_status(&self) -> Option<u16> {
        *self.close_status.borrow()
    }

    /// Wait until a close is requested and return its status
    pub async fn closed(&self) -> u16 {
        let mut rx = self.close_status.subscribe();
        let status = rx.wait_for(Option::is_some).await.map(|code| *code);

        status
            .ok()
            .flatten()
            .unwrap_or(CloseCode::GoingAway.as_u16())
    }

    /// Mark the session released; true only for the first caller
    pub(crate) fn release(&self) -> bool {
        !self.released.swap(true, Ordering::SeqCst)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("serial", &self.serial)
            .field("host", &self.host)
            .field("state", &self.state())
            .field("created_at", &self.created_at)
            .finish()
    }
}
