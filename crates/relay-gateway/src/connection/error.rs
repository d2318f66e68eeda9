//! Connection error types

use crate::protocol::CloseCode;
use thiserror::Error;
use tokio_tungstenite::tungstenite::error::{CapacityError, Error as WsError};

/// Boxed transport error
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Why a connection's receive loop ended
///
/// Every way out of the loop is reported through the on-error callback,
/// including an orderly close by either side.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The peer sent a close frame or the stream ended
    #[error("Connection closed by peer")]
    PeerClosed {
        /// Status code from the peer's close frame, if any
        code: Option<u16>,
    },

    /// `close_with_status` was called on the session
    #[error("Connection closed by server with status {code}")]
    ClosedByServer { code: u16 },

    /// A message exceeded the configured limit
    #[error("Payload of {size} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge { size: usize, limit: usize },

    /// Reading from the socket failed
    #[error("Transport error: {0}")]
    Transport(#[source] BoxError),
}

impl ConnectionError {
    /// Classify an error from the socket
    ///
    /// A message rejected by the transport's own size cap is reported as
    /// [`PayloadTooLarge`](Self::PayloadTooLarge); anything else is a
    /// transport failure.
    pub fn transport(err: impl Into<BoxError>) -> Self {
        let err = err.into();
        match message_too_long(&*err) {
            Some((size, limit)) => Self::PayloadTooLarge { size, limit },
            None => Self::Transport(err),
        }
    }

    /// Status code to put in the close frame sent back to the peer
    #[must_use]
    pub fn close_code(&self) -> u16 {
        match self {
            Self::PeerClosed { .. } => CloseCode::Normal.as_u16(),
            Self::ClosedByServer { code } => *code,
            Self::PayloadTooLarge { .. } => CloseCode::MessageTooBig.as_u16(),
            Self::Transport(_) => CloseCode::ProtocolError.as_u16(),
        }
    }

    /// Check if this is an orderly close rather than a failure
    #[must_use]
    pub fn is_disconnect(&self) -> bool {
        matches!(self, Self::PeerClosed { .. } | Self::ClosedByServer { .. })
    }
}

/// Find a transport capacity error anywhere in the source chain
fn message_too_long(err: &(dyn std::error::Error + 'static)) -> Option<(usize, usize)> {
    let mut current = Some(err);
    while let Some(err) = current {
        if let Some(WsError::Capacity(CapacityError::MessageTooLong { size, max_size })) =
            err.downcast_ref::<WsError>()
        {
            return Some((*size, *max_size));
        }
        current = err.source();
    }
    None
}

/// Errors from writing to a session
#[derive(Debug, Error)]
pub enum SendError {
    /// The session is closing or its writer has stopped
    #[error("Session {0} is closed")]
    Closed(String),
}
