//! WebSocket handler
//!
//! Accepts upgraded connections and runs their receive and write loops.

use super::{RelayServer, RelayState};
use crate::connection::{generate_id, BoxError, ConnectionError, ConnectionState, Session};
use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket},
        State, WebSocketUpgrade,
    },
    http::{header, HeaderMap},
    response::IntoResponse,
};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use std::borrow::Cow;
use std::fmt::Display;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Hard ceiling on what the transport buffers
///
/// Never below the relay's payload limit, so oversized messages normally
/// reach the relay's own check and close with 1009.
const TRANSPORT_MAX_MESSAGE_BYTES: usize = 64 << 20;

/// WebSocket upgrade handler
pub async fn ws_handler(
    State(state): State<RelayState>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let host = headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);

    let server = state.server().clone();
    let transport_limit = server
        .options()
        .max_payload_bytes
        .max(TRANSPORT_MAX_MESSAGE_BYTES);

    ws.max_message_size(transport_limit)
        .max_frame_size(transport_limit)
        .on_upgrade(move |socket| async move { server.handle_connection(socket, host).await })
}

/// Releases the session on every exit from the connection handler
struct CloseGuard<'a> {
    server: &'a RelayServer,
    session: &'a Arc<Session>,
}

impl Drop for CloseGuard<'_> {
    fn drop(&mut self) {
        if !std::thread::panicking() {
            self.server.release(self.session);
            return;
        }

        // A panic escaping on-disconnect here would abort the process
        let released = panic::catch_unwind(AssertUnwindSafe(|| self.server.release(self.session)));
        if released.is_err() {
            tracing::error!(
                session_id = %self.session.id(),
                "on_disconnect panicked while unwinding"
            );
        }
    }
}

impl RelayServer {
    /// Serve one upgraded WebSocket until it ends
    pub async fn handle_connection(&self, socket: WebSocket, host: Option<String>) {
        let (sink, stream) = socket.split();
        self.serve_connection(sink, stream, host).await;
    }

    /// Serve a connection given as separate write and read halves
    ///
    /// Registers a new session, runs on-connect, then reads until the
    /// connection ends. On-error always receives the reason the loop ended;
    /// the session is then unregistered and on-disconnect runs exactly once.
    pub async fn serve_connection<K, S, E>(&self, sink: K, stream: S, host: Option<String>)
    where
        K: Sink<Message> + Unpin + Send + 'static,
        K::Error: Display + Send,
        S: Stream<Item = Result<Message, E>> + Unpin + Send,
        E: Into<BoxError>,
    {
        let (tx, rx) = mpsc::channel(self.options.outbound_buffer);
        let session = Session::new(generate_id(self.options.id_length), host, tx);

        let writer = tokio::spawn(write_loop(session.clone(), rx, sink));

        self.registry.add(session.clone());
        session.set_state(ConnectionState::Registered);
        let guard = CloseGuard {
            server: self,
            session: &session,
        };

        tracing::info!(
            session_id = %session.id(),
            host = session.host().unwrap_or("-"),
            "WebSocket connection established"
        );

        self.handlers.connect(&session);
        session.set_state(ConnectionState::Active);

        let reason = self.receive_loop(&session, stream).await;
        session.set_state(ConnectionState::Closing);

        if reason.is_disconnect() {
            tracing::debug!(session_id = %session.id(), reason = %reason, "Receive loop ended");
        } else {
            tracing::warn!(session_id = %session.id(), error = %reason, "Receive loop failed");
        }

        self.handlers.error(&session, &reason);
        session.close_with_status(reason.close_code());
        drop(guard);

        if let Err(e) = writer.await {
            tracing::error!(session_id = %session.id(), error = %e, "Writer task failed");
        }
    }

    /// Read frames until the connection ends, returning why it ended
    async fn receive_loop<S, E>(&self, session: &Arc<Session>, mut stream: S) -> ConnectionError
    where
        S: Stream<Item = Result<Message, E>> + Unpin,
        E: Into<BoxError>,
    {
        loop {
            let frame = tokio::select! {
                frame = stream.next() => frame,
                code = session.closed() => return ConnectionError::ClosedByServer { code },
            };

            let payload = match frame {
                Some(Ok(Message::Binary(payload))) => payload,
                Some(Ok(Message::Text(text))) => text.into_bytes(),
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
                Some(Ok(Message::Close(frame))) => {
                    return ConnectionError::PeerClosed {
                        code: frame.map(|f| f.code),
                    }
                }
                Some(Err(e)) => return ConnectionError::transport(e),
                None => return ConnectionError::PeerClosed { code: None },
            };

            if payload.len() > self.options.max_payload_bytes {
                return ConnectionError::PayloadTooLarge {
                    size: payload.len(),
                    limit: self.options.max_payload_bytes,
                };
            }

            self.handlers.message(session, &payload);
        }
    }
}

/// Drain the session's outbound queue into the socket
///
/// Once the session starts closing, flushes whatever is already queued, sends
/// the close frame and ends. Also ends when the socket rejects a write.
async fn write_loop<K>(session: Arc<Session>, mut outbound: mpsc::Receiver<Message>, mut sink: K)
where
    K: Sink<Message> + Unpin,
    K::Error: Display,
{
    loop {
        tokio::select! {
            biased;

            message = outbound.recv() => {
                let Some(message) = message else { break };
                if let Err(e) = sink.send(message).await {
                    tracing::warn!(
                        session_id = %session.id(),
                        error = %e,
                        "Failed to send message to WebSocket"
                    );
                    break;
                }
            }
            code = session.closed() => {
                if let Err(e) = flush_queued(&mut outbound, &mut sink).await {
                    tracing::debug!(
                        session_id = %session.id(),
                        error = %e,
                        "Failed to flush queued messages"
                    );
                    break;
                }

                let frame = CloseFrame {
                    code,
                    reason: Cow::Borrowed(""),
                };
                if let Err(e) = sink.send(Message::Close(Some(frame))).await {
                    tracing::debug!(
                        session_id = %session.id(),
                        error = %e,
                        "Failed to send close frame"
                    );
                }
                break;
            }
        }
    }

    // Close the socket when the loop ends
    let _ = sink.close().await;
}

/// Send every message already sitting in the queue
async fn flush_queued<K>(outbound: &mut mpsc::Receiver<Message>, sink: &mut K) -> Result<(), K::Error>
where
    K: Sink<Message> + Unpin,
{
    while let Ok(message) = outbound.try_recv() {
        sink.send(message).await?;
    }
    Ok(())
}
