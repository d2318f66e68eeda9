//! Test helpers for integration tests
//!
//! Provides a relay bound to an ephemeral port, an HTTP client for the plain
//! routes, and a WebSocket client wrapper.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use relay_common::RelayConfig;
use relay_gateway::broadcast::{BroadcastConfig, Broadcaster};
use relay_gateway::connection::{ConnectionError, Registry, Session};
use relay_gateway::directory::SessionDirectory;
use relay_gateway::handlers::relay_handlers;
use relay_gateway::server::{create_app, RelayServer, RelayState, ServerOptions};
use reqwest::{Client, Response};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

/// How long a test waits for a frame before giving up
pub const RECV_TIMEOUT: Duration = Duration::from_secs(2);

static DIR_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Why a connection ended, as seen by the on-error callback
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObservedError {
    PeerClosed,
    ClosedByServer(u16),
    PayloadTooLarge { size: usize, limit: usize },
    Transport,
}

impl From<&ConnectionError> for ObservedError {
    fn from(error: &ConnectionError) -> Self {
        match error {
            ConnectionError::PeerClosed { .. } => Self::PeerClosed,
            ConnectionError::ClosedByServer { code } => Self::ClosedByServer(*code),
            ConnectionError::PayloadTooLarge { size, limit } => Self::PayloadTooLarge {
                size: *size,
                limit: *limit,
            },
            ConnectionError::Transport(_) => Self::Transport,
        }
    }
}

/// Test server instance that manages lifecycle
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: Client,
    pub state: RelayState,
    pub static_dir: PathBuf,
    errors: mpsc::UnboundedReceiver<ObservedError>,
    _handle: JoinHandle<()>,
}

impl TestServer {
    /// Start a relay with default settings
    pub async fn start() -> Result<Self> {
        Self::start_with(&[]).await
    }

    /// Start a relay with extra `RELAY_*` variables
    pub async fn start_with(vars: &[(&str, &str)]) -> Result<Self> {
        let static_dir = unique_static_dir()?;

        let mut env: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        env.insert(
            "RELAY_STATIC_DIR".to_string(),
            static_dir.to_string_lossy().into_owned(),
        );

        let config = RelayConfig::from_lookup(|key| env.get(key).cloned())
            .map_err(|e| anyhow::anyhow!("Config error: {}", e))?;

        let (state, errors) = recording_state(&config);
        let app = create_app(state.clone(), &config.relay);

        // Bind to an ephemeral port
        let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
        let addr = listener.local_addr()?;

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        // Wait for server to be ready
        tokio::time::sleep(Duration::from_millis(50)).await;

        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;

        Ok(Self {
            addr,
            client,
            state,
            static_dir,
            errors,
            _handle: handle,
        })
    }

    /// Get base URL for the server
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the WebSocket URL
    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    /// Make a GET request
    pub async fn get(&self, path: &str) -> Result<Response> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self.client.get(&url).send().await?)
    }

    /// Open a WebSocket and wait until the relay has registered it
    pub async fn connect(&self) -> Result<WsClient> {
        let before = self.session_count();
        let (stream, _) = connect_async(self.ws_url()).await?;

        self.wait_for_sessions(before + 1).await?;

        Ok(WsClient { stream })
    }

    /// Number of sessions the relay currently holds
    pub fn session_count(&self) -> usize {
        self.state.server().session_count()
    }

    /// Poll until the registry and the directory both hold exactly `count` sessions
    pub async fn wait_for_sessions(&self, count: usize) -> Result<()> {
        tokio::time::timeout(RECV_TIMEOUT, async {
            while self.session_count() != count || self.state.directory().len() != count {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .with_context(|| {
            format!(
                "expected {} sessions, relay holds {}",
                count,
                self.session_count()
            )
        })
    }

    /// Wait for the next reason reported to on-error
    pub async fn next_error(&mut self) -> Result<ObservedError> {
        tokio::time::timeout(RECV_TIMEOUT, self.errors.recv())
            .await
            .context("timed out waiting for on_error")?
            .context("error channel closed")
    }

    /// Write a file into the static directory
    pub fn write_static(&self, name: &str, contents: &str) -> Result<()> {
        std::fs::write(self.static_dir.join(name), contents)?;
        Ok(())
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        std::fs::remove_dir_all(&self.static_dir).ok();
    }
}

/// The relay's default wiring, with on-error also reported to the test
fn recording_state(config: &RelayConfig) -> (RelayState, mpsc::UnboundedReceiver<ObservedError>) {
    let broadcaster = Broadcaster::new(Registry::new(), BroadcastConfig::from(&config.relay));
    let directory = SessionDirectory::new();
    let mut handlers = relay_handlers(broadcaster.clone(), directory.clone());

    let (tx, errors) = mpsc::unbounded_channel();
    let relay_on_error = handlers.on_error.clone();
    handlers.on_error = Arc::new(move |session: &Arc<Session>, error: &ConnectionError| {
        let _ = tx.send(ObservedError::from(error));
        relay_on_error(session, error);
    });

    let server = RelayServer::new_shared(broadcaster, handlers, ServerOptions::from(&config.relay));
    (RelayState::new(server, directory), errors)
}

fn unique_static_dir() -> Result<PathBuf> {
    let dir = std::env::temp_dir().join(format!(
        "relay-it-{}-{}",
        std::process::id(),
        DIR_COUNTER.fetch_add(1, Ordering::SeqCst)
    ));
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// A connected WebSocket client
pub struct WsClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsClient {
    /// Send a binary message
    pub async fn send(&mut self, payload: &[u8]) -> Result<()> {
        self.stream.send(Message::Binary(payload.to_vec())).await?;
        Ok(())
    }

    /// Send a text message
    pub async fn send_text(&mut self, text: &str) -> Result<()> {
        self.stream.send(Message::Text(text.to_string())).await?;
        Ok(())
    }

    /// Wait for the next data payload, skipping control frames
    pub async fn recv(&mut self) -> Result<Vec<u8>> {
        loop {
            let message = tokio::time::timeout(RECV_TIMEOUT, self.stream.next())
                .await
                .context("timed out waiting for message")?
                .context("connection ended")??;

            match message {
                Message::Binary(payload) => return Ok(payload),
                Message::Text(text) => return Ok(text.into_bytes()),
                Message::Close(frame) => anyhow::bail!("connection closed: {:?}", frame),
                _ => continue,
            }
        }
    }

    /// Assert that nothing arrives within `wait`
    pub async fn expect_silence(&mut self, wait: Duration) -> Result<()> {
        match tokio::time::timeout(wait, self.stream.next()).await {
            Err(_) => Ok(()),
            Ok(message) => anyhow::bail!("unexpected frame: {:?}", message),
        }
    }

    /// Wait for the relay to end the connection, returning the close code
    ///
    /// Returns `None` when the socket ended without a close frame.
    pub async fn closed(&mut self) -> Result<Option<u16>> {
        loop {
            let next = tokio::time::timeout(RECV_TIMEOUT, self.stream.next())
                .await
                .context("timed out waiting for close")?;

            match next {
                Some(Ok(Message::Close(frame))) => return Ok(frame.map(|f| u16::from(f.code))),
                Some(Ok(_)) => continue,
                Some(Err(_)) | None => return Ok(None),
            }
        }
    }

    /// Close the connection from the client side
    pub async fn close(mut self) -> Result<()> {
        self.stream.close(None).await?;
        Ok(())
    }
}

