//! Relay server setup
//!
//! Provides the relay core, the WebSocket route, and the HTTP application around it.

mod handler;
mod relay;
mod state;

pub use handler::ws_handler;
pub use relay::{RelayServer, ServerOptions};
pub use state::RelayState;

use crate::broadcast::{BroadcastConfig, Broadcaster};
use crate::connection::Registry;
use crate::directory::SessionDirectory;
use crate::handlers::relay_handlers;
use axum::{routing::get, Router};
use relay_common::{AppError, AppResult, RelayConfig, RelaySettings};
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Create the relay router
pub fn create_router(ws_path: &str) -> Router<RelayState> {
    Router::new()
        .route(ws_path, get(ws_handler))
        .route("/health", get(health_check))
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

/// Build the complete application
///
/// Requests that match no route are served from the static directory.
pub fn create_app(state: RelayState, settings: &RelaySettings) -> Router {
    create_router(&settings.ws_path)
        .fallback_service(ServeDir::new(&settings.static_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Wire the relay with its default behavior
///
/// Every message is rebroadcast to all other clients and sessions are tracked
/// in a [`SessionDirectory`].
pub fn create_relay_state(config: &RelayConfig) -> RelayState {
    let broadcaster = Broadcaster::new(Registry::new(), BroadcastConfig::from(&config.relay));
    let directory = SessionDirectory::new();
    let handlers = relay_handlers(broadcaster.clone(), directory.clone());

    let server = RelayServer::new_shared(broadcaster, handlers, ServerOptions::from(&config.relay));

    RelayState::new(server, directory)
}

/// Run the relay server until Ctrl-C
pub async fn run_server(app: Router, addr: &str) -> AppResult<()> {
    tracing::info!("Starting relay server on {}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::bind(addr, e))?;

    tracing::info!("Relay listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(AppError::Server)?;

    tracing::info!("Relay server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to install Ctrl-C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

/// Run the complete relay with configuration
pub async fn run(config: RelayConfig) -> AppResult<()> {
    let addr = config.server.address();

    let state = create_relay_state(&config);
    let app = create_app(state, &config.relay);

    run_server(app, &addr).await
}
