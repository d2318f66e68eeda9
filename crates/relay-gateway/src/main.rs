//! Relay server entry point
//!
//! Run with:
//! ```bash
//! cargo run -p relay-gateway
//! ```
//!
//! Configuration is loaded from environment variables.

use relay_common::{try_init_tracing_with_config, AppResult, RelayConfig, TracingConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Run the server
    if let Err(e) = run().await {
        error!(error = %e, code = e.error_code(), "Relay failed");
        std::process::exit(1);
    }
}

async fn run() -> AppResult<()> {
    // Load configuration
    let config = RelayConfig::from_env()
        .inspect_err(|e| eprintln!("Failed to load configuration: {e}"))?;

    // Initialize tracing
    if let Err(e) = try_init_tracing_with_config(TracingConfig::for_environment(config.app.env)) {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    info!(
        name = %config.app.name,
        env = ?config.app.env,
        address = %config.server.address(),
        ws_path = %config.relay.ws_path,
        static_dir = %config.relay.static_dir,
        "Configuration loaded"
    );

    // Run the relay
    relay_gateway::run(config).await
}
