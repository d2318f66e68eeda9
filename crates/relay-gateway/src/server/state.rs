//! Router state
//!
//! Shared handles passed to the route handlers.

use super::RelayServer;
use crate::directory::SessionDirectory;
use std::sync::Arc;

/// Relay application state
#[derive(Clone)]
pub struct RelayState {
    /// The relay every upgraded connection is handed to
    server: Arc<RelayServer>,
    /// Sessions tracked by id, maintained by the lifecycle handlers
    directory: SessionDirectory,
}

impl RelayState {
    /// Create a new relay state
    pub fn new(server: Arc<RelayServer>, directory: SessionDirectory) -> Self {
        Self { server, directory }
    }

    /// Get the relay server
    pub fn server(&self) -> &Arc<RelayServer> {
        &self.server
    }

    /// Get the session directory
    pub fn directory(&self) -> &SessionDirectory {
        &self.directory
    }
}

impl std::fmt::Debug for RelayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayState")
            .field("server", &self.server)
            .field("directory", &self.directory)
            .finish()
    }
}
