//! Connection lifecycle state

/// Lifecycle of one connection
///
/// `Accepted → Registered → Active → Closing → Closed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// Upgrade completed, session not yet registered
    Accepted,
    /// In the registry, on-connect running
    Registered,
    /// Receive loop running
    Active,
    /// Receive loop ended, cleanup pending
    Closing,
    /// Removed from the registry, on-disconnect has run
    Closed,
}

impl ConnectionState {
    /// Check if the connection still counts as live
    #[must_use]
    pub const fn is_live(self) -> bool {
        matches!(self, Self::Registered | Self::Active)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Accepted => "accepted",
            Self::Registered => "registered",
            Self::Active => "active",
            Self::Closing => "closing",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}
