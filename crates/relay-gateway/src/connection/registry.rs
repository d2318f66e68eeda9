//! Session registry
//!
//! The authoritative set of live sessions, behind a single reader/writer lock.

use super::Session;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Set of live sessions keyed by serial
///
/// Cloning is cheap and yields a handle to the same set. Adds and removes take
/// the write lock; iteration takes the read lock, so a session whose removal
/// has begun is never visited. A session added while a broadcast is iterating
/// may or may not see that broadcast.
#[derive(Clone, Default)]
pub struct Registry {
    sessions: Arc<RwLock<HashMap<u64, Arc<Session>>>>,
}

impl Registry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session
    pub fn add(&self, session: Arc<Session>) {
        let session_id = session.id().to_string();
        let serial = session.serial();
        self.sessions.write().insert(serial, session);

        tracing::debug!(session_id = %session_id, serial = serial, "Session registered");
    }

    /// Unregister a session; removing an absent session is a no-op
    pub fn remove(&self, session: &Session) -> bool {
        let removed = self.sessions.write().remove(&session.serial()).is_some();

        if removed {
            tracing::debug!(
                session_id = %session.id(),
                serial = session.serial(),
                "Session unregistered"
            );
        }

        removed
    }

    /// Copy of the current members
    pub fn snapshot(&self) -> Vec<Arc<Session>> {
        self.sessions.read().values().cloned().collect()
    }

    /// Visit every member while holding the read lock
    ///
    /// `f` must not call back into the registry's write path.
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&Arc<Session>),
    {
        for session in self.sessions.read().values() {
            f(session);
        }
    }

    /// Check if a session is registered
    pub fn contains(&self, session: &Session) -> bool {
        self.sessions.read().contains_key(&session.serial())
    }

    /// All registered sessions carrying this id
    pub fn find_by_id(&self, id: &str) -> Vec<Arc<Session>> {
        self.sessions
            .read()
            .values()
            .filter(|s| s.id() == id)
            .cloned()
            .collect()
    }

    /// Get the number of live sessions
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    /// Check if no sessions are registered
    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("sessions", &self.len())
            .finish()
    }
}
