//! Session directory
//!
//! Tracks connected users by session id. Updated only from the on-connect and
//! on-disconnect callbacks; uses `DashMap` so lookups never contend with the
//! registry lock.

use crate::connection::Session;
use dashmap::DashMap;
use std::sync::Arc;

/// Connected sessions keyed by id
#[derive(Clone, Default)]
pub struct SessionDirectory {
    users: Arc<DashMap<String, Arc<Session>>>,
}

impl SessionDirectory {
    /// Create an empty directory
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a session, returning any session previously stored under its id
    pub fn insert(&self, session: &Arc<Session>) -> Option<Arc<Session>> {
        self.users
            .insert(session.id().to_string(), Arc::clone(session))
    }

    /// Forget a session
    ///
    /// Only removes the entry if it still belongs to this exact session, so
    /// a later session with a colliding id is left in place.
    pub fn remove(&self, session: &Session) -> bool {
        self.users
            .remove_if(session.id(), |_, current| current.serial() == session.serial())
            .is_some()
    }

    /// Look up a session by id
    pub fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.users.get(id).map(|entry| entry.clone())
    }

    /// Get the number of recorded sessions
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Check if the directory is empty
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl std::fmt::Debug for SessionDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionDirectory")
            .field("users", &self.users.len())
            .finish()
    }
}
