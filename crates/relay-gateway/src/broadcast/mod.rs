//! Message broadcasting
//!
//! Concurrent fan-out of one session's messages to every other session.

mod broadcaster;

pub use broadcaster::{BroadcastConfig, Broadcaster};
