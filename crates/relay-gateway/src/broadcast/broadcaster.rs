//! Broadcast engine
//!
//! Fans a payload out to every registered session except the sender.

use crate::connection::{Registry, Session};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Configuration for the broadcaster
#[derive(Debug, Clone, Default)]
pub struct BroadcastConfig {
    /// Maximum number of sends running at once; `None` leaves fan-out unbounded
    pub max_in_flight: Option<usize>,
}

/// Delivers payloads to registered sessions
///
/// Every recipient gets its own task. Callers never wait for delivery and a
/// failed send is only logged: it neither stops the other sends nor closes the
/// recipient, whose own receive loop is responsible for noticing the failure.
#[derive(Clone)]
pub struct Broadcaster {
    /// Sessions to deliver to
    registry: Registry,
    /// Bounds concurrent sends when configured
    limiter: Option<Arc<Semaphore>>,
    /// Configured bound, kept for reporting
    max_in_flight: Option<usize>,
}

impl Broadcaster {
    /// Create a new broadcaster over a registry
    pub fn new(registry: Registry, config: BroadcastConfig) -> Self {
        Self {
            registry,
            limiter: config
                .max_in_flight
                .map(|permits| Arc::new(Semaphore::new(permits))),
            max_in_flight: config.max_in_flight,
        }
    }

    /// Get the registry this broadcaster delivers to
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Get the configured bound on concurrent sends
    pub fn in_flight_limit(&self) -> Option<usize> {
        self.max_in_flight
    }

    /// Send `payload` to every registered session other than `sender`
    ///
    /// Must be called from within a Tokio runtime. Returns the number of sends
    /// dispatched; it says nothing about how many will succeed.
    pub fn broadcast_others(&self, sender: &Session, payload: &[u8]) -> usize {
        let payload: Arc<[u8]> = Arc::from(payload);
        let mut dispatched = 0;

        self.registry.for_each(|peer| {
            if peer.serial() == sender.serial() {
                return;
            }
            self.spawn_send(Arc::clone(peer), Arc::clone(&payload));
            dispatched += 1;
        });

        tracing::trace!(
            session_id = %sender.id(),
            bytes = payload.len(),
            recipients = dispatched,
            "Broadcast dispatched"
        );

        dispatched
    }

    fn spawn_send(&self, peer: Arc<Session>, payload: Arc<[u8]>) {
        let limiter = self.limiter.clone();

        tokio::spawn(async move {
            let _permit = match limiter {
                Some(limiter) => match limiter.acquire_owned().await {
                    Ok(permit) => Some(permit),
                    Err(_) => return,
                },
                None => None,
            };

            if let Err(e) = peer.write(&payload).await {
                tracing::warn!(
                    session_id = %peer.id(),
                    error = %e,
                    "Broadcast send failed"
                );
            }
        });
    }
}

impl std::fmt::Debug for Broadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Broadcaster")
            .field("registry", &self.registry)
            .field("max_in_flight", &self.max_in_flight)
            .finish()
    }
}
