//! Shared state handed to every connection task: the manager, the
//! security bundle, the rate limiter, the authenticator, and the audit
//! logger. Nothing here is mutated after the server starts except the
//! rate limiter's internal map and the connection-count gauge.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use bsrv_core::{BrowserManager, SessionLogger};
use bsrv_security::{Authenticator, RateLimiter, SecurityManager};
use tokio::sync::Mutex;

pub struct ServerState {
    pub manager: BrowserManager,
    pub security: SecurityManager,
    pub rate_limiter: Mutex<RateLimiter>,
    pub authenticator: Authenticator,
    /// Shared with the manager, which also emits events (navigation,
    /// interaction, session end) under this same logger.
    pub logger: Arc<SessionLogger>,
    pub max_connections: usize,
    active_connections: AtomicUsize,
}

impl ServerState {
    pub fn new(
        manager: BrowserManager,
        security: SecurityManager,
        rate_limiter: RateLimiter,
        authenticator: Authenticator,
        logger: Arc<SessionLogger>,
        max_connections: usize,
    ) -> Self {
        Self {
            manager,
            security,
            rate_limiter: Mutex::new(rate_limiter),
            authenticator,
            logger,
            max_connections,
            active_connections: AtomicUsize::new(0),
        }
    }

    /// Reserves a connection slot, failing once `max_connections` is
    /// reached. Release with [`ServerState::release_connection_slot`].
    pub fn try_acquire_connection_slot(&self) -> bool {
        let mut current = self.active_connections.load(Ordering::SeqCst);
        loop {
            if current >= self.max_connections {
                return false;
            }
            match self.active_connections.compare_exchange_weak(
                current,
                current + 1,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return true,
                Err(observed) => current = observed,
            }
        }
    }

    pub fn release_connection_slot(&self) {
        self.active_connections.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn active_connections(&self) -> usize {
        self.active_connections.load(Ordering::SeqCst)
    }
}

/// Wall-clock epoch seconds, the time unit threaded through every
/// timestamped event and deadline in this crate.
pub fn now_secs() -> f64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs_f64()
}
