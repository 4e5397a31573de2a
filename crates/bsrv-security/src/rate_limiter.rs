//! C4 — sliding-window per-client admission with temporary blocking.
//!
//! Time is passed in by the caller as epoch seconds rather than read from
//! the system clock internally, so the sliding window is deterministic to
//! test.

use std::collections::{HashMap, VecDeque};

#[derive(Debug, Clone, Default)]
struct ClientState {
    timestamps: VecDeque<f64>,
    blocked_until: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    pub window_secs: f64,
    pub limit: usize,
    pub cooldown_secs: f64,
}

impl RateLimiterConfig {
    pub fn per_minute(limit: usize) -> Self {
        Self { window_secs: 60.0, limit, cooldown_secs: 60.0 }
    }
}

pub struct RateLimiter {
    config: RateLimiterConfig,
    clients: HashMap<String, ClientState>,
}

impl RateLimiter {
    pub fn new(config: RateLimiterConfig) -> Self {
        Self { config, clients: HashMap::new() }
    }

    /// Returns `true` if the request is admitted.
    pub fn admit(&mut self, client: &str, now: f64) -> bool {
        let state = self.clients.entry(client.to_string()).or_default();
        drop_stale(&mut state.timestamps, now - self.config.window_secs);

        if let Some(blocked_until) = state.blocked_until {
            if now < blocked_until {
                return false;
            }
            state.blocked_until = None;
        }

        if state.timestamps.len() >= self.config.limit {
            state.blocked_until = Some(now + self.config.cooldown_secs);
            return false;
        }

        state.timestamps.push_back(now);
        true
    }

    /// Periodic sweep: drop clients whose activity is old enough that
    /// keeping their entry serves no purpose.
    pub fn cleanup(&mut self, now: f64) {
        let stale_before = now - 2.0 * self.config.window_secs;
        self.clients.retain(|_, state| {
            let block_active = state.blocked_until.is_some_and(|b| now < b);
            let has_recent = state.timestamps.back().is_some_and(|&t| t >= stale_before);
            block_active || has_recent
        });
    }

    #[cfg(test)]
    fn tracked_clients(&self) -> usize {
        self.clients.len()
    }
}

fn drop_stale(timestamps: &mut VecDeque<f64>, cutoff: f64) {
    while let Some(&front) = timestamps.front() {
        if front < cutoff {
            timestamps.pop_front();
        } else {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admits_up_to_limit_then_denies() {
        let mut limiter = RateLimiter::new(RateLimiterConfig::per_minute(3));
        assert!(limiter.admit("c", 0.0));
        assert!(limiter.admit("c", 0.1));
        assert!(limiter.admit("c", 0.2));
        assert!(!limiter.admit("c", 0.3));
    }

    #[test]
    fn blocked_client_stays_denied_through_cooldown() {
        let mut limiter = RateLimiter::new(RateLimiterConfig::per_minute(1));
        assert!(limiter.admit("c", 0.0));
        assert!(!limiter.admit("c", 0.1));
        assert!(!limiter.admit("c", 59.9));
        assert!(limiter.admit("c", 60.1));
    }

    #[test]
    fn window_slides_independently_of_block() {
        let mut limiter = RateLimiter::new(RateLimiterConfig::per_minute(2));
        assert!(limiter.admit("c", 0.0));
        assert!(limiter.admit("c", 30.0));
        assert!(!limiter.admit("c", 40.0));
        assert!(limiter.admit("c", 61.0));
    }

    #[test]
    fn clients_are_independent() {
        let mut limiter = RateLimiter::new(RateLimiterConfig::per_minute(1));
        assert!(limiter.admit("a", 0.0));
        assert!(limiter.admit("b", 0.0));
        assert!(!limiter.admit("a", 0.1));
    }

    #[test]
    fn cleanup_purges_long_idle_clients() {
        let mut limiter = RateLimiter::new(RateLimiterConfig::per_minute(5));
        limiter.admit("c", 0.0);
        assert_eq!(limiter.tracked_clients(), 1);
        limiter.cleanup(1000.0);
        assert_eq!(limiter.tracked_clients(), 0);
    }

    #[test]
    fn cleanup_keeps_active_block() {
        let mut limiter = RateLimiter::new(RateLimiterConfig::per_minute(1));
        limiter.admit("c", 0.0);
        limiter.admit("c", 0.1);
        limiter.cleanup(30.0);
        assert_eq!(limiter.tracked_clients(), 1);
    }
}
