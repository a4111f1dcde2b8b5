//! Cached connection liveness

use parking_lot::Mutex;
use std::time::Instant;
use tabula_core::{Connection, LivenessConfig};

#[derive(Debug, Default, Clone, Copy)]
struct LivenessState {
    checked_at: Option<Instant>,
    alive: bool,
}

/// The outcome of the last liveness probe and when it ran.
///
/// Within the configured TTL the cached answer is returned without touching
/// the connection. The check time and the answer are read and written under
/// one lock, so a caller never sees a fresh time paired with a stale answer.
#[derive(Debug, Default)]
pub struct LivenessCache {
    state: Mutex<LivenessState>,
}

impl LivenessCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached liveness of `conn`, probing it when the cache has expired.
    pub fn check(&self, conn: &dyn Connection, config: &LivenessConfig) -> bool {
        let mut state = self.state.lock();
        if let Some(checked_at) = state.checked_at
            && checked_at.elapsed() < config.ttl()
        {
            tracing::trace!(alive = state.alive, "liveness served from cache");
            return state.alive;
        }

        let alive = conn.is_valid(config.probe_timeout());
        if alive {
            tracing::debug!(driver = conn.driver_name(), "liveness probe succeeded");
        } else {
            tracing::warn!(driver = conn.driver_name(), "liveness probe failed");
        }
        *state = LivenessState {
            checked_at: Some(Instant::now()),
            alive,
        };
        alive
    }

    /// Record a known state, e.g. right after connecting.
    pub fn mark(&self, alive: bool) {
        *self.state.lock() = LivenessState {
            checked_at: Some(Instant::now()),
            alive,
        };
    }

    /// Forget the cached answer; the next check probes.
    pub fn reset(&self) {
        *self.state.lock() = LivenessState::default();
    }
}
