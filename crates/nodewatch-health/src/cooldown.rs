//! Per-key alert cooldowns.
//!
//! The gate remembers when each alert key last fired. A key may fire again
//! once the cooldown has fully elapsed. Denied checks leave the stored time
//! alone, so repeated failures collapse into one alert per window.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

/// Alert key for a node that is down.
pub fn down_key(node_name: &str) -> String {
    format!("down:{node_name}")
}

/// Rate limiter keyed by alert.
///
/// Check-and-record happens under one lock, so concurrent callers can
/// never both be allowed for the same key within a window.
#[derive(Debug, Default)]
pub struct CooldownGate {
    last_fired: Mutex<HashMap<String, Instant>>,
}

impl CooldownGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide whether `key` may fire now, recording the time if it may.
    pub fn allow(&self, key: &str, cooldown: Duration) -> bool {
        self.allow_at(key, cooldown, Instant::now())
    }

    /// [`allow`](Self::allow) against an explicit clock reading.
    pub fn allow_at(&self, key: &str, cooldown: Duration, now: Instant) -> bool {
        let mut last_fired = self.last_fired.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(last) = last_fired.get(key) {
            let elapsed = now.saturating_duration_since(*last);
            if elapsed < cooldown {
                debug!(%key, ?elapsed, ?cooldown, "alert suppressed by cooldown");
                return false;
            }
        }

        last_fired.insert(key.to_string(), now);
        true
    }

    /// When `key` last fired, if ever.
    pub fn last_fired(&self, key: &str) -> Option<Instant> {
        self.last_fired
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .copied()
    }

    /// Number of keys that have fired at least once.
    pub fn len(&self) -> usize {
        self.last_fired
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
