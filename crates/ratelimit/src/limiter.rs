use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::clock::{Clock, SystemClock};
use crate::error::RateLimitError;

/// Result of counting one request against a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateDecision {
    Allowed {
        limit: u32,
        remaining: u32,
        reset_after: Duration,
    },
    Limited {
        limit: u32,
        retry_after: Duration,
    },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateDecision::Allowed { .. })
    }
}

#[derive(Debug, Clone, Copy)]
struct WindowEntry {
    opened_at: Instant,
    hits: u32,
}

/// Keyed counter store implementing a fixed-window limit.
pub struct FixedWindowLimiter {
    window: Duration,
    max_requests: u32,
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<String, WindowEntry>>,
}

impl FixedWindowLimiter {
    /// Limiter driven by the system clock.
    pub fn new(window: Duration, max_requests: u32) -> Result<Self, RateLimitError> {
        Self::with_clock(window, max_requests, Arc::new(SystemClock))
    }

    pub fn with_clock(
        window: Duration,
        max_requests: u32,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, RateLimitError> {
        if window.is_zero() {
            return Err(RateLimitError::ZeroWindow);
        }
        if max_requests == 0 {
            return Err(RateLimitError::ZeroCapacity);
        }

        Ok(Self {
            window,
            max_requests,
            clock,
            entries: Mutex::new(HashMap::new()),
        })
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Count a request for `key` and decide whether it may proceed.
    ///
    /// Rejected requests still count, so a client hammering the route does
    /// not get extra capacity once its window rolls over.
    pub fn check(&self, key: &str) -> RateDecision {
        let now = self.clock.now();
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());

        let entry = entries
            .entry(key.to_string())
            .and_modify(|entry| {
                if now.duration_since(entry.opened_at) >= self.window {
                    *entry = WindowEntry {
                        opened_at: now,
                        hits: 0,
                    };
                }
            })
            .or_insert(WindowEntry {
                opened_at: now,
                hits: 0,
            });

        entry.hits = entry.hits.saturating_add(1);
        let reset_after = self
            .window
            .saturating_sub(now.duration_since(entry.opened_at));

        if entry.hits > self.max_requests {
            tracing::debug!(
                target: "blogsmith-ratelimit",
                key,
                hits = entry.hits,
                "request over limit"
            );
            RateDecision::Limited {
                limit: self.max_requests,
                retry_after: reset_after,
            }
        } else {
            RateDecision::Allowed {
                limit: self.max_requests,
                remaining: self.max_requests - entry.hits,
                reset_after,
            }
        }
    }

    /// Drop every window that has already closed. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let before = entries.len();
        entries.retain(|_, entry| now.duration_since(entry.opened_at) < self.window);
        before - entries.len()
    }

    /// Number of keys currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}

impl std::fmt::Debug for FixedWindowLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FixedWindowLimiter")
            .field("window", &self.window)
            .field("max_requests", &self.max_requests)
            .field("tracked_keys", &self.tracked_keys())
            .finish()
    }
}
