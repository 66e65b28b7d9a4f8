//! Minimum-interval rate limiter.

use std::time::Duration;

use tokio::time::Instant;

/// Admits at most one event per `interval`.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    interval: Duration,
    last: Option<Instant>,
}

impl RateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Time left before the next event is admitted.
    pub fn remaining(&self, now: Instant) -> Duration {
        match self.last {
            Some(last) => self
                .interval
                .saturating_sub(now.saturating_duration_since(last)),
            None => Duration::ZERO,
        }
    }

    pub fn ready(&self, now: Instant) -> bool {
        self.remaining(now).is_zero()
    }

    pub fn mark(&mut self, now: Instant) {
        self.last = Some(now);
    }

    /// Admit and record in one step.
    pub fn try_acquire(&mut self, now: Instant) -> bool {
        if self.ready(now) {
            self.mark(now);
            true
        } else {
            false
        }
    }
}
