//! Source silence watchdog.
//!
//! Two states. LIVE becomes STALE when no message has been received for
//! longer than the timeout, and the caller swaps in the placeholder frame on
//! that transition only. STALE becomes LIVE when the adapter next writes a
//! converted frame.

use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogState {
    Live,
    Stale,
}

#[derive(Debug)]
pub struct Watchdog {
    timeout: Duration,
    state: WatchdogState,
}

impl Watchdog {
    /// Starts STALE: the buffer holds the placeholder until the first frame.
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            state: WatchdogState::Stale,
        }
    }

    pub fn state(&self) -> WatchdogState {
        self.state
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// A converted frame was written to the buffer.
    pub fn mark_live(&mut self) {
        self.state = WatchdogState::Live;
    }

    /// Returns true exactly once per silence episode, when the placeholder
    /// should be installed.
    pub fn check(&mut self, now: Instant, last_received: Option<Instant>) -> bool {
        if self.state == WatchdogState::Stale {
            return false;
        }

        let silent = match last_received {
            Some(at) => now.saturating_duration_since(at) > self.timeout,
            None => true,
        };
        if silent {
            self.state = WatchdogState::Stale;
        }
        silent
    }
}
