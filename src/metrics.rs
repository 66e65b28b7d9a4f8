//! Pipeline counters for the relay.
//!
//! Lock-free atomics shared by the capture loop, the broadcast loop, and the
//! command relay. `snapshot()` produces the serializable view served at
//! `/stats`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use serde::Serialize;

/// Live counters
#[derive(Debug)]
pub struct RelayStats {
    frames_received: AtomicU64,
    frames_processed: AtomicU64,
    frames_superseded: AtomicU64,
    frames_dropped: AtomicU64,
    placeholder_swaps: AtomicU64,
    frames_encoded: AtomicU64,
    frames_broadcast: AtomicU64,
    encode_errors: AtomicU64,
    commands_forwarded: AtomicU64,
    commands_rejected: AtomicU64,
    /// Total encode time in microseconds
    total_encode_us: AtomicU64,
    start_time: Instant,
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatsSnapshot {
    pub frames_received: u64,
    pub frames_processed: u64,
    pub frames_superseded: u64,
    pub frames_dropped: u64,
    pub placeholder_swaps: u64,
    pub frames_encoded: u64,
    pub frames_broadcast: u64,
    pub encode_errors: u64,
    pub commands_forwarded: u64,
    pub commands_rejected: u64,
    pub avg_encode_ms: f64,
    pub uptime_secs: u64,
}

impl RelayStats {
    pub fn new() -> Self {
        Self {
            frames_received: AtomicU64::new(0),
            frames_processed: AtomicU64::new(0),
            frames_superseded: AtomicU64::new(0),
            frames_dropped: AtomicU64::new(0),
            placeholder_swaps: AtomicU64::new(0),
            frames_encoded: AtomicU64::new(0),
            frames_broadcast: AtomicU64::new(0),
            encode_errors: AtomicU64::new(0),
            commands_forwarded: AtomicU64::new(0),
            commands_rejected: AtomicU64::new(0),
            total_encode_us: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_received(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_processed(&self) {
        self.frames_processed.fetch_add(1, Ordering::Relaxed);
    }

    /// A pending frame was replaced by a newer one before processing.
    pub fn record_superseded(&self) {
        self.frames_superseded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.frames_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_placeholder_swap(&self) {
        self.placeholder_swaps.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_encoded(&self, encode_us: u64) {
        self.frames_encoded.fetch_add(1, Ordering::Relaxed);
        self.total_encode_us.fetch_add(encode_us, Ordering::Relaxed);
    }

    pub fn record_encode_error(&self) {
        self.encode_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_broadcast(&self) {
        self.frames_broadcast.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_command(&self, forwarded: bool) {
        if forwarded {
            self.commands_forwarded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.commands_rejected.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed.load(Ordering::Relaxed)
    }

    pub fn frames_encoded(&self) -> u64 {
        self.frames_encoded.load(Ordering::Relaxed)
    }

    pub fn placeholder_swaps(&self) -> u64 {
        self.placeholder_swaps.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let frames_encoded = self.frames_encoded();
        let total_encode_us = self.total_encode_us.load(Ordering::Relaxed);

        // Microseconds to milliseconds
        let avg_encode_ms = if frames_encoded > 0 {
            (total_encode_us as f64) / (frames_encoded as f64) / 1000.0
        } else {
            0.0
        };

        StatsSnapshot {
            frames_received: self.frames_received.load(Ordering::Relaxed),
            frames_processed: self.frames_processed(),
            frames_superseded: self.frames_superseded.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            placeholder_swaps: self.placeholder_swaps(),
            frames_encoded,
            frames_broadcast: self.frames_broadcast.load(Ordering::Relaxed),
            encode_errors: self.encode_errors.load(Ordering::Relaxed),
            commands_forwarded: self.commands_forwarded.load(Ordering::Relaxed),
            commands_rejected: self.commands_rejected.load(Ordering::Relaxed),
            avg_encode_ms,
            uptime_secs: self.start_time.elapsed().as_secs(),
        }
    }
}

impl Default for RelayStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_stats_are_zero() {
        let snapshot = RelayStats::new().snapshot();
        assert_eq!(snapshot.frames_received, 0);
        assert_eq!(snapshot.frames_encoded, 0);
        assert_eq!(snapshot.avg_encode_ms, 0.0);
    }

    #[test]
    fn average_encode_time() {
        let stats = RelayStats::new();
        stats.record_encoded(2_000);
        stats.record_encoded(4_000);
        assert_eq!(stats.snapshot().avg_encode_ms, 3.0);
    }

    #[test]
    fn commands_split_by_outcome() {
        let stats = RelayStats::new();
        stats.record_command(true);
        stats.record_command(false);
        stats.record_command(false);
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.commands_forwarded, 1);
        assert_eq!(snapshot.commands_rejected, 2);
    }
}
