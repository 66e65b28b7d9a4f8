/*!
 * Relay Module
 *
 * The camera relay pipeline. A single [`RelayContext`] owns all shared state
 * and is handed to the capture loop, the broadcast loop, and every viewer
 * session.
 *
 * ```text
 * source ──► capture loop ──► FrameBuffer ──► broadcast loop ──► viewers
 *                 │ (adapter, watchdog)            (JPEG, base64)
 * viewers ──► ViewerSession ──► CommandRelay ──► command sink
 * ```
 */

pub mod adapter;
pub mod broadcast;
pub mod buffer;
pub mod capture;
pub mod command;
pub mod pacing;
pub mod viewers;
pub mod watchdog;

pub use adapter::InboundAdapter;
pub use broadcast::run_broadcast_loop;
pub use buffer::FrameBuffer;
pub use capture::run_capture_loop;
pub use command::{CommandRelay, CommandSink, VelocityCommand};
pub use pacing::RateLimiter;
pub use viewers::{ViewerId, ViewerSession, ViewerSet};
pub use watchdog::{Watchdog, WatchdogState};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::RelayConfig;
use crate::error::Result;
use crate::metrics::RelayStats;
use crate::protocol::StatusReport;
use crate::video::{now_ms, placeholder_frame};

/// Upstream link flags. Each has a single writer and is never cleared.
#[derive(Debug, Default)]
pub struct ConnectionState {
    initialized: AtomicBool,
    connected: AtomicBool,
}

impl ConnectionState {
    /// The upstream link object was constructed.
    pub fn set_initialized(&self) {
        self.initialized.store(true, Ordering::Release);
    }

    /// At least one inbound message has arrived.
    pub fn set_connected(&self) {
        self.connected.store(true, Ordering::Release);
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }
}

/// Shared state of one relay instance
pub struct RelayContext {
    config: RelayConfig,
    pub buffer: FrameBuffer,
    pub connection: ConnectionState,
    pub viewers: ViewerSet,
    pub stats: RelayStats,
    commands: CommandRelay,
    last_received: Mutex<Option<Instant>>,
    shutdown: CancellationToken,
}

impl RelayContext {
    /// Create a context whose buffer holds the placeholder frame.
    pub fn new(config: RelayConfig) -> Arc<Self> {
        let placeholder = placeholder_frame(config.frame_width, config.frame_height);
        Arc::new(Self {
            buffer: FrameBuffer::new(placeholder),
            connection: ConnectionState::default(),
            viewers: ViewerSet::new(),
            stats: RelayStats::new(),
            commands: CommandRelay::new(),
            last_received: Mutex::new(None),
            shutdown: CancellationToken::new(),
            config,
        })
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Token cancelled when the relay shuts down.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn shutdown(&self) {
        if !self.shutdown.is_cancelled() {
            info!("Relay shutdown requested");
            self.shutdown.cancel();
        }
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Connect the outbound side of the upstream link and mark it initialized.
    pub fn attach_command_sink(&self, sink: Arc<dyn CommandSink>) {
        if self.commands.attach(sink) {
            self.connection.set_initialized();
            info!("Command sink attached, source initialized");
        } else {
            warn!("Command sink already attached, ignoring");
        }
    }

    /// Record receipt of an inbound message (before any decoding).
    pub fn mark_received(&self) {
        *self
            .last_received
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Instant::now());
        if !self.connection.is_connected() {
            info!("First camera frame received, source connected");
        }
        self.connection.set_connected();
        self.stats.record_received();
    }

    pub fn last_received(&self) -> Option<Instant> {
        *self.last_received.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Overwrite the buffer with a freshly generated placeholder.
    pub fn install_placeholder(&self) {
        self.buffer
            .write(placeholder_frame(self.config.frame_width, self.config.frame_height));
        self.stats.record_placeholder_swap();
    }

    pub fn status(&self) -> StatusReport {
        StatusReport {
            source_initialized: self.connection.is_initialized(),
            source_connected: self.connection.is_connected(),
            timestamp: now_ms(),
        }
    }

    /// Validate and forward a viewer velocity command.
    pub fn relay_command(&self, payload: &Value) -> Result<VelocityCommand> {
        let result = self.commands.relay(payload, &self.connection);
        self.stats.record_command(result.is_ok());
        result
    }
}
