/*!
 * Synthetic Camera
 *
 * Test-pattern source for running the relay without a robot: publishes BGR
 * colour bars with a sweeping white column at a fixed rate, and logs the
 * velocity commands it receives.
 */

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::SourceLink;
use crate::config::SyntheticConfig;
use crate::error::Result;
use crate::relay::{CommandSink, VelocityCommand};
use crate::video::{ImageMessage, SourceEncoding};

/// Eight SMPTE-style bars, BGR order
const BARS: [[u8; 3]; 8] = [
    [192, 192, 192],
    [0, 192, 192],
    [192, 192, 0],
    [0, 192, 0],
    [192, 0, 192],
    [0, 0, 192],
    [192, 0, 0],
    [16, 16, 16],
];

const SWEEP_WIDTH: u32 = 8;

pub struct TestPatternCamera {
    config: SyntheticConfig,
}

impl TestPatternCamera {
    pub fn new(config: SyntheticConfig) -> Self {
        Self { config }
    }

    /// Start publishing. Stops when `shutdown` fires or the relay drops its receiver.
    pub fn spawn(self, shutdown: CancellationToken) -> SourceLink {
        let (tx, rx) = mpsc::channel(4);
        let sink = Arc::new(LoggingSink::default());
        tokio::spawn(self.publish_loop(tx, shutdown));
        SourceLink {
            frames: rx,
            commands: sink,
        }
    }

    async fn publish_loop(self, tx: mpsc::Sender<ImageMessage>, shutdown: CancellationToken) {
        let SyntheticConfig { width, height, fps } = self.config;
        let mut ticker = interval(Duration::from_secs_f64(1.0 / fps.max(1) as f64));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut tick: u64 = 0;

        info!("Test pattern camera publishing {}x{} bgr8 at {} FPS", width, height, fps);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let msg = ImageMessage::packed(
                width,
                height,
                SourceEncoding::Bgr8,
                test_pattern(width, height, tick),
            );
            if tx.send(msg).await.is_err() {
                debug!("Relay dropped frame receiver");
                break;
            }
            tick = tick.wrapping_add(1);
        }

        info!("Test pattern camera stopped after {} frames", tick);
    }
}

/// BGR colour bars with a white column that moves a few pixels per tick.
pub fn test_pattern(width: u32, height: u32, tick: u64) -> Vec<u8> {
    let sweep_x = ((tick * 4) % width.max(1) as u64) as u32;
    let bar_width = (width / BARS.len() as u32).max(1);

    let mut data = Vec::with_capacity(width as usize * height as usize * 3);
    for _y in 0..height {
        for x in 0..width {
            if x >= sweep_x && x < sweep_x + SWEEP_WIDTH {
                data.extend_from_slice(&[255, 255, 255]);
            } else {
                let bar = ((x / bar_width) as usize).min(BARS.len() - 1);
                data.extend_from_slice(&BARS[bar]);
            }
        }
    }
    data
}

/// Command sink that only logs
#[derive(Debug, Default)]
pub struct LoggingSink {
    published: AtomicU64,
}

impl LoggingSink {
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }
}

impl CommandSink for LoggingSink {
    fn publish(&self, command: VelocityCommand) -> Result<()> {
        let n = self.published.fetch_add(1, Ordering::Relaxed) + 1;
        info!(
            "cmd_vel #{}: linear_x={:.3} angular_z={:.3}",
            n, command.linear_x, command.angular_z
        );
        Ok(())
    }
}
