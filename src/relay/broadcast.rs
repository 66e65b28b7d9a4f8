/*!
 * Broadcast Loop
 *
 * Samples the frame buffer at the broadcast rate, encodes the snapshot, and
 * fans it out to attached viewers. Does no encoding while nobody watches.
 */

use std::sync::Arc;
use std::time::Instant as StdInstant;

use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::RelayContext;
use crate::protocol::ServerEvent;
use crate::video::FrameEncoder;

/// Run until the relay shuts down.
pub async fn run_broadcast_loop<E: FrameEncoder>(ctx: Arc<RelayContext>, mut encoder: E) {
    let config = ctx.config().clone();
    let token = ctx.shutdown_token();
    let mut ticker = interval(config.broadcast_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!(
        "Broadcast loop started ({} encoder, {} FPS cap)",
        encoder.name(),
        config.broadcast_fps
    );

    loop {
        if ctx.viewers.is_empty() {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = sleep(config.idle_interval) => continue,
            }
        }

        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        // The last viewer may have left while we waited for the tick.
        if ctx.viewers.is_empty() {
            continue;
        }
        broadcast_once(&ctx, &mut encoder);
    }

    info!("Broadcast loop stopped");
}

/// Encode the current frame and queue it for every viewer.
///
/// Returns the number of viewers reached, or `None` if encoding failed.
pub fn broadcast_once<E: FrameEncoder + ?Sized>(ctx: &RelayContext, encoder: &mut E) -> Option<usize> {
    let frame = ctx.buffer.read();
    let started = StdInstant::now();

    match encoder.encode(&frame) {
        Ok(encoded) => {
            ctx.stats.record_encoded(started.elapsed().as_micros() as u64);
            let delivered = ctx.viewers.broadcast(ServerEvent::camera_frame(&encoded));
            if delivered > 0 {
                ctx.stats.record_broadcast();
            }
            debug!(
                "Broadcast {} byte frame to {} viewer(s)",
                encoded.data.len(),
                delivered
            );
            Some(delivered)
        }
        Err(e) => {
            warn!("Frame encoding failed, skipping broadcast: {}", e);
            ctx.stats.record_encode_error();
            None
        }
    }
}
