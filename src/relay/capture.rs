/*!
 * Capture Loop
 *
 * Drains the inbound image stream, converts at most one frame per capture
 * interval into the frame buffer, and runs the silence watchdog every
 * iteration. Newer messages supersede an unprocessed pending one.
 */

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, error::TryRecvError};
use tokio::time::{timeout, Instant};
use tracing::{debug, info, warn};

use super::{InboundAdapter, RateLimiter, RelayContext, Watchdog};
use crate::video::ImageMessage;

/// Run until the source closes or the relay shuts down.
///
/// Source closure is treated as a transport shutdown and cancels the relay.
pub async fn run_capture_loop(ctx: Arc<RelayContext>, mut frames: mpsc::Receiver<ImageMessage>) {
    let config = ctx.config().clone();
    let token = ctx.shutdown_token();
    let adapter = InboundAdapter::new(config.frame_width, config.frame_height);
    let mut limiter = RateLimiter::new(config.capture_interval());
    let mut watchdog = Watchdog::new(config.source_timeout);
    let mut pending: Option<ImageMessage> = None;
    let mut source_open = true;

    info!(
        "Capture loop started ({} FPS cap, {:?} source timeout)",
        config.capture_fps, config.source_timeout
    );

    while source_open {
        // Bounded wait for the transport, shortened when a pending frame is
        // about to become eligible.
        let wait = if pending.is_some() {
            limiter.remaining(Instant::now()).min(config.poll_interval)
        } else {
            config.poll_interval
        };

        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            received = timeout(wait, frames.recv()) => match received {
                Ok(Some(msg)) => accept(&ctx, &mut pending, msg),
                Ok(None) => source_open = false,
                Err(_) => {}
            },
        }

        // Drain whatever else arrived; latest wins.
        loop {
            match frames.try_recv() {
                Ok(msg) => accept(&ctx, &mut pending, msg),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    source_open = false;
                    break;
                }
            }
        }

        let now = Instant::now();
        let mut failed = false;
        if pending.is_some() && limiter.try_acquire(now) {
            if let Some(msg) = pending.take() {
                failed = !process(&ctx, &adapter, &mut watchdog, &msg);
            }
        }

        if watchdog.check(now, ctx.last_received()) {
            warn!(
                "No camera frames for over {:?}, showing placeholder",
                watchdog.timeout()
            );
            ctx.install_placeholder();
        }

        if failed && !config.error_backoff.is_zero() {
            backoff(&token, config.error_backoff).await;
        }
    }

    if token.is_cancelled() {
        info!("Capture loop stopped");
    } else {
        info!("Camera source closed, stopping relay");
        ctx.shutdown();
    }
}

fn accept(ctx: &RelayContext, pending: &mut Option<ImageMessage>, msg: ImageMessage) {
    ctx.mark_received();
    if pending.replace(msg).is_some() {
        ctx.stats.record_superseded();
    }
}

/// Convert one message into the buffer. Failures leave the buffer untouched.
fn process(
    ctx: &RelayContext,
    adapter: &InboundAdapter,
    watchdog: &mut Watchdog,
    msg: &ImageMessage,
) -> bool {
    match adapter.convert(msg) {
        Ok(frame) => {
            ctx.buffer.write(frame);
            watchdog.mark_live();
            ctx.stats.record_processed();
            debug!("Processed {}x{} {} frame", msg.width, msg.height, msg.encoding);
            true
        }
        Err(e) => {
            warn!("Dropping camera frame: {}", e);
            ctx.stats.record_dropped();
            false
        }
    }
}

async fn backoff(token: &tokio_util::sync::CancellationToken, delay: Duration) {
    tokio::select! {
        _ = token.cancelled() => {}
        _ = tokio::time::sleep(delay) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RelayConfig;
    use crate::video::{placeholder_frame, SourceEncoding};

    fn small_config() -> RelayConfig {
        RelayConfig {
            frame_width: 4,
            frame_height: 4,
            ..RelayConfig::default()
        }
    }

    fn solid_msg(rgb: [u8; 3]) -> ImageMessage {
        ImageMessage::packed(4, 4, SourceEncoding::Rgb8, rgb.repeat(16))
    }

    #[tokio::test(start_paused = true)]
    async fn burst_is_rate_limited_to_latest_frame() {
        let ctx = RelayContext::new(small_config());
        let (tx, rx) = mpsc::channel(16);
        let task = tokio::spawn(run_capture_loop(ctx.clone(), rx));

        tx.send(solid_msg([1, 1, 1])).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(ctx.stats.frames_processed(), 1);

        // Four more inside one capture interval: none processed yet.
        for shade in 2..=5u8 {
            tx.send(solid_msg([shade; 3])).await.unwrap();
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(ctx.stats.frames_processed(), 1);

        // After the interval only the newest is processed.
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(ctx.stats.frames_processed(), 2);
        assert_eq!(ctx.buffer.read().pixel(0, 0), Some([5, 5, 5]));
        assert_eq!(ctx.stats.snapshot().frames_superseded, 3);

        drop(tx);
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn silence_swaps_in_placeholder_once() {
        let ctx = RelayContext::new(small_config());
        let (tx, rx) = mpsc::channel(4);
        let task = tokio::spawn(run_capture_loop(ctx.clone(), rx));

        tx.send(solid_msg([200, 0, 0])).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(ctx.buffer.read().pixel(0, 0), Some([200, 0, 0]));

        tokio::time::sleep(Duration::from_millis(4_900)).await;
        assert_eq!(ctx.stats.placeholder_swaps(), 0);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(ctx.stats.placeholder_swaps(), 1);
        assert_eq!(ctx.buffer.read().data, placeholder_frame(4, 4).data);
        assert!(ctx.status().source_connected);

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(ctx.stats.placeholder_swaps(), 1);

        // A new frame supersedes the placeholder.
        tx.send(solid_msg([0, 90, 0])).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(ctx.buffer.read().pixel(0, 0), Some([0, 90, 0]));

        drop(tx);
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_frame_keeps_previous_contents() {
        let ctx = RelayContext::new(small_config());
        let (tx, rx) = mpsc::channel(4);
        let task = tokio::spawn(run_capture_loop(ctx.clone(), rx));

        tx.send(solid_msg([10, 20, 30])).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let mut broken = solid_msg([99, 99, 99]);
        broken.data.truncate(7);
        tx.send(broken).await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        let frame = ctx.buffer.read();
        assert!(frame.is_valid());
        assert_eq!(frame.pixel(3, 3), Some([10, 20, 30]));
        assert_eq!(ctx.stats.snapshot().frames_dropped, 1);
        assert!(!task.is_finished(), "loop must survive conversion errors");

        drop(tx);
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn source_closure_shuts_relay_down() {
        let ctx = RelayContext::new(small_config());
        let (tx, rx) = mpsc::channel::<ImageMessage>(1);
        let task = tokio::spawn(run_capture_loop(ctx.clone(), rx));
        drop(tx);
        task.await.unwrap();
        assert!(ctx.is_shutting_down());
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_loop_with_source_open() {
        let ctx = RelayContext::new(small_config());
        let (_tx, rx) = mpsc::channel::<ImageMessage>(1);
        let task = tokio::spawn(run_capture_loop(ctx.clone(), rx));
        tokio::time::sleep(Duration::from_millis(30)).await;
        ctx.shutdown();
        task.await.unwrap();
    }
}
