//! camera-relay: streams a robot camera to browser viewers and relays their
//! velocity commands back to the robot.
//!
//! Usage: `camera-relay [config.ini]`

use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use camera_relay::relay::{run_broadcast_loop, run_capture_loop};
use camera_relay::{server, transport, JpegEncoder, RelayConfig, RelayContext};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = RelayConfig::load(std::env::args_os().nth(1).map(PathBuf::from))
        .context("Failed to load configuration")?;

    info!("Camera relay v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "[Relay] {}x{} JPEG q{}, capture {} FPS, broadcast {} FPS",
        config.frame_width,
        config.frame_height,
        config.jpeg_quality,
        config.capture_fps,
        config.broadcast_fps
    );

    let ctx = RelayContext::new(config.clone());
    let mut tasks = Vec::new();

    // A missing source is not fatal: viewers still get the placeholder and
    // commands are rejected until a source appears.
    match transport::connect(&config, ctx.shutdown_token()) {
        Ok(link) => {
            ctx.attach_command_sink(link.commands);
            tasks.push(tokio::spawn(run_capture_loop(ctx.clone(), link.frames)));
        }
        Err(e) => error!("[Relay] Camera source unavailable: {}", e),
    }

    tasks.push(tokio::spawn(run_broadcast_loop(
        ctx.clone(),
        JpegEncoder::new(config.jpeg_quality),
    )));

    let signal_ctx = ctx.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("[Relay] Ctrl+C received");
                signal_ctx.shutdown();
            }
            Err(e) => warn!("[Relay] Failed to listen for Ctrl+C: {}", e),
        }
    });

    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;

    let served = server::serve(ctx.clone(), listener).await;
    ctx.shutdown();

    for task in tasks {
        if let Err(e) = task.await {
            warn!("[Relay] Task ended abnormally: {}", e);
        }
    }

    let stats = ctx.stats.snapshot();
    info!(
        "[Relay] Stopped: {} frames processed, {} broadcast, {} commands forwarded",
        stats.frames_processed, stats.frames_broadcast, stats.commands_forwarded
    );

    served.context("Viewer server failed")
}
