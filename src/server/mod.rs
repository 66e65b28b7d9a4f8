/*!
 * Web Server
 *
 * HTTP and WebSocket surface of the relay.
 *
 * | Path | Description |
 * |------|-------------|
 * | `/status` | Source flags and timestamp (JSON) |
 * | `/stats` | Pipeline counters (JSON) |
 * | `/ws` | Viewer WebSocket: camera frames out, commands in |
 * | `/api` | Greeting and user lookup |
 * | `/` | Static viewer assets, when `static_dir` is configured |
 */

pub mod greeting;
pub mod ws;

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tracing::info;

use crate::metrics::StatsSnapshot;
use crate::protocol::StatusReport;
use crate::relay::RelayContext;

pub fn router(ctx: Arc<RelayContext>) -> Router {
    let app = Router::new()
        .route("/status", get(status))
        .route("/stats", get(stats))
        .route("/ws", get(ws::upgrade))
        .merge(greeting::router())
        .with_state(ctx.clone());

    match &ctx.config().static_dir {
        Some(dir) => {
            info!("Serving viewer assets from {}", dir.display());
            app.fallback_service(ServeDir::new(dir))
        }
        None => app,
    }
}

/// Serve until the relay shuts down.
pub async fn serve(ctx: Arc<RelayContext>, listener: TcpListener) -> std::io::Result<()> {
    let addr = listener.local_addr()?;
    let token = ctx.shutdown_token();
    info!("Viewer server listening on http://{}", addr);

    axum::serve(listener, router(ctx))
        .with_graceful_shutdown(async move { token.cancelled().await })
        .await?;

    info!("Viewer server stopped");
    Ok(())
}

async fn status(State(ctx): State<Arc<RelayContext>>) -> Json<StatusReport> {
    Json(ctx.status())
}

async fn stats(State(ctx): State<Arc<RelayContext>>) -> Json<StatsSnapshot> {
    Json(ctx.stats.snapshot())
}
