//! Viewer WebSocket: one [`ViewerSession`] per connection.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use tracing::{debug, warn};

use crate::protocol::ServerEvent;
use crate::relay::{RelayContext, ViewerSession};

pub async fn upgrade(ws: WebSocketUpgrade, State(ctx): State<Arc<RelayContext>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, ctx))
}

async fn handle_socket(mut socket: WebSocket, ctx: Arc<RelayContext>) {
    let token = ctx.shutdown_token();
    let mut session = ViewerSession::open(ctx);
    let id = session.id();

    loop {
        tokio::select! {
            _ = token.cancelled() => {
                let _ = socket.send(Message::Close(None)).await;
                break;
            }
            event = session.next_event() => {
                let Some(event) = event else { break };
                if send_event(&mut socket, &event).await.is_err() {
                    break;
                }
            }
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    let reply = session.handle_text(&text);
                    if send_event(&mut socket, &reply).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    debug!("Viewer {} socket error: {}", id, e);
                    break;
                }
                // Pings are answered by axum; binary frames are ignored
                Some(Ok(_)) => {}
            },
        }
    }
}

async fn send_event(socket: &mut WebSocket, event: &ServerEvent) -> Result<(), axum::Error> {
    match event.to_json() {
        Ok(text) => socket.send(Message::Text(text.into())).await,
        Err(e) => {
            warn!("Failed to serialize viewer event: {}", e);
            Ok(())
        }
    }
}
