/*!
 * Viewer Sessions
 *
 * The set of attached viewers and the per-connection session object the web
 * transport drives: opening a session registers it, dropping it unregisters
 * it, and inbound viewer messages are dispatched through it.
 */

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::RelayContext;
use crate::protocol::{ClientMessage, CommandAck, ServerEvent};

pub type ViewerId = Uuid;

/// Currently attached viewers, keyed by session id
#[derive(Debug, Default)]
pub struct ViewerSet {
    sessions: Mutex<HashMap<ViewerId, mpsc::Sender<ServerEvent>>>,
}

impl ViewerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn insert(&self, id: ViewerId, tx: mpsc::Sender<ServerEvent>) -> usize {
        let mut sessions = self.lock();
        sessions.insert(id, tx);
        sessions.len()
    }

    fn remove(&self, id: &ViewerId) -> usize {
        let mut sessions = self.lock();
        sessions.remove(id);
        sessions.len()
    }

    /// Queue `event` for every attached viewer. A viewer whose queue is full
    /// misses this event rather than stalling the others.
    ///
    /// Returns how many viewers accepted it.
    pub fn broadcast(&self, event: ServerEvent) -> usize {
        let targets: Vec<(ViewerId, mpsc::Sender<ServerEvent>)> = self
            .lock()
            .iter()
            .map(|(id, tx)| (*id, tx.clone()))
            .collect();

        let mut delivered = 0;
        for (id, tx) in targets {
            match tx.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => debug!("Viewer {} lagging, event skipped", id),
                Err(TrySendError::Closed(_)) => debug!("Viewer {} already closed", id),
            }
        }
        delivered
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ViewerId, mpsc::Sender<ServerEvent>>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One attached viewer.
pub struct ViewerSession {
    id: ViewerId,
    ctx: Arc<RelayContext>,
    events: mpsc::Receiver<ServerEvent>,
}

impl ViewerSession {
    /// Register a new viewer. Its first queued event is the relay status.
    pub fn open(ctx: Arc<RelayContext>) -> Self {
        let id = Uuid::new_v4();
        let (tx, events) = mpsc::channel(ctx.config().viewer_queue.max(1));
        if tx.try_send(ServerEvent::Status(ctx.status())).is_err() {
            warn!("Viewer {} could not receive initial status", id);
        }
        let count = ctx.viewers.insert(id, tx);
        info!("Viewer {} connected ({} attached)", id, count);

        Self { id, ctx, events }
    }

    pub fn id(&self) -> ViewerId {
        self.id
    }

    /// Next event to deliver to this viewer.
    pub async fn next_event(&mut self) -> Option<ServerEvent> {
        self.events.recv().await
    }

    /// Non-blocking variant of [`next_event`](Self::next_event).
    pub fn try_next_event(&mut self) -> Option<ServerEvent> {
        self.events.try_recv().ok()
    }

    /// Dispatch one text message from the viewer; returns the direct reply.
    pub fn handle_text(&self, text: &str) -> ServerEvent {
        match serde_json::from_str::<ClientMessage>(text) {
            Ok(msg) => self.handle_message(msg),
            Err(e) => {
                debug!("Viewer {} sent unparseable message: {}", self.id, e);
                ServerEvent::error(format!("invalid message: {}", e))
            }
        }
    }

    pub fn handle_message(&self, msg: ClientMessage) -> ServerEvent {
        match msg.event.as_str() {
            "cmd_vel" => ServerEvent::CmdVelAck(self.on_command(msg.id, &msg.data)),
            "status" => ServerEvent::Status(self.ctx.status()),
            other => ServerEvent::error(format!("unknown event '{}'", other)),
        }
    }

    /// A velocity command from this viewer.
    pub fn on_command(&self, id: Option<u64>, payload: &serde_json::Value) -> CommandAck {
        match self.ctx.relay_command(payload) {
            Ok(_) => CommandAck::success(id),
            Err(e) => {
                debug!("Viewer {} command rejected: {}", self.id, e);
                CommandAck::failure(id, &e)
            }
        }
    }
}

impl Drop for ViewerSession {
    fn drop(&mut self) {
        let remaining = self.ctx.viewers.remove(&self.id);
        info!("Viewer {} disconnected ({} attached)", self.id, remaining);
    }
}
