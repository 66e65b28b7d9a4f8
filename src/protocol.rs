//! Viewer wire protocol.
//!
//! JSON envelopes exchanged over the viewer WebSocket:
//! `{"event": "<name>", "data": {...}}`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RelayError;
use crate::video::EncodedFrame;

/// Messages pushed from the relay to viewers
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Latest camera frame; one shared payload fans out to every viewer
    CameraFrame(Arc<CameraFramePayload>),
    /// Relay status, sent on connect and on request
    Status(StatusReport),
    /// Outcome of a `cmd_vel` event
    CmdVelAck(CommandAck),
    /// Unparseable or unknown client message
    Error { message: String },
}

impl ServerEvent {
    pub fn camera_frame(encoded: &EncodedFrame) -> Self {
        ServerEvent::CameraFrame(Arc::new(CameraFramePayload {
            image: encoded.to_base64(),
            timestamp: encoded.timestamp_ms,
        }))
    }

    pub fn error(message: impl Into<String>) -> Self {
        ServerEvent::Error {
            message: message.into(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CameraFramePayload {
    /// Base64 JPEG
    pub image: String,
    /// Milliseconds since epoch
    pub timestamp: i64,
}

/// Relay health as reported at `/status` and in `status` events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub source_initialized: bool,
    pub source_connected: bool,
    /// Milliseconds since epoch
    pub timestamp: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AckStatus {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandAck {
    /// Echo of the client's request id, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub status: AckStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CommandAck {
    pub fn success(id: Option<u64>) -> Self {
        Self {
            id,
            status: AckStatus::Success,
            message: None,
        }
    }

    pub fn failure(id: Option<u64>, err: &RelayError) -> Self {
        Self {
            id,
            status: AckStatus::Error,
            message: Some(err.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == AckStatus::Success
    }
}

/// Message received from a viewer
#[derive(Debug, Clone, Deserialize)]
pub struct ClientMessage {
    pub event: String,
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub data: Value,
}
