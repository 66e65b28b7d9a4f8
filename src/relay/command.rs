/*!
 * Command Relay
 *
 * Validates velocity commands from viewers and forwards them to the robot.
 * Commands are fire-and-forget: one outbound message per accepted event,
 * nothing queued when the sink is busy.
 */

use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::ConnectionState;
use crate::error::{RelayError, Result};

/// Planar velocity command
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VelocityCommand {
    /// Forward speed
    pub linear_x: f64,
    /// Yaw rate
    pub angular_z: f64,
}

impl VelocityCommand {
    pub fn new(linear_x: f64, angular_z: f64) -> Self {
        Self { linear_x, angular_z }
    }

    /// Build from a loosely typed viewer payload. No magnitude checks.
    pub fn from_payload(payload: &Value) -> Result<Self> {
        Ok(Self {
            linear_x: coerce_f64("linear_x", payload.get("linear_x"))?,
            angular_z: coerce_f64("angular_z", payload.get("angular_z"))?,
        })
    }
}

/// Accepts numbers, numeric strings, and booleans.
fn coerce_f64(field: &'static str, value: Option<&Value>) -> Result<f64> {
    let invalid = |value: String| RelayError::InvalidCommand { field, value };

    match value {
        Some(Value::Number(n)) => n.as_f64().ok_or_else(|| invalid(n.to_string())),
        Some(Value::String(s)) => s.trim().parse::<f64>().map_err(|_| invalid(format!("{:?}", s))),
        Some(Value::Bool(b)) => Ok(if *b { 1.0 } else { 0.0 }),
        Some(other) => Err(invalid(other.to_string())),
        None => Err(invalid("missing".to_string())),
    }
}

/// Outbound command transport
pub trait CommandSink: Send + Sync {
    fn publish(&self, command: VelocityCommand) -> Result<()>;
}

/// Gatekeeper between viewer events and the command sink
#[derive(Default)]
pub struct CommandRelay {
    sink: OnceLock<Arc<dyn CommandSink>>,
}

impl CommandRelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the outbound sink. Returns false if one was already attached.
    pub fn attach(&self, sink: Arc<dyn CommandSink>) -> bool {
        self.sink.set(sink).is_ok()
    }

    pub fn is_attached(&self) -> bool {
        self.sink.get().is_some()
    }

    /// Validate and forward one viewer command.
    pub fn relay(&self, payload: &Value, connection: &ConnectionState) -> Result<VelocityCommand> {
        let sink = match self.sink.get() {
            Some(sink) if connection.is_initialized() => sink,
            _ => return Err(RelayError::SourceNotInitialized),
        };
        if !connection.is_connected() {
            return Err(RelayError::SourceDisconnected);
        }

        let command = VelocityCommand::from_payload(payload)?;
        sink.publish(command)?;
        debug!(
            "Forwarded cmd_vel linear_x={:.3} angular_z={:.3}",
            command.linear_x, command.angular_z
        );
        Ok(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        published: Mutex<Vec<VelocityCommand>>,
    }

    impl CommandSink for RecordingSink {
        fn publish(&self, command: VelocityCommand) -> Result<()> {
            self.published.lock().unwrap().push(command);
            Ok(())
        }
    }

    fn ready_relay() -> (CommandRelay, Arc<RecordingSink>, ConnectionState) {
        let relay = CommandRelay::new();
        let sink = Arc::new(RecordingSink::default());
        relay.attach(sink.clone());
        let connection = ConnectionState::default();
        connection.set_initialized();
        connection.set_connected();
        (relay, sink, connection)
    }

    #[test]
    fn coerces_loose_values() {
        let cmd = VelocityCommand::from_payload(&json!({"linear_x": "0.5", "angular_z": -1})).unwrap();
        assert_eq!(cmd, VelocityCommand::new(0.5, -1.0));

        let cmd = VelocityCommand::from_payload(&json!({"linear_x": true, "angular_z": " 2e1 "})).unwrap();
        assert_eq!(cmd, VelocityCommand::new(1.0, 20.0));
    }

    #[test]
    fn rejects_non_numeric_values() {
        for payload in [
            json!({"linear_x": "abc", "angular_z": 0}),
            json!({"linear_x": 0, "angular_z": null}),
            json!({"linear_x": [1], "angular_z": 0}),
            json!({"angular_z": 0}),
        ] {
            assert!(matches!(
                VelocityCommand::from_payload(&payload),
                Err(RelayError::InvalidCommand { .. })
            ));
        }
    }

    #[test]
    fn forwards_valid_command_once() {
        let (relay, sink, connection) = ready_relay();
        let cmd = relay
            .relay(&json!({"linear_x": 0.25, "angular_z": 0.1}), &connection)
            .unwrap();
        assert_eq!(cmd, VelocityCommand::new(0.25, 0.1));
        assert_eq!(sink.published.lock().unwrap().as_slice(), &[cmd]);
    }

    #[test]
    fn invalid_payload_publishes_nothing() {
        let (relay, sink, connection) = ready_relay();
        let result = relay.relay(&json!({"linear_x": "abc", "angular_z": 0}), &connection);
        assert!(matches!(result, Err(RelayError::InvalidCommand { field: "linear_x", .. })));
        assert!(sink.published.lock().unwrap().is_empty());
    }

    #[test]
    fn disconnected_source_rejects() {
        let (relay, sink, _) = ready_relay();
        let connection = ConnectionState::default();
        connection.set_initialized();

        let err = relay
            .relay(&json!({"linear_x": 1, "angular_z": 0}), &connection)
            .unwrap_err();
        assert!(err.to_string().contains("disconnected"));
        assert!(sink.published.lock().unwrap().is_empty());
    }

    #[test]
    fn missing_sink_rejects_as_uninitialized() {
        let relay = CommandRelay::new();
        let connection = ConnectionState::default();
        connection.set_initialized();
        connection.set_connected();
        assert!(matches!(
            relay.relay(&json!({"linear_x": 1, "angular_z": 0}), &connection),
            Err(RelayError::SourceNotInitialized)
        ));
    }
}
