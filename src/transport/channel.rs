//! In-process transport backed by tokio channels.
//!
//! Lets an embedding application (or a test) push image messages into the
//! relay and observe the velocity commands it forwards.

use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};

use super::SourceLink;
use crate::error::{RelayError, Result};
use crate::relay::{CommandSink, VelocityCommand};
use crate::video::ImageMessage;

/// The robot-side ends of a channel transport
pub struct ChannelHandle {
    pub frames: mpsc::Sender<ImageMessage>,
    pub commands: mpsc::Receiver<VelocityCommand>,
}

/// Create a linked relay/robot channel pair.
pub fn channel_transport(frame_capacity: usize, command_capacity: usize) -> (SourceLink, ChannelHandle) {
    let (frame_tx, frame_rx) = mpsc::channel(frame_capacity);
    let (command_tx, command_rx) = mpsc::channel(command_capacity);

    let link = SourceLink {
        frames: frame_rx,
        commands: Arc::new(ChannelSink { tx: command_tx }),
    };
    let handle = ChannelHandle {
        frames: frame_tx,
        commands: command_rx,
    };
    (link, handle)
}

struct ChannelSink {
    tx: mpsc::Sender<VelocityCommand>,
}

impl CommandSink for ChannelSink {
    fn publish(&self, command: VelocityCommand) -> Result<()> {
        self.tx.try_send(command).map_err(|e| match e {
            TrySendError::Full(_) => RelayError::SinkUnavailable("command queue full".into()),
            TrySendError::Closed(_) => RelayError::SinkUnavailable("robot side closed".into()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn busy_sink_drops_instead_of_queueing() {
        let (link, mut handle) = channel_transport(1, 1);
        let cmd = VelocityCommand::new(0.1, 0.0);
        assert!(link.commands.publish(cmd).is_ok());
        assert!(matches!(
            link.commands.publish(cmd),
            Err(RelayError::SinkUnavailable(_))
        ));
        assert_eq!(handle.commands.try_recv().unwrap(), cmd);
        assert!(handle.commands.try_recv().is_err());
    }

    #[test]
    fn closed_robot_side_is_reported() {
        let (link, handle) = channel_transport(1, 1);
        drop(handle);
        assert!(link.commands.publish(VelocityCommand::new(0.0, 0.0)).is_err());
    }
}
