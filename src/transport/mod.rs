/*!
 * Camera Transport
 *
 * The upstream link to the robot: an inbound stream of image messages and an
 * outbound sink for velocity commands. The relay only sees this pair, so any
 * middleware can be bridged in by producing a [`SourceLink`].
 */

pub mod channel;
pub mod synthetic;

pub use channel::{channel_transport, ChannelHandle};
pub use synthetic::{LoggingSink, TestPatternCamera};

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::{RelayConfig, SourceKind};
use crate::error::{RelayError, Result};
use crate::relay::CommandSink;
use crate::video::ImageMessage;

/// Both directions of an established upstream link
pub struct SourceLink {
    pub frames: mpsc::Receiver<ImageMessage>,
    pub commands: Arc<dyn CommandSink>,
}

/// Establish the upstream link selected by the configuration.
///
/// Must be called inside a tokio runtime; transports may spawn tasks.
pub fn connect(config: &RelayConfig, shutdown: CancellationToken) -> Result<SourceLink> {
    match config.source {
        SourceKind::Synthetic => {
            info!(
                "Using synthetic test-pattern camera ({}x{} @ {} FPS)",
                config.synthetic.width, config.synthetic.height, config.synthetic.fps
            );
            Ok(TestPatternCamera::new(config.synthetic.clone()).spawn(shutdown))
        }
        SourceKind::Disabled => Err(RelayError::TransportInit(
            "camera source disabled by configuration".into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_source_fails_to_connect() {
        let config = RelayConfig {
            source: SourceKind::Disabled,
            ..RelayConfig::default()
        };
        assert!(matches!(
            connect(&config, CancellationToken::new()),
            Err(RelayError::TransportInit(_))
        ));
    }

    #[tokio::test]
    async fn synthetic_source_produces_frames() {
        let token = CancellationToken::new();
        let mut link = connect(&RelayConfig::default(), token.clone()).unwrap();
        let msg = link.frames.recv().await.unwrap();
        assert_eq!((msg.width, msg.height), (320, 240));
        token.cancel();
    }
}
