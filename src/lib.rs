/*!
 * Camera Relay Library
 *
 * Relays a robot camera feed to browser viewers and forwards their velocity
 * commands back to the robot.
 */

pub mod config;
pub mod error;
pub mod metrics;
pub mod protocol;
pub mod relay;
pub mod server;
pub mod transport;
pub mod video;

// Re-export commonly used types
pub use config::RelayConfig;
pub use error::{RelayError, Result};
pub use relay::{RelayContext, VelocityCommand, ViewerSession};
pub use transport::SourceLink;
pub use video::{EncodedFrame, Frame, ImageMessage, JpegEncoder};
