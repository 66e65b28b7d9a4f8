//! Error taxonomy for the relay pipeline.
//!
//! Frame-level failures (`MalformedImage`, `UnsupportedEncoding`, `Encode`) are
//! transient: the offending frame is dropped and the loops keep running.
//! Command-level failures are reported back to the submitting viewer only.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    /// Raw pixel payload does not match the declared geometry.
    #[error("malformed image: {0}")]
    MalformedImage(String),

    /// Encoding tag with a channel layout the adapter cannot convert.
    #[error("unsupported image encoding '{0}'")]
    UnsupportedEncoding(String),

    /// JPEG compression failed.
    #[error("frame encoding failed: {0}")]
    Encode(#[from] image::ImageError),

    /// Upstream link could not be constructed.
    #[error("transport initialization failed: {0}")]
    TransportInit(String),

    #[error("camera source is not initialized")]
    SourceNotInitialized,

    #[error("camera source is disconnected")]
    SourceDisconnected,

    /// A velocity field could not be coerced to a float.
    #[error("invalid value for '{field}': {value}")]
    InvalidCommand { field: &'static str, value: String },

    /// Outbound command sink rejected the message (busy or closed).
    #[error("command sink unavailable: {0}")]
    SinkUnavailable(String),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, RelayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_viewer_readable() {
        let err = RelayError::InvalidCommand {
            field: "linear_x",
            value: "\"abc\"".to_string(),
        };
        assert_eq!(err.to_string(), "invalid value for 'linear_x': \"abc\"");
        assert!(RelayError::SourceDisconnected.to_string().contains("disconnected"));
    }
}
