/*!
 * Frame Encoder
 *
 * Compresses relay frames to JPEG for delivery to browser viewers.
 * Viewers receive the compressed bytes as base64 text.
 */

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::codecs::jpeg::JpegEncoder as ImageJpegEncoder;
use image::ColorType;
use tracing::debug;

use super::frame::Frame;
use crate::error::{RelayError, Result};

/// Compressed frame ready for transmission
#[derive(Debug, Clone)]
pub struct EncodedFrame {
    /// JPEG bytes
    pub data: Vec<u8>,
    /// Capture time of the source frame, milliseconds since epoch
    pub timestamp_ms: i64,
    pub width: u32,
    pub height: u32,
}

impl EncodedFrame {
    /// Transport-safe text form of the compressed bytes
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.data)
    }
}

/// Frame compression seam
pub trait FrameEncoder: Send {
    fn encode(&mut self, frame: &Frame) -> Result<EncodedFrame>;

    /// Name for log output
    fn name(&self) -> &'static str;
}

/// Baseline JPEG encoder at a fixed quality
#[derive(Debug, Clone)]
pub struct JpegEncoder {
    quality: u8,
    /// Reused output buffer capacity hint
    last_size: usize,
}

impl JpegEncoder {
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
            last_size: 0,
        }
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }
}

impl FrameEncoder for JpegEncoder {
    fn encode(&mut self, frame: &Frame) -> Result<EncodedFrame> {
        if !frame.is_valid() {
            return Err(RelayError::MalformedImage(format!(
                "refusing to encode {}x{} frame with {} bytes",
                frame.width,
                frame.height,
                frame.data.len()
            )));
        }

        let mut data = Vec::with_capacity(self.last_size);
        ImageJpegEncoder::new_with_quality(&mut data, self.quality).encode(
            &frame.data,
            frame.width,
            frame.height,
            ColorType::Rgb8,
        )?;
        self.last_size = data.len();

        debug!(
            "Encoded {}x{} frame to {} bytes (q={})",
            frame.width,
            frame.height,
            data.len(),
            self.quality
        );

        Ok(EncodedFrame {
            data,
            timestamp_ms: frame.timestamp_ms,
            width: frame.width,
            height: frame.height,
        })
    }

    fn name(&self) -> &'static str {
        "jpeg"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::ImageFormat;

    #[test]
    fn test_solid_frame_survives_jpeg() {
        let frame = Frame::solid(64, 48, [200, 40, 90]);
        let mut encoder = JpegEncoder::new(70);
        let encoded = encoder.encode(&frame).unwrap();

        // Viewer side: base64 text -> JPEG -> pixels
        let bytes = STANDARD.decode(encoded.to_base64()).unwrap();
        assert_eq!(bytes, encoded.data);
        let decoded = image::load_from_memory_with_format(&bytes, ImageFormat::Jpeg)
            .unwrap()
            .to_rgb8();

        assert_eq!(decoded.dimensions(), (64, 48));
        let px = decoded.get_pixel(32, 24).0;
        for (got, want) in px.iter().zip([200u8, 40, 90]) {
            assert!(
                (*got as i32 - want as i32).abs() <= 12,
                "channel drifted: got {:?}",
                px
            );
        }
    }

    #[test]
    fn test_capture_timestamp_is_kept() {
        let mut frame = Frame::solid(8, 8, [1, 2, 3]);
        frame.timestamp_ms = 1_234;
        let mut encoder = JpegEncoder::new(70);
        assert_eq!(encoder.encode(&frame).unwrap().timestamp_ms, 1_234);
        // Re-encoding the same frame does not restamp it
        assert_eq!(encoder.encode(&frame).unwrap().timestamp_ms, 1_234);
    }

    #[test]
    fn test_quality_is_clamped() {
        assert_eq!(JpegEncoder::new(0).quality(), 1);
        assert_eq!(JpegEncoder::new(255).quality(), 100);
    }

    #[test]
    fn test_invalid_frame_rejected() {
        let mut frame = Frame::solid(4, 4, [0, 0, 0]);
        frame.data.truncate(10);
        let mut encoder = JpegEncoder::new(70);
        assert!(matches!(
            encoder.encode(&frame),
            Err(RelayError::MalformedImage(_))
        ));
    }
}
