/*!
 * Inbound Adapter
 *
 * Converts camera image messages into relay frames: unpacks row padding,
 * normalizes channel order to RGB, and resamples to the output size.
 */

use image::imageops::{self, FilterType};
use image::RgbImage;
use tracing::debug;

use crate::error::{RelayError, Result};
use crate::video::{Frame, ImageMessage, SourceEncoding};

/// Converts source images to fixed-size RGB frames
#[derive(Debug, Clone)]
pub struct InboundAdapter {
    target_width: u32,
    target_height: u32,
    filter: FilterType,
}

impl InboundAdapter {
    pub fn new(target_width: u32, target_height: u32) -> Self {
        Self {
            target_width,
            target_height,
            filter: FilterType::Triangle,
        }
    }

    pub fn target_size(&self) -> (u32, u32) {
        (self.target_width, self.target_height)
    }

    /// Convert one message. On error the caller keeps its previous frame.
    pub fn convert(&self, msg: &ImageMessage) -> Result<Frame> {
        let encoding: SourceEncoding = msg.encoding.parse()?;
        let rgb = unpack_rgb(msg, encoding)?;

        if (msg.width, msg.height) == (self.target_width, self.target_height) {
            return Frame::from_rgb(msg.width, msg.height, rgb);
        }

        debug!(
            "Resizing {}x{} {} frame to {}x{}",
            msg.width, msg.height, msg.encoding, self.target_width, self.target_height
        );

        let source = RgbImage::from_raw(msg.width, msg.height, rgb).ok_or_else(|| {
            RelayError::MalformedImage("pixel buffer does not match dimensions".into())
        })?;
        let resized = imageops::resize(&source, self.target_width, self.target_height, self.filter);
        Frame::from_rgb(self.target_width, self.target_height, resized.into_raw())
    }
}

/// Strip row padding and reorder channels into packed RGB.
fn unpack_rgb(msg: &ImageMessage, encoding: SourceEncoding) -> Result<Vec<u8>> {
    if msg.width == 0 || msg.height == 0 {
        return Err(RelayError::MalformedImage(format!(
            "empty image {}x{}",
            msg.width, msg.height
        )));
    }

    let channels = encoding.channels();
    let row_bytes = msg.width as usize * channels;
    let step = msg.step as usize;
    if step < row_bytes {
        return Err(RelayError::MalformedImage(format!(
            "row step {} shorter than {} bytes of {} pixels",
            step, row_bytes, encoding.as_str()
        )));
    }
    let required = step * msg.height as usize;
    if msg.data.len() < required {
        return Err(RelayError::MalformedImage(format!(
            "{}x{} {} image needs {} bytes, got {}",
            msg.width,
            msg.height,
            encoding.as_str(),
            required,
            msg.data.len()
        )));
    }

    let mut rgb = Vec::with_capacity(Frame::expected_size(msg.width, msg.height));
    for row in msg.data.chunks_exact(step).take(msg.height as usize) {
        let pixels = &row[..row_bytes];
        match encoding {
            SourceEncoding::Rgb8 => rgb.extend_from_slice(pixels),
            SourceEncoding::Mono8 => {
                for &v in pixels {
                    rgb.extend_from_slice(&[v, v, v]);
                }
            }
            _ => {
                for px in pixels.chunks_exact(channels) {
                    if encoding.is_bgr() {
                        rgb.extend_from_slice(&[px[2], px[1], px[0]]);
                    } else {
                        rgb.extend_from_slice(&px[..3]);
                    }
                }
            }
        }
    }
    Ok(rgb)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bgr_is_swapped_to_rgb() {
        let adapter = InboundAdapter::new(2, 1);
        let msg = ImageMessage::packed(2, 1, SourceEncoding::Bgr8, vec![10, 20, 30, 40, 50, 60]);
        let frame = adapter.convert(&msg).unwrap();
        assert_eq!(frame.data, vec![30, 20, 10, 60, 50, 40]);
    }

    #[test]
    fn test_rgb_passes_through() {
        let adapter = InboundAdapter::new(2, 1);
        let msg = ImageMessage::packed(2, 1, SourceEncoding::Rgb8, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(adapter.convert(&msg).unwrap().data, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_alpha_dropped_and_mono_expanded() {
        let adapter = InboundAdapter::new(1, 1);
        let bgra = ImageMessage::packed(1, 1, SourceEncoding::Bgra8, vec![10, 20, 30, 255]);
        assert_eq!(adapter.convert(&bgra).unwrap().data, vec![30, 20, 10]);

        let mono = ImageMessage::packed(1, 1, SourceEncoding::Mono8, vec![77]);
        assert_eq!(adapter.convert(&mono).unwrap().data, vec![77, 77, 77]);
    }

    #[test]
    fn test_row_padding_is_skipped() {
        let adapter = InboundAdapter::new(1, 2);
        let msg = ImageMessage {
            width: 1,
            height: 2,
            encoding: "rgb8".into(),
            step: 4,
            data: vec![1, 2, 3, 0, 4, 5, 6, 0],
        };
        assert_eq!(adapter.convert(&msg).unwrap().data, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_resampled_to_target_size() {
        let adapter = InboundAdapter::new(640, 480);
        let data = [0u8, 0, 255].repeat(320 * 240);
        let msg = ImageMessage::packed(320, 240, SourceEncoding::Bgr8, data);
        let frame = adapter.convert(&msg).unwrap();
        assert_eq!((frame.width, frame.height), (640, 480));
        assert!(frame.is_valid());
        assert_eq!(frame.pixel(320, 240), Some([255, 0, 0]));
    }

    #[test]
    fn test_short_payload_rejected() {
        let adapter = InboundAdapter::new(4, 4);
        let msg = ImageMessage::packed(4, 4, SourceEncoding::Rgb8, vec![0u8; 47]);
        assert!(matches!(adapter.convert(&msg), Err(RelayError::MalformedImage(_))));
    }

    #[test]
    fn test_unsupported_encoding_rejected() {
        let adapter = InboundAdapter::new(4, 4);
        let msg = ImageMessage {
            width: 4,
            height: 4,
            encoding: "16UC1".into(),
            step: 8,
            data: vec![0u8; 32],
        };
        assert!(matches!(
            adapter.convert(&msg),
            Err(RelayError::UnsupportedEncoding(_))
        ));
    }
}
