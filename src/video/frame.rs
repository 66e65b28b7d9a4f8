/*!
 * Frame Representation
 *
 * Inbound image messages as delivered by the camera transport, and the
 * fixed-layout RGB frames the relay stores and broadcasts.
 */

use std::str::FromStr;

use crate::error::RelayError;

/// Pixel layout tag carried by inbound image messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceEncoding {
    /// RGB 8-bit per channel
    Rgb8,
    /// BGR 8-bit per channel (common for camera drivers)
    Bgr8,
    /// RGBA 8-bit per channel
    Rgba8,
    /// BGRA 8-bit per channel
    Bgra8,
    /// Single-channel grayscale
    Mono8,
}

impl SourceEncoding {
    /// Channels per pixel (one byte each)
    pub fn channels(&self) -> usize {
        match self {
            SourceEncoding::Rgb8 | SourceEncoding::Bgr8 => 3,
            SourceEncoding::Rgba8 | SourceEncoding::Bgra8 => 4,
            SourceEncoding::Mono8 => 1,
        }
    }

    /// Whether the colour channels are stored blue first
    pub fn is_bgr(&self) -> bool {
        matches!(self, SourceEncoding::Bgr8 | SourceEncoding::Bgra8)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceEncoding::Rgb8 => "rgb8",
            SourceEncoding::Bgr8 => "bgr8",
            SourceEncoding::Rgba8 => "rgba8",
            SourceEncoding::Bgra8 => "bgra8",
            SourceEncoding::Mono8 => "mono8",
        }
    }
}

impl FromStr for SourceEncoding {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rgb8" => Ok(SourceEncoding::Rgb8),
            "bgr8" => Ok(SourceEncoding::Bgr8),
            "rgba8" => Ok(SourceEncoding::Rgba8),
            "bgra8" => Ok(SourceEncoding::Bgra8),
            "mono8" | "8uc1" => Ok(SourceEncoding::Mono8),
            _ => Err(RelayError::UnsupportedEncoding(s.to_string())),
        }
    }
}

/// Raw image message from the camera transport
#[derive(Debug, Clone)]
pub struct ImageMessage {
    pub width: u32,
    pub height: u32,
    /// Encoding tag as published by the source (e.g. "bgr8")
    pub encoding: String,
    /// Row stride in bytes; rows may carry trailing padding
    pub step: u32,
    pub data: Vec<u8>,
}

impl ImageMessage {
    /// Build a tightly packed message for the given encoding.
    pub fn packed(width: u32, height: u32, encoding: SourceEncoding, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            encoding: encoding.as_str().to_string(),
            step: width * encoding.channels() as u32,
            data,
        }
    }
}

/// Relay frame: interleaved RGB, 3 bytes per pixel.
///
/// Frames are never mutated after construction; the buffer swaps whole
/// frames and readers hold shared snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    /// Wall-clock time the frame was produced, milliseconds since epoch
    pub timestamp_ms: i64,
}

impl Frame {
    pub const CHANNELS: usize = 3;

    /// Wrap RGB bytes, checking the length matches the geometry.
    pub fn from_rgb(width: u32, height: u32, data: Vec<u8>) -> Result<Self, RelayError> {
        let expected = Self::expected_size(width, height);
        if data.len() != expected {
            return Err(RelayError::MalformedImage(format!(
                "{}x{} RGB frame needs {} bytes, got {}",
                width,
                height,
                expected,
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
            timestamp_ms: now_ms(),
        })
    }

    /// Frame filled with a single colour
    pub fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let data = rgb
            .iter()
            .copied()
            .cycle()
            .take(Self::expected_size(width, height))
            .collect();
        Self {
            width,
            height,
            data,
            timestamp_ms: now_ms(),
        }
    }

    pub fn expected_size(width: u32, height: u32) -> usize {
        width as usize * height as usize * Self::CHANNELS
    }

    pub fn is_valid(&self) -> bool {
        self.data.len() == Self::expected_size(self.width, self.height)
    }

    /// RGB triple at (x, y)
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y as usize * self.width as usize + x as usize) * Self::CHANNELS;
        Some([self.data[idx], self.data[idx + 1], self.data[idx + 2]])
    }
}

/// Milliseconds since the Unix epoch
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
