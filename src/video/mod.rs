/*!
 * Video Module
 *
 * Frame types, JPEG encoding, and the placeholder image shown while the
 * camera is silent.
 */

pub mod encoder;
pub mod frame;
pub mod placeholder;

pub use encoder::{EncodedFrame, FrameEncoder, JpegEncoder};
pub use frame::{now_ms, Frame, ImageMessage, SourceEncoding};
pub use placeholder::placeholder_frame;
