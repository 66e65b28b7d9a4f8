//! Placeholder frame shown while no camera frames are arriving.
//!
//! A dark background with a centred "WAITING FOR CAMERA..." caption drawn
//! from a 5x7 bitmap font.

use super::frame::{now_ms, Frame};

pub const CAPTION: &str = "WAITING FOR CAMERA...";

const BACKGROUND: [u8; 3] = [24, 24, 24];
const INK: [u8; 3] = [220, 220, 220];

const GLYPH_W: u32 = 5;
const GLYPH_H: u32 = 7;
/// Horizontal advance including one column of spacing
const ADVANCE: u32 = GLYPH_W + 1;

/// Row bitmaps, most significant of the low five bits is the leftmost column.
fn glyph(c: char) -> [u8; 7] {
    match c.to_ascii_uppercase() {
        'A' => [0b01110, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'C' => [0b01110, 0b10001, 0b10000, 0b10000, 0b10000, 0b10001, 0b01110],
        'E' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b11111],
        'F' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b10000],
        'G' => [0b01110, 0b10001, 0b10000, 0b10111, 0b10001, 0b10001, 0b01111],
        'I' => [0b01110, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        'M' => [0b10001, 0b11011, 0b10101, 0b10101, 0b10001, 0b10001, 0b10001],
        'N' => [0b10001, 0b11001, 0b10101, 0b10011, 0b10001, 0b10001, 0b10001],
        'O' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'R' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10100, 0b10010, 0b10001],
        'T' => [0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100],
        'W' => [0b10001, 0b10001, 0b10001, 0b10101, 0b10101, 0b10101, 0b01010],
        '.' => [0, 0, 0, 0, 0, 0b01100, 0b01100],
        _ => [0; 7],
    }
}

/// Generate a fresh placeholder frame of the given size.
pub fn placeholder_frame(width: u32, height: u32) -> Frame {
    let mut frame = Frame::solid(width, height, BACKGROUND);
    draw_caption(&mut frame, CAPTION);
    frame.timestamp_ms = now_ms();
    frame
}

fn draw_caption(frame: &mut Frame, text: &str) {
    let chars = text.chars().count() as u32;
    if chars == 0 {
        return;
    }
    let natural_width = chars * ADVANCE - 1;
    // Largest integer scale that leaves a margin, capped so the caption stays a caption.
    let scale = (frame.width * 3 / 4 / natural_width).clamp(1, 4);
    let text_w = natural_width * scale;
    let text_h = GLYPH_H * scale;
    if text_w > frame.width || text_h > frame.height {
        return;
    }
    let origin_x = (frame.width - text_w) / 2;
    let origin_y = (frame.height - text_h) / 2;

    for (i, c) in text.chars().enumerate() {
        let rows = glyph(c);
        let gx = origin_x + i as u32 * ADVANCE * scale;
        for (row, bits) in rows.iter().enumerate() {
            for col in 0..GLYPH_W {
                if bits & (1 << (GLYPH_W - 1 - col)) == 0 {
                    continue;
                }
                fill_block(
                    frame,
                    gx + col * scale,
                    origin_y + row as u32 * scale,
                    scale,
                );
            }
        }
    }
}

fn fill_block(frame: &mut Frame, x0: u32, y0: u32, size: u32) {
    let width = frame.width as usize;
    for y in y0..(y0 + size).min(frame.height) {
        for x in x0..(x0 + size).min(frame.width) {
            let idx = (y as usize * width + x as usize) * Frame::CHANNELS;
            frame.data[idx..idx + Frame::CHANNELS].copy_from_slice(&INK);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_has_requested_size() {
        let frame = placeholder_frame(640, 480);
        assert!(frame.is_valid());
        assert_eq!((frame.width, frame.height), (640, 480));
    }

    #[test]
    fn placeholder_is_dark_with_centred_caption() {
        let frame = placeholder_frame(640, 480);
        assert_eq!(frame.pixel(0, 0), Some(BACKGROUND));
        assert_eq!(frame.pixel(639, 479), Some(BACKGROUND));

        let ink_rows: Vec<u32> = (0..frame.height)
            .filter(|&y| (0..frame.width).any(|x| frame.pixel(x, y) == Some(INK)))
            .collect();
        assert!(!ink_rows.is_empty());
        let top = *ink_rows.first().unwrap();
        let bottom = *ink_rows.last().unwrap();
        // Vertically centred within a pixel or two
        assert!((top as i32 - (479 - bottom) as i32).abs() <= 2);
    }

    #[test]
    fn tiny_frames_skip_the_caption() {
        let frame = placeholder_frame(8, 4);
        assert!(frame.data.chunks(3).all(|px| px == BACKGROUND));
    }
}
