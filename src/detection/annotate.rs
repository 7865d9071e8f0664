//! Drawing helpers for the inspection images.

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_circle_mut, draw_line_segment_mut};
use imageproc::rect::Rect;

pub const RED: Rgb<u8> = Rgb([255, 0, 0]);
pub const GREEN: Rgb<u8> = Rgb([0, 255, 0]);

/// Offsets covering a stroke of `thickness` pixels.
fn stroke_offsets(thickness: u32) -> std::ops::RangeInclusive<i32> {
    let t = thickness.max(1) as i32;
    -((t - 1) / 2)..=t / 2
}

/// Closed polygon outline.
pub fn draw_polygon_outline(img: &mut RgbImage, points: &[(i32, i32)], color: Rgb<u8>, thickness: u32) {
    if points.is_empty() {
        return;
    }
    if points.len() == 1 {
        let (x, y) = points[0];
        let t = thickness.max(1);
        let half = (t as i32 - 1) / 2;
        draw_filled_rect_mut(img, Rect::at(x - half, y - half).of_size(t, t), color);
        return;
    }
    for i in 0..points.len() {
        let (x0, y0) = points[i];
        let (x1, y1) = points[(i + 1) % points.len()];
        for oy in stroke_offsets(thickness) {
            for ox in stroke_offsets(thickness) {
                draw_line_segment_mut(
                    img,
                    ((x0 + ox) as f32, (y0 + oy) as f32),
                    ((x1 + ox) as f32, (y1 + oy) as f32),
                    color,
                );
            }
        }
    }
}

pub fn draw_circle(img: &mut RgbImage, center: (i32, i32), radius: i32, color: Rgb<u8>, thickness: u32) {
    for offset in stroke_offsets(thickness) {
        let r = radius + offset;
        if r >= 0 {
            draw_hollow_circle_mut(img, center, r, color);
        }
    }
}

// 3x5 glyphs, one row per byte, most significant of the low three bits on the left.
const HASH: [u8; 5] = [0b101, 0b111, 0b101, 0b111, 0b101];
const DIGITS: [[u8; 5]; 10] = [
    [0b111, 0b101, 0b101, 0b101, 0b111],
    [0b010, 0b110, 0b010, 0b010, 0b111],
    [0b111, 0b001, 0b111, 0b100, 0b111],
    [0b111, 0b001, 0b111, 0b001, 0b111],
    [0b101, 0b101, 0b111, 0b001, 0b001],
    [0b111, 0b100, 0b111, 0b001, 0b111],
    [0b111, 0b100, 0b111, 0b101, 0b111],
    [0b111, 0b001, 0b010, 0b010, 0b010],
    [0b111, 0b101, 0b111, 0b101, 0b111],
    [0b111, 0b101, 0b111, 0b001, 0b111],
];

/// Draws `#<n>` with its baseline-left corner at `origin`.
pub fn draw_label(img: &mut RgbImage, origin: (i32, i32), n: usize, color: Rgb<u8>, scale: u32) {
    let scale = scale.max(1);
    let glyph_h = 5 * scale as i32;
    let advance = 4 * scale as i32;
    let top = origin.1 - glyph_h;

    let text = n.to_string();
    let glyphs = std::iter::once(&HASH).chain(text.bytes().map(|b| &DIGITS[(b - b'0') as usize]));
    for (i, glyph) in glyphs.enumerate() {
        let left = origin.0 + i as i32 * advance;
        for (row, bits) in glyph.iter().enumerate() {
            for col in 0..3 {
                if bits & (0b100 >> col) != 0 {
                    let x = left + col * scale as i32;
                    let y = top + row as i32 * scale as i32;
                    draw_filled_rect_mut(img, Rect::at(x, y).of_size(scale, scale), color);
                }
            }
        }
    }
}
