use image::{Rgb, RgbImage};

/// A saturated kernel yellow: hue 26 on the 0..180 scale.
pub const KERNEL_YELLOW: Rgb<u8> = Rgb([230, 200, 20]);
pub const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

pub fn black_image(width: u32, height: u32) -> RgbImage {
    RgbImage::from_pixel(width, height, BLACK)
}

/// Axis-aligned yellow rectangles `(x, y, width, height)` on black.
pub fn yellow_rects(width: u32, height: u32, rects: &[(u32, u32, u32, u32)]) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        let inside = rects
            .iter()
            .any(|&(rx, ry, rw, rh)| x >= rx && x < rx + rw && y >= ry && y < ry + rh);
        if inside { KERNEL_YELLOW } else { BLACK }
    })
}

/// `count` yellow squares of side `side` in one row, `gap` pixels apart.
pub fn yellow_squares(count: u32, side: u32, gap: u32) -> RgbImage {
    let rects: Vec<_> = (0..count)
        .map(|i| (gap + i * (side + gap), gap, side, side))
        .collect();
    yellow_rects(gap + count * (side + gap), side + 2 * gap, &rects)
}

/// Filled yellow discs `(cx, cy, r)` on black.
pub fn yellow_discs(width: u32, height: u32, discs: &[(i32, i32, i32)]) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        let inside = discs.iter().any(|&(cx, cy, r)| {
            let (dx, dy) = (x as i32 - cx, y as i32 - cy);
            dx * dx + dy * dy <= r * r
        });
        if inside { KERNEL_YELLOW } else { BLACK }
    })
}

/// Two radius-25 discs whose centers are 44 pixels apart, so they overlap
/// in a narrow neck and form one connected blob.
pub fn touching_discs() -> RgbImage {
    yellow_discs(140, 80, &[(40, 40, 25), (84, 40, 25)])
}
