use image::imageops::{self, FilterType};
use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::contrast::otsu_level;
use imageproc::filter::gaussian_blur_f32;
use imageproc::map::map_colors;
use rayon::prelude::*;

/// Convert RGB to 8-bit HSV stored in the three channels of an `RgbImage`.
///
/// Hue is halved to fit a byte (0..180), saturation and value span 0..255.
pub fn rgb_to_hsv(img: &RgbImage) -> RgbImage {
    map_colors(img, |Rgb([r, g, b])| {
        let (r, g, b) = (r as f32, g as f32, b as f32);
        let v = r.max(g).max(b);
        let min = r.min(g).min(b);
        let diff = v - min;
        let s = if v > 0.0 { 255.0 * diff / v } else { 0.0 };
        let mut h = if diff == 0.0 {
            0.0
        } else if v == r {
            60.0 * (g - b) / diff
        } else if v == g {
            120.0 + 60.0 * (b - r) / diff
        } else {
            240.0 + 60.0 * (r - g) / diff
        };
        if h < 0.0 {
            h += 360.0;
        }
        let h = (h / 2.0).round().min(179.0);
        Rgb([h as u8, s.round() as u8, v as u8])
    })
}

pub fn to_grayscale(img: &RgbImage) -> GrayImage {
    image::imageops::grayscale(img)
}

/// Gaussian blur applied to every channel independently.
pub fn apply_blur(img: &RgbImage, sigma: f32) -> RgbImage {
    if sigma <= 0.0 {
        return img.clone();
    }
    gaussian_blur_f32(img, sigma)
}

/// 255 where every channel lies inside `[lower, upper]`, 0 elsewhere.
pub fn in_range(img: &RgbImage, lower: [u8; 3], upper: [u8; 3]) -> GrayImage {
    map_colors(img, |Rgb(px)| {
        let inside = (0..3).all(|c| px[c] >= lower[c] && px[c] <= upper[c]);
        Luma([if inside { 255 } else { 0 }])
    })
}

/// Binary erosion with a `width` x `height` rectangle anchored at its center.
///
/// Pixels outside the image do not erode their neighbors.
pub fn erode_rect(mask: &GrayImage, width: u32, height: u32) -> GrayImage {
    let (w, h) = mask.dimensions();
    if width <= 1 && height <= 1 {
        return mask.clone();
    }
    let horizontal = min_filter_1d(mask.as_raw(), w as usize, h as usize, width as usize, true);
    let both = min_filter_1d(&horizontal, w as usize, h as usize, height as usize, false);
    GrayImage::from_raw(w, h, both).unwrap_or_else(|| GrayImage::new(w, h))
}

fn min_filter_1d(data: &[u8], w: usize, h: usize, size: usize, along_rows: bool) -> Vec<u8> {
    let before = size / 2;
    let after = size.saturating_sub(1) - before;
    let mut out = vec![0u8; data.len()];
    let (lines, len) = if along_rows { (h, w) } else { (w, h) };
    let index = |line: usize, i: usize| if along_rows { line * w + i } else { i * w + line };
    for line in 0..lines {
        for i in 0..len {
            let start = i.saturating_sub(before);
            let end = (i + after).min(len - 1);
            let min = (start..=end).map(|j| data[index(line, j)]).min().unwrap_or(0);
            out[index(line, i)] = min;
        }
    }
    out
}

/// Keep `img` pixels where `mask` is non-zero, black elsewhere.
pub fn apply_mask(img: &RgbImage, mask: &GrayImage) -> RgbImage {
    RgbImage::from_fn(img.width(), img.height(), |x, y| {
        if mask.get_pixel(x, y)[0] > 0 {
            *img.get_pixel(x, y)
        } else {
            Rgb([0, 0, 0])
        }
    })
}

/// Binarize against the mean of a `block_size` square around each pixel.
///
/// A pixel becomes 255 when it is strictly brighter than its local mean
/// minus `offset`. Borders replicate the edge pixels. An even `block_size`
/// acts as the next odd size; `Config::from_file` rejects one.
pub fn adaptive_mean_threshold(gray: &GrayImage, block_size: u32, offset: f32) -> GrayImage {
    let (w, h) = gray.dimensions();
    let (wu, hu) = (w as usize, h as usize);
    if wu == 0 || hu == 0 {
        return gray.clone();
    }
    let radius = (block_size.max(1) as usize) / 2;
    let src: Vec<u64> = gray.as_raw().iter().map(|&p| p as u64).collect();
    let rows = box_sum_1d(&src, wu, hu, radius, true);
    let sums = box_sum_1d(&rows, wu, hu, radius, false);
    let area = ((2 * radius + 1) * (2 * radius + 1)) as f64;

    let data = src
        .iter()
        .zip(sums.iter())
        .map(|(&p, &s)| {
            let mean = s as f64 / area;
            if p as f64 > mean - offset as f64 { 255 } else { 0 }
        })
        .collect();
    GrayImage::from_raw(w, h, data).unwrap_or_else(|| GrayImage::new(w, h))
}

/// Sliding window sum of width `2 * radius + 1` with clamped indices.
fn box_sum_1d(data: &[u64], w: usize, h: usize, radius: usize, along_rows: bool) -> Vec<u64> {
    let mut out = vec![0u64; data.len()];
    let (lines, len) = if along_rows { (h, w) } else { (w, h) };
    let index = |line: usize, i: usize| if along_rows { line * w + i } else { i * w + line };
    let r = radius as isize;
    let clamp = |i: isize| i.clamp(0, len as isize - 1) as usize;
    for line in 0..lines {
        let mut sum: u64 = (-r..=r).map(|k| data[index(line, clamp(k))]).sum();
        out[index(line, 0)] = sum;
        for i in 1..len as isize {
            sum += data[index(line, clamp(i + r))];
            sum -= data[index(line, clamp(i - r - 1))];
            out[index(line, i as usize)] = sum;
        }
    }
    out
}

/// Climb from `(x, y)` toward the mean position and color of the neighbors
/// within `sp` pixels whose color lies within `sqrt(sr2)` of the current one.
fn shift_pixel(img: &RgbImage, x: u32, y: u32, sp: i64, sr2: f32, max_iterations: u32) -> [u8; 3] {
    let (w, h) = img.dimensions();
    let mut cx = x as i64;
    let mut cy = y as i64;
    let mut color = img.get_pixel(x, y).0.map(|c| c as f32);

    for _ in 0..max_iterations {
        let (mut sx, mut sy, mut n) = (0i64, 0i64, 0u32);
        let mut sc = [0f32; 3];
        for yy in (cy - sp).max(0)..=(cy + sp).min(h as i64 - 1) {
            for xx in (cx - sp).max(0)..=(cx + sp).min(w as i64 - 1) {
                let px = img.get_pixel(xx as u32, yy as u32).0;
                let d2: f32 = (0..3).map(|c| (px[c] as f32 - color[c]).powi(2)).sum();
                if d2 <= sr2 {
                    sx += xx;
                    sy += yy;
                    n += 1;
                    for c in 0..3 {
                        sc[c] += px[c] as f32;
                    }
                }
            }
        }
        if n == 0 {
            break;
        }
        let nx = (sx as f64 / n as f64).round() as i64;
        let ny = (sy as f64 / n as f64).round() as i64;
        let next = sc.map(|s| (s / n as f32).round());
        let shift = (nx - cx).abs() as f32
            + (ny - cy).abs() as f32
            + (0..3).map(|c| (next[c] - color[c]).abs()).sum::<f32>();
        cx = nx;
        cy = ny;
        color = next;
        if shift <= 1.0 {
            break;
        }
    }
    color.map(|c| c.clamp(0.0, 255.0) as u8)
}

fn color_dist2(a: [u8; 3], b: [u8; 3]) -> f32 {
    (0..3).map(|c| (a[c] as f32 - b[c] as f32).powi(2)).sum()
}

/// Mean-shift smoothing of every pixel at full resolution.
///
/// Each pixel climbs toward the mean position and color of the neighbors
/// within `spatial_radius` pixels whose color lies within `color_radius`
/// (Euclidean, RGB). Flat regions converge to one color while edges between
/// dissimilar colors survive.
pub fn mean_shift_filter(
    img: &RgbImage,
    spatial_radius: u32,
    color_radius: f32,
    max_iterations: u32,
) -> RgbImage {
    let (w, h) = img.dimensions();
    let mut out = RgbImage::new(w, h);
    if w == 0 || h == 0 {
        return out;
    }
    let sr2 = color_radius * color_radius;
    let sp = spatial_radius as i64;

    out.par_chunks_mut(w as usize * 3).enumerate().for_each(|(y, row)| {
        for x in 0..w {
            let color = shift_pixel(img, x, y as u32, sp, sr2, max_iterations);
            row[x as usize * 3..x as usize * 3 + 3].copy_from_slice(&color);
        }
    });
    out
}

/// Mean shift over an image pyramid, coarse to fine.
///
/// The half-resolution image is smoothed first (recursively, `levels`
/// deep) and scaled back up. At full resolution only pixels near a color
/// edge of that result, or far from their own color, climb again; the rest
/// keep the upsampled color.
pub fn pyramid_mean_shift_filter(
    img: &RgbImage,
    spatial_radius: u32,
    color_radius: f32,
    max_iterations: u32,
    levels: u32,
) -> RgbImage {
    let (w, h) = img.dimensions();
    if levels == 0 || w < 2 || h < 2 {
        return mean_shift_filter(img, spatial_radius, color_radius, max_iterations);
    }
    let half = imageops::resize(img, w.div_ceil(2), h.div_ceil(2), FilterType::Triangle);
    let coarse =
        pyramid_mean_shift_filter(&half, spatial_radius, color_radius, max_iterations, levels - 1);
    let up = imageops::resize(&coarse, w, h, FilterType::Triangle);

    let sr2 = color_radius * color_radius;
    let edge2 = sr2 / 4.0;
    let sp = spatial_radius as i64;
    let mut out = RgbImage::new(w, h);

    out.par_chunks_mut(w as usize * 3).enumerate().for_each(|(y, row)| {
        let y = y as u32;
        for x in 0..w {
            let here = up.get_pixel(x, y).0;
            let near_edge = (y.saturating_sub(1)..=(y + 1).min(h - 1)).any(|ny| {
                (x.saturating_sub(1)..=(x + 1).min(w - 1))
                    .any(|nx| color_dist2(here, up.get_pixel(nx, ny).0) > edge2)
            });
            let color = if near_edge || color_dist2(here, img.get_pixel(x, y).0) > sr2 {
                shift_pixel(img, x, y, sp, sr2, max_iterations)
            } else {
                here
            };
            row[x as usize * 3..x as usize * 3 + 3].copy_from_slice(&color);
        }
    });
    out
}

/// Global binarization at the Otsu level: 255 above the level, 0 otherwise.
pub fn otsu_binarize(gray: &GrayImage) -> GrayImage {
    let level = otsu_level(gray);
    map_colors(gray, |Luma([p])| Luma([if p > level { 255 } else { 0 }]))
}
