//! Marker-based watershed over the distance transform of a binary mask.

use image::{GrayImage, ImageBuffer, Luma};
use imageproc::distance_transform::euclidean_squared_distance_transform;
use imageproc::map::map_colors;
use imageproc::region_labelling::{connected_components, Connectivity};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

/// Per-pixel segment labels; 0 is background.
#[derive(Debug, Clone)]
pub struct Segmentation {
    pub width: u32,
    pub height: u32,
    pub labels: Vec<u32>,
}

impl Segmentation {
    pub fn label_at(&self, x: u32, y: u32) -> u32 {
        self.labels[(y * self.width + x) as usize]
    }

    /// Distinct non-background labels, ascending.
    pub fn distinct_labels(&self) -> Vec<u32> {
        let set: HashSet<u32> = self.labels.iter().copied().filter(|&l| l != 0).collect();
        let mut labels: Vec<u32> = set.into_iter().collect();
        labels.sort_unstable();
        labels
    }

    pub fn count(&self) -> usize {
        self.distinct_labels().len()
    }
}

/// Euclidean distance from every foreground pixel to the nearest
/// background pixel. Background pixels are 0.
///
/// Pixels just outside the image count as background, so a mask with no
/// background pixel still peaks at its center.
pub fn distance_map(mask: &GrayImage) -> Vec<f64> {
    let (w, h) = mask.dimensions();
    let mut inverted = GrayImage::from_pixel(w + 2, h + 2, Luma([255u8]));
    let interior = map_colors(mask, |Luma([p])| Luma([if p > 0 { 0u8 } else { 255u8 }]));
    image::imageops::replace(&mut inverted, &interior, 1, 1);
    let squared = euclidean_squared_distance_transform(&inverted);
    mask.enumerate_pixels()
        .map(|(x, y, m)| {
            if m[0] > 0 {
                squared.get_pixel(x + 1, y + 1)[0].sqrt()
            } else {
                0.0
            }
        })
        .collect()
}

fn max_filter_1d(data: &[f64], w: usize, h: usize, radius: usize, along_rows: bool) -> Vec<f64> {
    let mut out = vec![0.0; data.len()];
    let (lines, len) = if along_rows { (h, w) } else { (w, h) };
    let index = |line: usize, i: usize| if along_rows { line * w + i } else { i * w + line };
    for line in 0..lines {
        for i in 0..len {
            let start = i.saturating_sub(radius);
            let end = (i + radius).min(len - 1);
            out[index(line, i)] = (start..=end)
                .map(|j| data[index(line, j)])
                .fold(f64::MIN, f64::max);
        }
    }
    out
}

/// Local maxima of `dist` inside a `2 * min_distance + 1` square, no two
/// closer than `min_distance` (Chebyshev). Higher peaks win.
pub fn find_peaks(dist: &[f64], width: u32, height: u32, min_distance: u32) -> Vec<(u32, u32)> {
    let (w, h) = (width as usize, height as usize);
    if w == 0 || h == 0 {
        return Vec::new();
    }
    let r = min_distance as usize;
    let rows = max_filter_1d(dist, w, h, r, true);
    let local_max = max_filter_1d(&rows, w, h, r, false);

    let mut candidates: Vec<usize> = (0..w * h)
        .filter(|&i| dist[i] > 0.0 && dist[i] >= local_max[i])
        .collect();
    // stable sort keeps row-major order among equal heights
    candidates.sort_by(|&a, &b| dist[b].total_cmp(&dist[a]));

    let mut accepted: Vec<(u32, u32)> = Vec::new();
    for i in candidates {
        let (x, y) = ((i % w) as u32, (i / w) as u32);
        let too_close = accepted
            .iter()
            .any(|&(px, py)| px.abs_diff(x).max(py.abs_diff(y)) <= min_distance);
        if !too_close {
            accepted.push((x, y));
        }
    }
    accepted
}

/// Seed image labelling each 8-connected group of peak pixels.
pub fn label_seeds(peaks: &[(u32, u32)], width: u32, height: u32) -> ImageBuffer<Luma<u32>, Vec<u32>> {
    let mut markers = GrayImage::new(width, height);
    for &(x, y) in peaks {
        markers.put_pixel(x, y, Luma([255]));
    }
    connected_components(&markers, Connectivity::Eight, Luma([0]))
}

#[derive(Debug, PartialEq)]
struct QueueEntry {
    height: f64,
    age: u64,
    index: usize,
}

impl Eq for QueueEntry {}

impl Ord for QueueEntry {
    // BinaryHeap pops the greatest: highest distance first, then oldest.
    fn cmp(&self, other: &Self) -> Ordering {
        self.height
            .total_cmp(&other.height)
            .then_with(|| other.age.cmp(&self.age))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Flood the inverted distance map from `seeds`, restricted to `mask`.
///
/// Every foreground pixel reachable from a seed takes that seed's label;
/// regions meet where the distance map has its valleys.
pub fn flood(
    dist: &[f64],
    mask: &GrayImage,
    seeds: &ImageBuffer<Luma<u32>, Vec<u32>>,
) -> Segmentation {
    let (width, height) = mask.dimensions();
    let (w, h) = (width as usize, height as usize);
    let mut labels = vec![0u32; w * h];
    let mut heap = BinaryHeap::new();
    let mut age = 0u64;

    let foreground = mask.as_raw();
    for (i, seed) in seeds.as_raw().iter().enumerate() {
        if *seed != 0 && foreground[i] > 0 {
            labels[i] = *seed;
            heap.push(QueueEntry { height: dist[i], age, index: i });
            age += 1;
        }
    }

    while let Some(QueueEntry { index, .. }) = heap.pop() {
        let (x, y) = (index % w, index / w);
        let label = labels[index];
        let neighbors = [
            (x > 0).then(|| index - 1),
            (x + 1 < w).then(|| index + 1),
            (y > 0).then(|| index - w),
            (y + 1 < h).then(|| index + w),
        ];
        for n in neighbors.into_iter().flatten() {
            if foreground[n] > 0 && labels[n] == 0 {
                labels[n] = label;
                heap.push(QueueEntry { height: dist[n], age, index: n });
                age += 1;
            }
        }
    }

    Segmentation { width, height, labels }
}

/// Distance transform, peak seeds and flood in one call.
pub fn segment(mask: &GrayImage, min_distance: u32) -> Segmentation {
    let (w, h) = mask.dimensions();
    let dist = distance_map(mask);
    let peaks = find_peaks(&dist, w, h, min_distance);
    let seeds = label_seeds(&peaks, w, h);
    flood(&dist, mask, &seeds)
}
