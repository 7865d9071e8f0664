use image::{GrayImage, RgbImage};
use imageproc::contours::{find_contours as trace_borders, BorderType};
use log::debug;

use crate::config::ContourConfig;
use crate::detection::{annotate, preprocessing};
use crate::error::Result;
use crate::models::{Contour, ContourResult, ContourSet};

/// Outermost borders of the foreground regions of a binary image, with
/// straight runs collapsed to their end points.
///
/// The image is traced inside a one-pixel background frame, so regions
/// touching the image edge are still outermost borders.
pub fn external_contours(binary: &GrayImage) -> ContourSet {
    let (w, h) = binary.dimensions();
    let mut framed = GrayImage::new(w + 2, h + 2);
    image::imageops::replace(&mut framed, binary, 1, 1);

    trace_borders::<i32>(&framed)
        .into_iter()
        .filter(|c| c.parent.is_none() && c.border_type == BorderType::Outer)
        .filter_map(|c| {
            let points = c.points.iter().map(|p| (p.x - 1, p.y - 1)).collect::<Vec<_>>();
            Contour::new(simplify_chain(points))
        })
        .collect()
}

/// Drop every point whose incoming and outgoing steps point the same way.
///
/// The input is a closed boundary; horizontal, vertical and diagonal runs
/// each reduce to their two end points.
pub fn simplify_chain(points: Vec<(i32, i32)>) -> Vec<(i32, i32)> {
    let n = points.len();
    if n < 3 {
        return points;
    }
    let direction = |a: (i32, i32), b: (i32, i32)| ((b.0 - a.0).signum(), (b.1 - a.1).signum());
    let kept: Vec<(i32, i32)> = (0..n)
        .filter(|&i| {
            let prev = points[(i + n - 1) % n];
            let next = points[(i + 1) % n];
            direction(prev, points[i]) != direction(points[i], next)
        })
        .map(|i| points[i])
        .collect();
    if kept.is_empty() {
        // a degenerate loop where every step agrees; keep its start
        vec![points[0]]
    } else {
        kept
    }
}

/// Outlines kernel regions of a masked image and measures their shape.
#[derive(Debug, Clone, Default)]
pub struct ContourExtractor {
    pub config: ContourConfig,
}

impl ContourExtractor {
    pub fn new(config: ContourConfig) -> Self {
        Self { config }
    }

    /// Binarize with the local mean, since illumination varies over the ear.
    pub fn threshold(&self, image: &RgbImage) -> GrayImage {
        let gray = preprocessing::to_grayscale(image);
        preprocessing::adaptive_mean_threshold(&gray, self.config.block_size, self.config.offset)
    }

    pub fn extract(&self, image: &RgbImage) -> ContourResult {
        let binary = self.threshold(image);
        let contours = external_contours(&binary);
        debug!("Found {} external contours", contours.len());

        let mut annotated = image.clone();
        for contour in contours.iter() {
            annotate::draw_polygon_outline(
                &mut annotated,
                &contour.points,
                annotate::RED,
                self.config.line_width,
            );
        }
        ContourResult {
            image: annotated,
            contours,
        }
    }
}

/// Outlined image, contours and mean width/height ratio with the default
/// settings. Fails when no contour is found.
pub fn find_contours(image: &RgbImage) -> Result<(RgbImage, ContourSet, f64)> {
    let result = ContourExtractor::default().extract(image);
    let ratio = result.avg_width_height_ratio()?;
    Ok((result.image, result.contours, ratio))
}
