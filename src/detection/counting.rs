use image::{GrayImage, Luma, RgbImage};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::config::CounterConfig;
use crate::detection::circles::{min_enclosing_circle, polygon_area};
use crate::detection::contours::external_contours;
use crate::detection::{annotate, preprocessing, watershed};
use crate::error::{Error, Result};
use crate::models::{Contour, CountResult};

const LABEL_SCALE: u32 = 2;
const SHAPE_THICKNESS: u32 = 2;

/// Kernel counting strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CountMethod {
    /// Distance-transform watershed; separates touching kernels.
    Watershed,
    /// One kernel per external contour of the Otsu mask.
    #[default]
    #[serde(alias = "otsu")]
    Contour,
}

impl CountMethod {
    pub fn name(&self) -> &'static str {
        match self {
            CountMethod::Watershed => "watershed",
            CountMethod::Contour => "contour",
        }
    }
}

impl fmt::Display for CountMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CountMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "watershed" => Ok(CountMethod::Watershed),
            "contour" | "otsu" => Ok(CountMethod::Contour),
            _ => Err(Error::UnknownCountMethod(s.to_string())),
        }
    }
}

/// Numeric selectors: 0 is watershed, 1 is contour.
impl TryFrom<u8> for CountMethod {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(CountMethod::Watershed),
            1 => Ok(CountMethod::Contour),
            other => Err(Error::UnknownCountMethod(other.to_string())),
        }
    }
}

/// Counts distinct kernels in an image.
#[derive(Debug, Clone, Default)]
pub struct KernelCounter {
    pub config: CounterConfig,
}

impl KernelCounter {
    pub fn new(config: CounterConfig) -> Self {
        Self { config }
    }

    /// Mean-shift smoothing, grayscale and an Otsu threshold.
    pub fn binarize(&self, image: &RgbImage) -> GrayImage {
        let shifted = preprocessing::pyramid_mean_shift_filter(
            image,
            self.config.spatial_radius,
            self.config.color_radius,
            self.config.mean_shift_iterations,
            self.config.pyramid_levels,
        );
        preprocessing::otsu_binarize(&preprocessing::to_grayscale(&shifted))
    }

    pub fn count(&self, image: &RgbImage, method: CountMethod) -> CountResult {
        let binary = self.binarize(image);
        let result = match method {
            CountMethod::Contour => count_by_contours(image, &binary),
            CountMethod::Watershed => {
                count_by_watershed(image, &binary, self.config.min_peak_distance)
            }
        };
        debug!("{} method counted {} kernels", method, result.count);
        result
    }
}

fn draw_numbered(img: &mut RgbImage, center: (f64, f64), n: usize) {
    let origin = (center.0 as i32 - 10, center.1 as i32);
    annotate::draw_label(img, origin, n, annotate::RED, LABEL_SCALE);
}

fn count_by_contours(image: &RgbImage, binary: &GrayImage) -> CountResult {
    let contours = external_contours(binary);
    let mut annotated = image.clone();
    for (i, contour) in contours.iter().enumerate() {
        annotate::draw_polygon_outline(&mut annotated, &contour.points, annotate::GREEN, SHAPE_THICKNESS);
        draw_numbered(&mut annotated, contour.centroid(), i + 1);
    }
    CountResult {
        image: annotated,
        count: contours.len(),
    }
}

fn count_by_watershed(image: &RgbImage, binary: &GrayImage, min_distance: u32) -> CountResult {
    let seg = watershed::segment(binary, min_distance);

    let mut boxes: BTreeMap<u32, (u32, u32, u32, u32)> = BTreeMap::new();
    for y in 0..seg.height {
        for x in 0..seg.width {
            let label = seg.label_at(x, y);
            if label == 0 {
                continue;
            }
            boxes
                .entry(label)
                .and_modify(|(x0, y0, x1, y1)| {
                    *x0 = (*x0).min(x);
                    *y0 = (*y0).min(y);
                    *x1 = (*x1).max(x);
                    *y1 = (*y1).max(y);
                })
                .or_insert((x, y, x, y));
        }
    }

    let mut annotated = image.clone();
    for (&label, &(x0, y0, x1, y1)) in &boxes {
        let Some(contour) = largest_label_contour(&seg, label, (x0, y0, x1, y1)) else {
            continue;
        };
        if let Some(circle) = min_enclosing_circle(&contour.points) {
            annotate::draw_circle(
                &mut annotated,
                (circle.x as i32, circle.y as i32),
                circle.radius as i32,
                annotate::GREEN,
                SHAPE_THICKNESS,
            );
            draw_numbered(&mut annotated, (circle.x, circle.y), label as usize);
        }
    }

    CountResult {
        image: annotated,
        count: boxes.len(),
    }
}

/// Largest external contour of one label, in full-image coordinates.
fn largest_label_contour(
    seg: &watershed::Segmentation,
    label: u32,
    (x0, y0, x1, y1): (u32, u32, u32, u32),
) -> Option<Contour> {
    let (w, h) = (x1 - x0 + 1, y1 - y0 + 1);
    let crop = GrayImage::from_fn(w, h, |x, y| {
        Luma([if seg.label_at(x0 + x, y0 + y) == label { 255 } else { 0 }])
    });
    let best = external_contours(&crop).contours.into_iter().max_by(|a, b| {
        polygon_area(&a.points)
            .total_cmp(&polygon_area(&b.points))
            .then(a.points.len().cmp(&b.points.len()))
    })?;
    let (dx, dy) = (x0 as i32, y0 as i32);
    Contour::new(best.points.iter().map(|&(x, y)| (x + dx, y + dy)).collect())
}

/// Count with default settings.
pub fn count_kernels(image: &RgbImage, method: CountMethod) -> CountResult {
    KernelCounter::default().count(image, method)
}

/// Count with a method named at runtime. The name is checked before any
/// image processing happens.
pub fn count_kernels_by_name(image: &RgbImage, method: &str) -> Result<CountResult> {
    let method = CountMethod::from_str(method)?;
    Ok(count_kernels(image, method))
}
