use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Axis-aligned bounding box. Width and height count pixels, so a single
/// pixel has a 1x1 box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn aspect_ratio(&self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

/// Boundary polygon of one connected foreground region.
#[derive(Debug, Clone, PartialEq)]
pub struct Contour {
    pub points: Vec<(i32, i32)>,
    pub bbox: BoundingBox,
}

impl Contour {
    /// Returns `None` for an empty point list.
    pub fn new(points: Vec<(i32, i32)>) -> Option<Self> {
        let (&(x0, y0), rest) = points.split_first()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (x0, y0, x0, y0);
        for &(x, y) in rest {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
        let bbox = BoundingBox {
            x: min_x,
            y: min_y,
            width: (max_x - min_x + 1) as u32,
            height: (max_y - min_y + 1) as u32,
        };
        Some(Self { points, bbox })
    }

    /// Centroid of the boundary points.
    pub fn centroid(&self) -> (f64, f64) {
        let n = self.points.len() as f64;
        let (sx, sy) = self
            .points
            .iter()
            .fold((0.0, 0.0), |(sx, sy), &(x, y)| (sx + x as f64, sy + y as f64));
        (sx / n, sy / n)
    }
}

/// All contours found in one thresholded image, in no particular order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContourSet {
    pub contours: Vec<Contour>,
}

impl ContourSet {
    pub fn len(&self) -> usize {
        self.contours.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contours.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Contour> {
        self.contours.iter()
    }

    /// Mean bounding-box width/height ratio. Fails on an empty set.
    pub fn avg_width_height_ratio(&self) -> Result<f64> {
        if self.contours.is_empty() {
            return Err(Error::EmptyContourSet);
        }
        let sum: f64 = self.contours.iter().map(|c| c.bbox.aspect_ratio()).sum();
        Ok(sum / self.contours.len() as f64)
    }
}

impl FromIterator<Contour> for ContourSet {
    fn from_iter<I: IntoIterator<Item = Contour>>(iter: I) -> Self {
        Self {
            contours: iter.into_iter().collect(),
        }
    }
}

/// Output of the contour extractor: the outlined image and the contours.
#[derive(Debug, Clone)]
pub struct ContourResult {
    pub image: RgbImage,
    pub contours: ContourSet,
}

impl ContourResult {
    pub fn avg_width_height_ratio(&self) -> Result<f64> {
        self.contours.avg_width_height_ratio()
    }
}

#[derive(Debug, Clone)]
pub struct CountResult {
    pub image: RgbImage,
    pub count: usize,
}

/// One row of the feature table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    /// Source file name, e.g. `12-batch1.JPG`.
    pub image: String,
    pub visible_count: usize,
    pub avg_ratio: f64,
    /// Hand-counted total, present only once joined with ground truth.
    pub full_count: Option<f64>,
}

impl FeatureRecord {
    pub fn new(image: impl Into<String>, visible_count: usize, avg_ratio: f64) -> Self {
        Self {
            image: image.into(),
            visible_count,
            avg_ratio,
            full_count: None,
        }
    }

    /// Leading number of the file name, the key shared with ground truth.
    pub fn ear_number(&self) -> Result<u32> {
        crate::pipeline::ear_number(&self.image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bbox_counts_pixels() {
        let c = Contour::new(vec![(2, 3), (6, 3), (6, 4), (2, 4)]).unwrap();
        assert_eq!(c.bbox, BoundingBox { x: 2, y: 3, width: 5, height: 2 });
        let single = Contour::new(vec![(7, 7)]).unwrap();
        assert_eq!((single.bbox.width, single.bbox.height), (1, 1));
        assert!(Contour::new(vec![]).is_none());
    }

    #[test]
    fn ratio_of_empty_set_is_an_error() {
        let set = ContourSet::default();
        assert!(matches!(set.avg_width_height_ratio(), Err(Error::EmptyContourSet)));
    }

    #[test]
    fn ratio_averages_boxes() {
        let wide = Contour::new(vec![(0, 0), (3, 0), (3, 1), (0, 1)]).unwrap();
        let tall = Contour::new(vec![(0, 0), (1, 0), (1, 3), (0, 3)]).unwrap();
        let set: ContourSet = [wide, tall].into_iter().collect();
        let ratio = set.avg_width_height_ratio().unwrap();
        assert!((ratio - (2.0 + 0.5) / 2.0).abs() < 1e-12);
    }
}
