pub mod annotate;
pub mod circles;
pub mod contours;
pub mod counting;
pub mod mask;
pub mod preprocessing;
pub mod watershed;

use image::RgbImage;
use log::debug;

use crate::config::Config;
use crate::error::Result;
use contours::ContourExtractor;
use counting::{CountMethod, KernelCounter};
use mask::ColorSegmenter;

/// Everything the pipeline learns about one photograph.
#[derive(Debug, Clone)]
pub struct ImageFeatures {
    pub masked: RgbImage,
    pub contoured: RgbImage,
    pub counted: RgbImage,
    pub method: CountMethod,
    pub visible_count: usize,
    pub contour_count: usize,
    pub avg_ratio: f64,
}

/// Per-image orchestrator: mask, outline, then count.
#[derive(Debug, Clone, Default)]
pub struct KernelPipeline {
    pub segmenter: ColorSegmenter,
    pub extractor: ContourExtractor,
    pub counter: KernelCounter,
    pub method: CountMethod,
}

impl KernelPipeline {
    pub fn new(method: CountMethod) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    pub fn from_config(config: &Config, method: CountMethod) -> Self {
        Self {
            segmenter: ColorSegmenter::new(config.mask.clone()),
            extractor: ContourExtractor::new(config.contours.clone()),
            counter: KernelCounter::new(config.counter.clone()),
            method,
        }
    }

    /// Run the three stages on one image.
    ///
    /// The counter sees the outlined image, as the outlines darken the gaps
    /// between neighboring kernels before the Otsu threshold. Fails with
    /// `EmptyContourSet` when nothing kernel-colored is left after masking.
    pub fn process(&self, image: &RgbImage) -> Result<ImageFeatures> {
        debug!("Masking target color...");
        let masked = self.segmenter.apply(image);

        debug!("Finding contours...");
        let contoured = self.extractor.extract(&masked);
        let avg_ratio = contoured.avg_width_height_ratio()?;
        let contour_count = contoured.contours.len();

        debug!("Counting kernels ({})...", self.method);
        let counted = self.counter.count(&contoured.image, self.method);

        Ok(ImageFeatures {
            masked,
            contoured: contoured.image,
            counted: counted.image,
            method: self.method,
            visible_count: counted.count,
            contour_count,
            avg_ratio,
        })
    }
}
