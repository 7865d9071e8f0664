use image::{GrayImage, RgbImage};
use log::debug;

use crate::config::MaskConfig;
use crate::detection::preprocessing;

/// Isolates kernel-yellow pixels.
#[derive(Debug, Clone, Default)]
pub struct ColorSegmenter {
    pub config: MaskConfig,
}

impl ColorSegmenter {
    pub fn new(config: MaskConfig) -> Self {
        Self { config }
    }

    /// Binary mask of the target hue band after highlight blur and erosion.
    pub fn mask(&self, image: &RgbImage) -> GrayImage {
        let hsv = preprocessing::rgb_to_hsv(image);
        // folds white specular highlights into the surrounding hue
        let blurred = preprocessing::apply_blur(&hsv, self.config.blur_sigma);
        let band = preprocessing::in_range(&blurred, self.config.lower_hsv, self.config.upper_hsv);
        let eroded = preprocessing::erode_rect(
            &band,
            self.config.erosion_width,
            self.config.erosion_height,
        );
        debug!(
            "Color mask kept {} of {} pixels",
            eroded.pixels().filter(|p| p[0] > 0).count(),
            eroded.width() as u64 * eroded.height() as u64
        );
        eroded
    }

    /// Original colors inside the mask, black everywhere else.
    pub fn apply(&self, image: &RgbImage) -> RgbImage {
        let mask = self.mask(image);
        preprocessing::apply_mask(image, &mask)
    }

    /// An absent image passes through as absent.
    pub fn apply_opt(&self, image: Option<&RgbImage>) -> Option<RgbImage> {
        image.map(|img| self.apply(img))
    }
}

/// Mask with the default yellow band.
pub fn mask_target_color(image: &RgbImage) -> RgbImage {
    ColorSegmenter::default().apply(image)
}
