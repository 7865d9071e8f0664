use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::calibration::FeatureSet;
use crate::error::{Error, Result};

/// Application configuration, read from a JSON file such as `config.json`.
///
/// Every field has a default, so `{}` is a valid config. The color band and
/// erosion constants were tuned against the original photography setup and
/// existing calibration data depends on them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Directory of corn ear photographs.
    pub corn_photo_dir: PathBuf,
    /// Directory that receives exported stage images.
    pub contour_photo_dir: PathBuf,
    pub mask: MaskConfig,
    pub contours: ContourConfig,
    pub counter: CounterConfig,
    pub training: TrainingConfig,
    pub paths: PathsConfig,
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let block = self.contours.block_size;
        if block < 3 || block % 2 == 0 {
            return Err(Error::InvalidConfig(format!(
                "contours.blockSize must be odd and at least 3, got {block}"
            )));
        }
        if self.counter.color_radius <= 0.0 {
            return Err(Error::InvalidConfig("counter.colorRadius must be positive".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct MaskConfig {
    /// Inclusive lower HSV bound, hue on the 0..180 scale.
    pub lower_hsv: [u8; 3],
    /// Inclusive upper HSV bound.
    pub upper_hsv: [u8; 3],
    pub blur_sigma: f32,
    pub erosion_width: u32,
    pub erosion_height: u32,
}

impl Default for MaskConfig {
    fn default() -> Self {
        Self {
            lower_hsv: [20, 100, 100],
            upper_hsv: [40, 255, 255],
            // sigma OpenCV derives for a 5x5 Gaussian kernel
            blur_sigma: 1.1,
            erosion_width: 4,
            erosion_height: 12,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ContourConfig {
    /// Side of the square neighborhood for the adaptive mean. Must be odd.
    pub block_size: u32,
    /// Constant subtracted from the local mean.
    pub offset: f32,
    pub line_width: u32,
}

impl Default for ContourConfig {
    fn default() -> Self {
        Self {
            block_size: 71,
            offset: 0.0,
            line_width: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct CounterConfig {
    /// Mean-shift window half-width. Work per refined pixel grows with its
    /// square.
    pub spatial_radius: u32,
    pub color_radius: f32,
    pub mean_shift_iterations: u32,
    /// Half-resolution levels smoothed before the full image. Each level
    /// restricts full-resolution work to pixels near color edges; 0 runs
    /// mean shift on every pixel, which is slow on large photographs.
    pub pyramid_levels: u32,
    pub min_peak_distance: u32,
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            spatial_radius: 21,
            color_radius: 51.0,
            mean_shift_iterations: 5,
            pyramid_levels: 1,
            min_peak_distance: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct TrainingConfig {
    pub learning_rate: f64,
    pub epochs: usize,
    /// Loss is reported every this many epochs. Zero disables reporting.
    pub report_every: usize,
    pub feature_set: FeatureSet,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.00001,
            epochs: 1000,
            report_every: 100,
            feature_set: FeatureSet::CountAndRatio,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PathsConfig {
    pub features_csv: PathBuf,
    pub ground_truth_csv: PathBuf,
    pub dataset_csv: PathBuf,
    pub models_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            features_csv: PathBuf::from("calculated_features.csv"),
            ground_truth_csv: PathBuf::from("csv/total_kernel_counts.csv"),
            dataset_csv: PathBuf::from("csv/dataset.csv"),
            models_dir: PathBuf::from("models"),
        }
    }
}
