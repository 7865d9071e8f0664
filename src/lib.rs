pub mod calibration;
pub mod config;
pub mod detection;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod records;

pub use calibration::{
    CalibrationModel, FeatureSet, ModelStore, Trainer, TrainingDataset, build_training_set,
};
pub use config::Config;
pub use detection::contours::{ContourExtractor, find_contours};
pub use detection::counting::{CountMethod, KernelCounter, count_kernels, count_kernels_by_name};
pub use detection::mask::{ColorSegmenter, mask_target_color};
pub use detection::{ImageFeatures, KernelPipeline};
pub use error::{Error, ErrorKind, Result};
pub use models::{BoundingBox, Contour, ContourResult, ContourSet, CountResult, FeatureRecord};
pub use pipeline::{BatchProcessor, BatchReport, ExportConfig, SkippedImage, natural_cmp, natural_sort};
pub use records::GroundTruth;
