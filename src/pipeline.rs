use image::RgbImage;
use log::{info, warn};
use rayon::prelude::*;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::detection::{ImageFeatures, KernelPipeline};
use crate::error::{Error, Result};
use crate::models::FeatureRecord;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Token {
    Text(String),
    // digits without leading zeros; longer is larger, then lexical
    Number(usize, String),
}

/// Alternating text and digit runs, text first, text lower-cased.
fn natural_key(s: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut text = String::new();
    let mut chars = s.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_ascii_digit() {
            tokens.push(Token::Text(std::mem::take(&mut text).to_lowercase()));
            let mut digits = String::new();
            while let Some(&d) = chars.peek().filter(|d| d.is_ascii_digit()) {
                digits.push(d);
                chars.next();
            }
            let trimmed = digits.trim_start_matches('0').to_string();
            tokens.push(Token::Number(trimmed.len(), trimmed));
        } else {
            text.push(c);
            chars.next();
        }
    }
    tokens.push(Token::Text(text.to_lowercase()));
    tokens
}

/// Numeric-aware ordering: `2-b.JPG` sorts before `10-a.JPG`.
///
/// Names with equal keys (`01-a` and `1-a`) fall back to plain byte order
/// so the ordering stays total.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    natural_key(a).cmp(&natural_key(b)).then_with(|| a.cmp(b))
}

pub fn natural_sort<S: AsRef<str>>(names: &mut [S]) {
    names.sort_by(|a, b| natural_cmp(a.as_ref(), b.as_ref()));
}

/// Whether a file name carries a recognized photograph extension.
pub fn is_supported_image(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("jpg"))
}

/// Leading corn ear number of a file name, e.g. 12 for `12-batch1 copy.JPG`.
pub fn ear_number(name: &str) -> Result<u32> {
    let digits: String = name.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits
        .parse()
        .map_err(|_| Error::InvalidIdentifier(name.to_string()))
}

/// Where per-stage inspection images go.
#[derive(Clone, Debug)]
pub struct ExportConfig {
    pub output_dir: PathBuf,
}

impl ExportConfig {
    /// Creates the directory if it does not exist yet.
    pub fn new(output_dir: impl Into<PathBuf>) -> Result<Self> {
        let output_dir = output_dir.into();
        std::fs::create_dir_all(&output_dir)?;
        Ok(Self { output_dir })
    }

    pub fn artifact_path(&self, stage: &str, name: &str) -> PathBuf {
        self.output_dir.join(format!("{stage}_{name}"))
    }

    /// Writes `mask_`, `contours_` and `<method>_` prefixed copies.
    pub fn save(&self, name: &str, features: &ImageFeatures) -> Result<()> {
        let stages = [
            ("mask", &features.masked),
            ("contours", &features.contoured),
            (features.method.name(), &features.counted),
        ];
        for (stage, image) in stages {
            let path = self.artifact_path(stage, name);
            image
                .save(&path)
                .map_err(|source| Error::Export { path: path.clone(), source })?;
            info!("  Export: saved {}", path.display());
        }
        Ok(())
    }
}

/// An image the batch could not use, and why.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedImage {
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// One record per usable image, in natural order of file name.
    pub records: Vec<FeatureRecord>,
    pub skipped: Vec<SkippedImage>,
}

/// Runs the kernel pipeline over a batch of photographs.
#[derive(Debug, Clone, Default)]
pub struct BatchProcessor {
    pub pipeline: KernelPipeline,
    pub export: Option<ExportConfig>,
}

impl BatchProcessor {
    pub fn new(pipeline: KernelPipeline) -> Self {
        Self {
            pipeline,
            export: None,
        }
    }

    pub fn with_export(mut self, export: ExportConfig) -> Self {
        self.export = Some(export);
        self
    }

    /// Process named images, loading each through `load`.
    ///
    /// Images are processed in parallel. Records come back in natural
    /// order. Unsupported names, names without a leading ear number,
    /// unreadable images and images without contours are skipped; any
    /// other failure aborts the batch.
    pub fn process_names<I, S, F>(&self, names: I, load: F) -> Result<BatchReport>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&str) -> Result<RgbImage> + Sync,
    {
        let mut report = BatchReport::default();
        let mut seen = HashSet::new();
        let mut accepted = Vec::new();

        for name in names.into_iter().map(Into::into) {
            if !is_supported_image(&name) {
                warn!("{} is not a supported image format", name);
                report.skipped.push(SkippedImage {
                    reason: Error::UnsupportedImage(name.clone()).to_string(),
                    name,
                });
                continue;
            }
            if let Err(e) = ear_number(&name) {
                warn!("Skipping {}: {}", name, e);
                report.skipped.push(SkippedImage {
                    name,
                    reason: e.to_string(),
                });
                continue;
            }
            if !seen.insert(name.clone()) {
                return Err(Error::DuplicateIdentifier(name));
            }
            accepted.push(name);
        }
        natural_sort(&mut accepted);

        let results: Vec<(String, Result<FeatureRecord>)> = accepted
            .into_par_iter()
            .map(|name| {
                let result = self.process_one(&name, &load);
                (name, result)
            })
            .collect();

        for (name, result) in results {
            match result {
                Ok(record) => report.records.push(record),
                Err(e) if e.is_recoverable() => {
                    warn!("Skipping {}: {}", name, e);
                    report.skipped.push(SkippedImage {
                        name,
                        reason: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }
        Ok(report)
    }

    fn process_one<F>(&self, name: &str, load: &F) -> Result<FeatureRecord>
    where
        F: Fn(&str) -> Result<RgbImage>,
    {
        let image = load(name)?;
        info!("Counting image {}", name);
        let features = self.pipeline.process(&image)?;
        info!("Visible kernels counted in {}: {}", name, features.visible_count);
        if let Some(export) = &self.export {
            export.save(name, &features)?;
        }
        Ok(FeatureRecord::new(name, features.visible_count, features.avg_ratio))
    }

    /// Process every photograph in a directory.
    pub fn process_dir<P: AsRef<Path>>(&self, dir: P) -> Result<BatchReport> {
        let dir = dir.as_ref();
        let mut names = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        self.process_names(names, |name| Ok(image::open(dir.join(name))?.to_rgb8()))
    }
}
