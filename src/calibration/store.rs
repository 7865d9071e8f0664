use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use serde::{Deserialize, Serialize};

use super::CalibrationModel;
use crate::error::{Error, Result};

pub const MODEL_FILE: &str = "kernel_prediction_model.json";

/// On-disk layout of a trained model.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelFile {
    feature_dim: usize,
    weights: Vec<f64>,
    bias: f64,
    learning_rate: f64,
    epochs: usize,
}

impl From<&CalibrationModel> for ModelFile {
    fn from(model: &CalibrationModel) -> Self {
        Self {
            feature_dim: model.feature_dim(),
            weights: model.weights().to_vec(),
            bias: model.bias(),
            learning_rate: model.learning_rate(),
            epochs: model.epochs(),
        }
    }
}

impl ModelFile {
    fn into_model(self, path: &Path) -> Result<CalibrationModel> {
        let invalid = |reason: String| Error::InvalidModel {
            path: path.to_path_buf(),
            reason,
        };
        if self.feature_dim != self.weights.len() {
            return Err(invalid(format!(
                "featureDim is {} but {} weights are stored",
                self.feature_dim,
                self.weights.len()
            )));
        }
        if !self.bias.is_finite() || self.weights.iter().any(|w| !w.is_finite()) {
            return Err(invalid("non-finite weight".into()));
        }
        CalibrationModel::from_parts(self.weights, self.bias, self.learning_rate, self.epochs)
            .map_err(|e| invalid(e.to_string()))
    }
}

pub fn save_model<P: AsRef<Path>>(path: P, model: &CalibrationModel) -> Result<()> {
    let json = serde_json::to_string_pretty(&ModelFile::from(model))?;
    fs::write(path, json)?;
    Ok(())
}

pub fn load_model<P: AsRef<Path>>(path: P) -> Result<CalibrationModel> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    let file: ModelFile = serde_json::from_str(&text).map_err(|e| Error::InvalidModel {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    file.into_model(path)
}

/// Numbered model directories under one root: `<root>/1/`, `<root>/2/`, ...
#[derive(Debug, Clone)]
pub struct ModelStore {
    root: PathBuf,
}

impl ModelStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn indices(&self) -> Result<Vec<u32>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let mut indices = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if let Some(n) = entry.file_name().to_str().and_then(|s| s.parse().ok()) {
                indices.push(n);
            }
        }
        indices.sort_unstable();
        Ok(indices)
    }

    /// Write the model to a fresh numbered directory and return its file.
    pub fn save_next(&self, model: &CalibrationModel) -> Result<PathBuf> {
        let next = self.indices()?.last().map_or(1, |n| n + 1);
        let dir = self.root.join(next.to_string());
        fs::create_dir_all(&dir)?;
        let path = dir.join(MODEL_FILE);
        save_model(&path, model)?;
        info!("Model saved to {}", path.display());
        Ok(path)
    }

    /// Model file of the highest-numbered directory, if any.
    pub fn latest_path(&self) -> Result<Option<PathBuf>> {
        Ok(self
            .indices()?
            .last()
            .map(|n| self.root.join(n.to_string()).join(MODEL_FILE)))
    }

    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<CalibrationModel> {
        load_model(path)
    }

    pub fn load_latest(&self) -> Result<CalibrationModel> {
        let path = self.latest_path()?.ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no trained model under {}", self.root.display()),
            )
        })?;
        load_model(path)
    }
}
