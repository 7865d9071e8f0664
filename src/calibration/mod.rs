//! Linear calibration from visible-kernel features to a full kernel count.
//!
//! A [`Trainer`] fits weights by per-example gradient descent over a
//! [`TrainingDataset`]; the resulting [`CalibrationModel`] is immutable and
//! can be shared freely between predictors once `fit` returns.

pub mod store;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::config::TrainingConfig;
use crate::error::{Error, Result};
use crate::models::FeatureRecord;
use crate::records::GroundTruth;

pub use store::ModelStore;

/// Which record fields form the feature vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FeatureSet {
    CountOnly,
    #[default]
    CountAndRatio,
}

impl FeatureSet {
    pub fn dim(&self) -> usize {
        match self {
            FeatureSet::CountOnly => 1,
            FeatureSet::CountAndRatio => 2,
        }
    }

    pub fn from_dim(dim: usize) -> Result<Self> {
        match dim {
            1 => Ok(FeatureSet::CountOnly),
            2 => Ok(FeatureSet::CountAndRatio),
            other => Err(Error::UnsupportedFeatureDim(other)),
        }
    }

    pub fn vector(&self, record: &FeatureRecord) -> Vec<f64> {
        match self {
            FeatureSet::CountOnly => vec![record.visible_count as f64],
            FeatureSet::CountAndRatio => vec![record.visible_count as f64, record.avg_ratio],
        }
    }
}

/// Ordered (features, full count) examples of one fixed dimension.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingDataset {
    dim: usize,
    features: Vec<Vec<f64>>,
    targets: Vec<f64>,
}

impl TrainingDataset {
    pub fn new(feature_set: FeatureSet) -> Self {
        Self {
            dim: feature_set.dim(),
            ..Self::default()
        }
    }

    /// Build from raw rows; the first row fixes the dimension.
    pub fn from_rows(rows: impl IntoIterator<Item = (Vec<f64>, f64)>) -> Result<Self> {
        let mut rows = rows.into_iter().peekable();
        let Some((first, _)) = rows.peek() else {
            return Ok(Self::default());
        };
        let mut dataset = Self::new(FeatureSet::from_dim(first.len())?);
        for (features, target) in rows {
            dataset.push(features, target)?;
        }
        Ok(dataset)
    }

    /// Join feature records with ground truth by corn ear number.
    ///
    /// Every record must have a ground-truth row; a missing one aborts the
    /// whole join rather than training on a partial dataset.
    pub fn join(
        records: &[FeatureRecord],
        truth: &GroundTruth,
        feature_set: FeatureSet,
    ) -> Result<Self> {
        let mut dataset = Self::new(feature_set);
        for record in records {
            dataset.push_record(&truth.label(record)?, feature_set)?;
        }
        debug!("Joined {} records with ground truth", dataset.len());
        Ok(dataset)
    }

    pub fn push(&mut self, features: Vec<f64>, target: f64) -> Result<()> {
        if features.len() != self.dim {
            return Err(Error::DimensionMismatch {
                expected: self.dim,
                actual: features.len(),
            });
        }
        self.features.push(features);
        self.targets.push(target);
        Ok(())
    }

    /// Add a record already labelled with its full count.
    pub fn push_record(&mut self, record: &FeatureRecord, feature_set: FeatureSet) -> Result<()> {
        let Some(target) = record.full_count else {
            return Err(Error::MissingGroundTruth {
                ear: record.ear_number()?,
                image: record.image.clone(),
            });
        };
        self.push(feature_set.vector(record), target)
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn examples(&self) -> impl Iterator<Item = (&[f64], &f64)> {
        self.features.iter().map(Vec::as_slice).zip(self.targets.iter())
    }
}

pub fn build_training_set(
    records: &[FeatureRecord],
    truth: &GroundTruth,
    feature_set: FeatureSet,
) -> Result<TrainingDataset> {
    TrainingDataset::join(records, truth, feature_set)
}

fn dot(weights: &[f64], features: &[f64]) -> f64 {
    weights.iter().zip(features).map(|(w, x)| w * x).sum()
}

/// Trained weights and bias. Only produced by [`Trainer::fit`] or by
/// loading a validated model file, so every value is ready to predict.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationModel {
    weights: Vec<f64>,
    bias: f64,
    learning_rate: f64,
    epochs: usize,
}

impl CalibrationModel {
    /// Rebuild a trained model, e.g. after loading it from storage.
    pub fn from_parts(weights: Vec<f64>, bias: f64, learning_rate: f64, epochs: usize) -> Result<Self> {
        FeatureSet::from_dim(weights.len())?;
        Ok(Self {
            weights,
            bias,
            learning_rate,
            epochs,
        })
    }

    pub fn feature_dim(&self) -> usize {
        self.weights.len()
    }

    pub fn feature_set(&self) -> FeatureSet {
        // from_parts and fit both guarantee a dimension of 1 or 2
        if self.weights.len() == 1 {
            FeatureSet::CountOnly
        } else {
            FeatureSet::CountAndRatio
        }
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn bias(&self) -> f64 {
        self.bias
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    pub fn epochs(&self) -> usize {
        self.epochs
    }

    /// `dot(weights, features) + bias`.
    pub fn predict(&self, features: &[f64]) -> Result<f64> {
        if features.len() != self.weights.len() {
            return Err(Error::DimensionMismatch {
                expected: self.weights.len(),
                actual: features.len(),
            });
        }
        Ok(dot(&self.weights, features) + self.bias)
    }

    /// Predicted full count, truncated toward zero.
    pub fn predict_count(&self, features: &[f64]) -> Result<i64> {
        Ok(self.predict(features)?.trunc() as i64)
    }

    pub fn predict_record(&self, record: &FeatureRecord) -> Result<f64> {
        self.predict(&self.feature_set().vector(record))
    }
}

/// Per-example gradient descent on squared error.
#[derive(Debug, Clone, PartialEq)]
pub struct Trainer {
    pub learning_rate: f64,
    pub epochs: usize,
    /// Loss is reported every this many epochs; zero disables reporting.
    pub report_every: usize,
}

impl Default for Trainer {
    fn default() -> Self {
        Self::from_config(&TrainingConfig::default())
    }
}

impl Trainer {
    pub fn from_config(config: &TrainingConfig) -> Self {
        Self {
            learning_rate: config.learning_rate,
            epochs: config.epochs,
            report_every: config.report_every,
        }
    }

    pub fn fit(&self, dataset: &TrainingDataset) -> Result<CalibrationModel> {
        self.fit_with_monitor(dataset, |epoch, loss| {
            info!("Epoch {}: squared error {:.4}", epoch, loss);
        })
    }

    /// Train from zero weights, calling `monitor(epoch, loss)` with the
    /// summed squared error every `report_every` epochs.
    ///
    /// Examples are visited in dataset order, so identical inputs always
    /// give identical weights.
    pub fn fit_with_monitor<F>(&self, dataset: &TrainingDataset, mut monitor: F) -> Result<CalibrationModel>
    where
        F: FnMut(usize, f64),
    {
        if dataset.is_empty() {
            return Err(Error::EmptyDataset);
        }
        FeatureSet::from_dim(dataset.dim())?;

        let mut weights = vec![0.0; dataset.dim()];
        let mut bias = 0.0;
        let step = 2.0 * self.learning_rate;

        for epoch in 1..=self.epochs {
            for (x, &target) in dataset.examples() {
                let residual = dot(&weights, x) + bias - target;
                for (w, xi) in weights.iter_mut().zip(x) {
                    *w -= step * residual * xi;
                }
                bias -= step * residual;
            }

            if !bias.is_finite() || weights.iter().any(|w| !w.is_finite()) {
                return Err(Error::Diverged { epoch });
            }
            if self.report_every > 0 && epoch % self.report_every == 0 {
                let loss: f64 = dataset
                    .examples()
                    .map(|(x, &t)| (dot(&weights, x) + bias - t).powi(2))
                    .sum();
                monitor(epoch, loss);
            }
        }

        info!("Training finished: weights {:?}, bias {}", weights, bias);
        Ok(CalibrationModel {
            weights,
            bias,
            learning_rate: self.learning_rate,
            epochs: self.epochs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear_dataset() -> TrainingDataset {
        TrainingDataset::from_rows((1..=10).map(|v| (vec![v as f64], 2.0 * v as f64 + 1.0))).unwrap()
    }

    #[test]
    fn empty_dataset_is_rejected() {
        let dataset = TrainingDataset::new(FeatureSet::CountAndRatio);
        assert!(matches!(Trainer::default().fit(&dataset), Err(Error::EmptyDataset)));
    }

    #[test]
    fn rows_must_share_dimension() {
        let rows = vec![(vec![1.0, 0.5], 10.0), (vec![2.0], 12.0)];
        assert!(matches!(
            TrainingDataset::from_rows(rows),
            Err(Error::DimensionMismatch { expected: 2, actual: 1 })
        ));
        assert!(matches!(
            TrainingDataset::from_rows(vec![(vec![1.0, 2.0, 3.0], 1.0)]),
            Err(Error::UnsupportedFeatureDim(3))
        ));
    }

    #[test]
    fn training_is_deterministic() {
        let trainer = Trainer { learning_rate: 0.001, epochs: 50, report_every: 0 };
        let a = trainer.fit(&linear_dataset()).unwrap();
        let b = trainer.fit(&linear_dataset()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn loss_is_reported_on_schedule_and_falls() {
        let trainer = Trainer { learning_rate: 0.001, epochs: 300, report_every: 100 };
        let mut reports = Vec::new();
        trainer
            .fit_with_monitor(&linear_dataset(), |epoch, loss| reports.push((epoch, loss)))
            .unwrap();
        assert_eq!(reports.iter().map(|r| r.0).collect::<Vec<_>>(), vec![100, 200, 300]);
        assert!(reports[2].1 < reports[0].1);
    }

    #[test]
    fn oversized_steps_are_reported_as_divergence() {
        let trainer = Trainer { learning_rate: 1.0, epochs: 2000, report_every: 0 };
        assert!(matches!(trainer.fit(&linear_dataset()), Err(Error::Diverged { .. })));
    }

    #[test]
    fn unlabelled_records_cannot_be_pushed() {
        let mut dataset = TrainingDataset::new(FeatureSet::CountOnly);
        let record = FeatureRecord::new("5-a.JPG", 90, 0.7);
        assert!(matches!(
            dataset.push_record(&record, FeatureSet::CountOnly),
            Err(Error::MissingGroundTruth { ear: 5, .. })
        ));
        let labelled = FeatureRecord { full_count: Some(300.0), ..record };
        dataset.push_record(&labelled, FeatureSet::CountOnly).unwrap();
        assert_eq!(dataset.examples().next(), Some((&[90.0][..], &300.0)));
    }

    #[test]
    fn records_predict_with_the_model_feature_set() {
        let record = FeatureRecord::new("1-a.JPG", 100, 0.5);
        let both = CalibrationModel::from_parts(vec![2.0, 10.0], 1.0, 0.1, 1).unwrap();
        assert_eq!(both.predict_record(&record).unwrap(), 206.0);
        let count_only = CalibrationModel::from_parts(vec![3.0], 5.0, 0.1, 1).unwrap();
        assert_eq!(count_only.predict_record(&record).unwrap(), 305.0);
    }

    #[test]
    fn prediction_truncates_like_an_integer_cast() {
        let model = CalibrationModel::from_parts(vec![1.5], -0.2, 0.1, 1).unwrap();
        assert_eq!(model.predict_count(&[3.0]).unwrap(), 4);
        assert_eq!(model.predict_count(&[0.0]).unwrap(), 0);
    }
}
