use approx::assert_abs_diff_eq;
use kernelcount::records::GroundTruth;
use kernelcount::{
    CalibrationModel, Error, FeatureRecord, FeatureSet, ModelStore, Trainer, TrainingDataset,
    build_training_set,
};
use tempfile::TempDir;

fn line_dataset() -> TrainingDataset {
    let rows = (1..=50).map(|v| (vec![v as f64], 3.0 * v as f64 + 5.0));
    TrainingDataset::from_rows(rows).unwrap()
}

fn trainer() -> Trainer {
    Trainer {
        learning_rate: 2e-4,
        epochs: 5000,
        report_every: 0,
    }
}

#[test]
fn recovers_a_linear_relationship() -> anyhow::Result<()> {
    let model = trainer().fit(&line_dataset())?;
    assert_eq!(model.feature_dim(), 1);
    assert_abs_diff_eq!(model.weights()[0], 3.0, epsilon = 0.05);
    assert_abs_diff_eq!(model.bias(), 5.0, epsilon = 0.5);
    assert_abs_diff_eq!(model.predict(&[20.0])?, 65.0, epsilon = 0.5);
    Ok(())
}

#[test]
fn predicting_with_the_wrong_dimension_fails() -> anyhow::Result<()> {
    let model = trainer().fit(&line_dataset())?;
    assert!(matches!(
        model.predict(&[20.0, 0.8]),
        Err(Error::DimensionMismatch { expected: 1, actual: 2 })
    ));
    Ok(())
}

#[test]
fn training_needs_examples() {
    let empty = TrainingDataset::new(FeatureSet::CountOnly);
    assert!(matches!(trainer().fit(&empty), Err(Error::EmptyDataset)));
}

#[test]
fn join_aborts_on_missing_ground_truth() {
    let records = vec![
        FeatureRecord::new("1-a.JPG", 100, 0.8),
        FeatureRecord::new("4-a.JPG", 120, 0.9),
    ];
    let truth: GroundTruth = [(1, 400.0)].into_iter().collect();
    let result = build_training_set(&records, &truth, FeatureSet::CountAndRatio);
    assert!(matches!(
        result,
        Err(Error::MissingGroundTruth { ear: 4, ref image }) if image == "4-a.JPG"
    ));
}

#[test]
fn join_rejects_names_without_an_ear_number() {
    let records = vec![FeatureRecord::new("ear.JPG", 100, 0.8)];
    let truth: GroundTruth = [(1, 400.0)].into_iter().collect();
    assert!(matches!(
        build_training_set(&records, &truth, FeatureSet::CountOnly),
        Err(Error::InvalidIdentifier(_))
    ));
}

#[test]
fn join_follows_the_chosen_feature_set() -> anyhow::Result<()> {
    let records = vec![FeatureRecord::new("3-x.JPG", 150, 0.75)];
    let truth: GroundTruth = [(3, 520.0)].into_iter().collect();

    let count_only = TrainingDataset::join(&records, &truth, FeatureSet::CountOnly)?;
    let both = TrainingDataset::join(&records, &truth, FeatureSet::CountAndRatio)?;
    assert_eq!(count_only.examples().next(), Some((&[150.0][..], &520.0)));
    assert_eq!(both.examples().next(), Some((&[150.0, 0.75][..], &520.0)));
    Ok(())
}

#[test]
fn stored_model_predicts_like_the_trained_one() -> anyhow::Result<()> {
    let tmp = TempDir::new()?;
    let store = ModelStore::new(tmp.path().join("models"));
    let model = trainer().fit(&line_dataset())?;
    let path = store.save_next(&model)?;

    let loaded = store.load(&path)?;
    assert_eq!(loaded, model);
    assert_eq!(store.load_latest()?.predict_count(&[33.0])?, model.predict_count(&[33.0])?);
    Ok(())
}

#[test]
fn unsupported_dimensions_are_refused() {
    assert!(matches!(
        CalibrationModel::from_parts(vec![1.0, 2.0, 3.0], 0.0, 0.1, 1),
        Err(Error::UnsupportedFeatureDim(3))
    ));
}
