use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use kernelcount::calibration::FeatureSet;
use kernelcount::records;
use kernelcount::{
    BatchProcessor, Config, CountMethod, ExportConfig, GroundTruth, KernelPipeline, ModelStore,
    Trainer, build_training_set,
};

const DEFAULT_CONFIG: &str = "config.json";

#[derive(Parser)]
#[command(name = "kernelcount", version)]
#[command(about = "Count corn kernels in photographs and calibrate full-ear estimates")]
struct Cli {
    /// Path to a JSON config file (defaults to ./config.json when present)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Count visible kernels in every photograph and write the feature table
    Process {
        /// Counting strategy: watershed or contour
        #[arg(short, long, default_value = "contour")]
        method: CountMethod,

        /// Save mask, contour and count images for each photograph
        #[arg(long)]
        export: bool,

        /// Photograph directory (overrides cornPhotoDir)
        #[arg(long, value_name = "DIR")]
        photos: Option<PathBuf>,

        /// Feature table to write (overrides paths.featuresCsv)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Join the feature table with hand counts into a training dataset
    Dataset,
    /// Fit a calibration model and save it as the next numbered model
    Train,
    /// Estimate the full kernel count with the latest model
    Predict {
        /// Visible kernel count
        count: f64,
        /// Average width/height ratio (required by count-and-ratio models)
        ratio: Option<f64>,
    },
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to read config {}", path.display())),
        None if Path::new(DEFAULT_CONFIG).exists() => {
            Config::from_file(DEFAULT_CONFIG).context("Failed to read config.json")
        }
        None => Ok(Config::default()),
    }
}

fn process(
    config: &Config,
    method: CountMethod,
    export: bool,
    photos: Option<PathBuf>,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let photos = photos.unwrap_or_else(|| config.corn_photo_dir.clone());
    let output = output.unwrap_or_else(|| config.paths.features_csv.clone());

    let mut batch = BatchProcessor::new(KernelPipeline::from_config(config, method));
    if export {
        let export = ExportConfig::new(&config.contour_photo_dir).with_context(|| {
            format!("Failed to create {}", config.contour_photo_dir.display())
        })?;
        batch = batch.with_export(export);
    }

    let report = batch
        .process_dir(&photos)
        .with_context(|| format!("Failed to process photographs in {}", photos.display()))?;
    records::save_features(&output, &report.records)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!("Processed {} images with the {} method", report.records.len(), method);
    if !report.skipped.is_empty() {
        println!("Skipped {}:", report.skipped.len());
        for skipped in &report.skipped {
            println!("  {}: {}", skipped.name, skipped.reason);
        }
    }
    println!("Features written to {}", output.display());
    Ok(())
}

fn dataset(config: &Config) -> anyhow::Result<()> {
    let paths = &config.paths;
    let features = records::load_features(&paths.features_csv)
        .with_context(|| format!("Failed to read {}", paths.features_csv.display()))?;
    let truth = GroundTruth::load(&paths.ground_truth_csv)
        .with_context(|| format!("Failed to read {}", paths.ground_truth_csv.display()))?;

    let dataset = build_training_set(&features, &truth, config.training.feature_set)?;
    records::save_dataset(&paths.dataset_csv, &dataset)
        .with_context(|| format!("Failed to write {}", paths.dataset_csv.display()))?;
    println!("{} examples written to {}", dataset.len(), paths.dataset_csv.display());
    Ok(())
}

fn train(config: &Config) -> anyhow::Result<()> {
    let dataset = records::load_dataset(&config.paths.dataset_csv)
        .with_context(|| format!("Failed to read {}", config.paths.dataset_csv.display()))?;
    let model = Trainer::from_config(&config.training).fit(&dataset)?;
    let path = ModelStore::new(&config.paths.models_dir).save_next(&model)?;

    println!("Weights: {:?}", model.weights());
    println!("Bias: {}", model.bias());
    println!("Model saved to {}", path.display());
    Ok(())
}

fn predict(config: &Config, count: f64, ratio: Option<f64>) -> anyhow::Result<()> {
    let model = ModelStore::new(&config.paths.models_dir)
        .load_latest()
        .context("Failed to load the latest model")?;
    let features = match (model.feature_set(), ratio) {
        (FeatureSet::CountOnly, _) => vec![count],
        (FeatureSet::CountAndRatio, Some(ratio)) => vec![count, ratio],
        (FeatureSet::CountAndRatio, None) => bail!("this model also needs the width/height ratio"),
    };
    println!("Estimated kernel count: {}", model.predict_count(&features)?);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Process {
            method,
            export,
            photos,
            output,
        } => process(&config, method, export, photos, output),
        Command::Dataset => dataset(&config),
        Command::Train => train(&config),
        Command::Predict { count, ratio } => predict(&config, count, ratio),
    }
}
