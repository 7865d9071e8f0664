mod common;

use common::*;
use image::RgbImage;
use kernelcount::{BatchProcessor, Error, ExportConfig};
use tempfile::TempDir;

fn load_fixture(name: &str) -> kernelcount::Result<RgbImage> {
    match name {
        "1-c.JPG" => Ok(yellow_squares(1, 40, 40)),
        "2-b.JPG" => Ok(yellow_squares(2, 40, 40)),
        "10-a.JPG" => Ok(yellow_squares(3, 40, 40)),
        "3-dark.JPG" => Ok(black_image(80, 80)),
        other => Err(Error::UnsupportedImage(other.to_string())),
    }
}

fn batch() -> BatchProcessor {
    BatchProcessor::new(fast_pipeline(CountMethod::Contour))
}

#[test]
fn records_come_back_in_natural_order() -> anyhow::Result<()> {
    let names = ["10-a.JPG", "2-b.JPG", "1-c.JPG"];
    let report = batch().process_names(names, load_fixture)?;
    let images: Vec<&str> = report.records.iter().map(|r| r.image.as_str()).collect();
    assert_eq!(images, vec!["1-c.JPG", "2-b.JPG", "10-a.JPG"]);
    let counts: Vec<usize> = report.records.iter().map(|r| r.visible_count).collect();
    assert_eq!(counts, vec![1, 2, 3]);
    assert!(report.skipped.is_empty());
    Ok(())
}

#[test]
fn unusable_images_are_skipped_not_fatal() -> anyhow::Result<()> {
    let names = ["2-b.JPG", "notes.txt", "3-dark.JPG", "9-missing.JPG"];
    let report = batch().process_names(names, load_fixture)?;
    assert_eq!(report.records.len(), 1);
    assert_eq!(report.records[0].image, "2-b.JPG");

    let mut skipped: Vec<&str> = report.skipped.iter().map(|s| s.name.as_str()).collect();
    skipped.sort();
    assert_eq!(skipped, vec!["3-dark.JPG", "9-missing.JPG", "notes.txt"]);
    Ok(())
}

#[test]
fn duplicate_names_abort_the_batch() {
    let result = batch().process_names(["1-c.JPG", "1-c.JPG"], load_fixture);
    assert!(matches!(result, Err(Error::DuplicateIdentifier(name)) if name == "1-c.JPG"));
}

#[test]
fn resource_failures_abort_the_batch() {
    let result = batch().process_names(["1-c.JPG"], |_| {
        Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "locked").into())
    });
    assert!(matches!(result, Err(Error::Io(_))));
}

#[test]
fn export_writes_every_stage() -> anyhow::Result<()> {
    let tmp = TempDir::new()?;
    let out = tmp.path().join("contours");
    let processor = batch().with_export(ExportConfig::new(&out)?);
    processor.process_names(["1-c.JPG"], load_fixture)?;

    for prefix in ["mask", "contours", "contour"] {
        assert!(out.join(format!("{prefix}_1-c.JPG")).is_file(), "{prefix} image missing");
    }
    Ok(())
}

#[test]
fn directory_listing_filters_and_skips() -> anyhow::Result<()> {
    let tmp = TempDir::new()?;
    black_image(40, 40).save(tmp.path().join("1-a.JPG"))?;
    std::fs::write(tmp.path().join("readme.txt"), "not a photo")?;
    std::fs::create_dir(tmp.path().join("5-subdir.JPG"))?;

    let report = batch().process_dir(tmp.path())?;
    assert!(report.records.is_empty());
    let mut skipped: Vec<&str> = report.skipped.iter().map(|s| s.name.as_str()).collect();
    skipped.sort();
    assert_eq!(skipped, vec!["1-a.JPG", "readme.txt"]);
    Ok(())
}

#[test]
fn names_without_an_ear_number_are_skipped() -> anyhow::Result<()> {
    let report = batch().process_names(["ear-7.JPG", "2-b.JPG", "1-c.JPG"], |name| match name {
        "ear-7.JPG" => Ok(yellow_squares(1, 40, 40)),
        other => load_fixture(other),
    })?;
    let images: Vec<&str> = report.records.iter().map(|r| r.image.as_str()).collect();
    assert_eq!(images, vec!["1-c.JPG", "2-b.JPG"]);
    assert!(report.records.iter().all(|r| r.ear_number().is_ok()));

    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].name, "ear-7.JPG");
    assert!(report.skipped[0].reason.contains("no leading corn ear number"));
    Ok(())
}
