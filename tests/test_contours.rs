mod common;

use approx::assert_relative_eq;
use common::*;
use kernelcount::{ContourExtractor, Error, find_contours};

#[test]
fn one_contour_per_separate_blob() -> anyhow::Result<()> {
    let image = yellow_squares(3, 20, 30);
    let (_, contours, _) = find_contours(&image)?;
    assert_eq!(contours.len(), 3);
    Ok(())
}

#[test]
fn squares_have_unit_ratio() -> anyhow::Result<()> {
    let image = yellow_squares(2, 24, 40);
    let (_, _, ratio) = find_contours(&image)?;
    assert_relative_eq!(ratio, 1.0);
    Ok(())
}

#[test]
fn ratio_averages_over_contours() -> anyhow::Result<()> {
    // 40x20 and 20x40: ratios 2.0 and 0.5
    let image = yellow_rects(200, 100, &[(10, 10, 40, 20), (120, 30, 20, 40)]);
    let (_, contours, ratio) = find_contours(&image)?;
    assert_eq!(contours.len(), 2);
    assert_relative_eq!(ratio, 1.25);
    Ok(())
}

#[test]
fn outlines_are_drawn_in_red() {
    let image = yellow_rects(80, 80, &[(20, 20, 40, 40)]);
    let result = ContourExtractor::default().extract(&image);
    assert_eq!(result.image.dimensions(), image.dimensions());
    assert_eq!(result.image.get_pixel(20, 20).0, [255, 0, 0]);
    assert_eq!(*result.image.get_pixel(40, 40), KERNEL_YELLOW);
}

#[test]
fn no_contours_means_no_ratio() {
    let result = find_contours(&black_image(50, 50));
    assert!(matches!(result, Err(Error::EmptyContourSet)));
}

#[test]
fn kernels_on_the_frame_edge_are_found() -> anyhow::Result<()> {
    let placements = [
        (0, 30, 40, 40),
        (160, 30, 40, 40),
        (20, 0, 40, 40),
        (20, 60, 40, 40),
    ];
    for edge in placements {
        let image = yellow_rects(200, 100, &[edge, (100, 30, 40, 40)]);
        let (_, contours, ratio) = find_contours(&image)?;
        assert_eq!(contours.len(), 2, "square at {edge:?}");
        assert_relative_eq!(ratio, 1.0);
    }
    Ok(())
}
