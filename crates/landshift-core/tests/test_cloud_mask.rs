#[allow(dead_code)]
mod common;

use landshift_core::error::LandshiftError;
use landshift_core::mask::{apply_mask, cloud_mask, mask_clouds, CloudMaskParams};

use common::make_image;

fn mask_image(probability: f32, qa: f32, scl: f32) -> landshift_core::raster::RasterImage {
    make_image(
        4,
        4,
        &[
            ("B4", 1500.0),
            ("MSK_CLDPRB", probability),
            ("QA60", qa),
            ("SCL", scl),
        ],
    )
}

// ---------------------------------------------------------------------------
// Per-pixel predicates
// ---------------------------------------------------------------------------

#[test]
fn test_clear_pixel_passes() {
    let params = CloudMaskParams::default();
    assert!(params.is_clear(5.0, 0.0, 4.0));
}

#[test]
fn test_probability_at_threshold_is_cloudy() {
    let params = CloudMaskParams::default();
    assert!(!params.is_clear(10.0, 0.0, 4.0));
    assert!(params.is_clear(9.99, 0.0, 4.0));
}

#[test]
fn test_cloud_bit_masks_pixel() {
    let params = CloudMaskParams::default();
    assert!(!params.is_clear(0.0, (1 << 10) as f32, 4.0));
}

#[test]
fn test_cirrus_bit_masks_pixel() {
    let params = CloudMaskParams::default();
    assert!(!params.is_clear(0.0, (1 << 11) as f32, 4.0));
}

#[test]
fn test_unrelated_qa_bits_are_ignored() {
    let params = CloudMaskParams::default();
    assert!(params.is_clear(0.0, 1.0, 4.0));
}

#[test]
fn test_scene_class_allow_set() {
    let params = CloudMaskParams::default();
    for scl in [4.0, 5.0, 6.0, 7.0] {
        assert!(params.is_clear(0.0, 0.0, scl), "SCL {scl} should be clear");
    }
    // Cloud shadow, medium/high cloud probability, snow.
    for scl in [3.0, 8.0, 9.0, 11.0] {
        assert!(!params.is_clear(0.0, 0.0, scl), "SCL {scl} should be masked");
    }
}

#[test]
fn test_nan_in_any_mask_band_masks_pixel() {
    let params = CloudMaskParams::default();
    assert!(!params.is_clear(f32::NAN, 0.0, 4.0));
    assert!(!params.is_clear(0.0, f32::NAN, 4.0));
    assert!(!params.is_clear(0.0, 0.0, f32::NAN));
}

#[test]
fn test_mask_is_and_of_three_predicates() {
    let params = CloudMaskParams::default();
    for p in [0.0f32, 50.0] {
        for qa in [0.0f32, 1024.0] {
            for scl in [4.0f32, 9.0] {
                let expected = params.passes_probability(p)
                    && params.passes_qa(qa)
                    && params.passes_scene_class(scl);
                assert_eq!(params.is_clear(p, qa, scl), expected);
            }
        }
    }
}

#[test]
fn test_custom_threshold() {
    let params = CloudMaskParams {
        probability_threshold: 20.0,
        ..CloudMaskParams::default()
    };
    assert!(params.is_clear(15.0, 0.0, 5.0));
}

// ---------------------------------------------------------------------------
// Whole-image masking
// ---------------------------------------------------------------------------

#[test]
fn test_cloud_mask_keeps_grid() {
    let image = mask_image(0.0, 0.0, 4.0);
    let mask = cloud_mask(&image, &CloudMaskParams::default()).unwrap();
    assert_eq!(mask.dim(), (4, 4));
    assert!(mask.iter().all(|&v| v));
}

#[test]
fn test_fully_masked_image_is_valid_output() {
    let image = mask_image(80.0, 0.0, 4.0);
    let masked = mask_clouds(&image, &CloudMaskParams::default()).unwrap();
    assert_eq!(masked.dim(), (4, 4));
    assert!(masked.band("B4").unwrap().iter().all(|v| v.is_nan()));
}

#[test]
fn test_apply_mask_voids_only_invalid_pixels() {
    let image = mask_image(0.0, 0.0, 4.0);
    let mut mask = cloud_mask(&image, &CloudMaskParams::default()).unwrap();
    mask[[1, 2]] = false;
    let masked = apply_mask(&image, &mask).unwrap();
    let b4 = masked.band("B4").unwrap();
    assert!(b4[[1, 2]].is_nan());
    assert_eq!(b4[[0, 0]], 1500.0);
    assert_eq!(masked.band_names(), image.band_names());
}

#[test]
fn test_missing_mask_band_is_reported() {
    let image = common::make_image(4, 4, &[("B4", 1.0), ("QA60", 0.0), ("SCL", 4.0)]);
    let err = cloud_mask(&image, &CloudMaskParams::default()).unwrap_err();
    match err {
        LandshiftError::MissingBand { band } => assert_eq!(band, "MSK_CLDPRB"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_apply_mask_dimension_mismatch() {
    let image = mask_image(0.0, 0.0, 4.0);
    let mask = ndarray::Array2::from_elem((3, 3), true);
    assert!(matches!(
        apply_mask(&image, &mask),
        Err(LandshiftError::DimensionMismatch { .. })
    ));
}
