#[allow(dead_code)]
mod common;

use approx::assert_relative_eq;

use landshift_core::error::LandshiftError;
use landshift_core::indices::{
    add_indices, enhanced_vegetation_index, normalized_difference, IndexBands, SpectralIndex,
};

use common::make_image;

fn reflectance_image() -> landshift_core::raster::RasterImage {
    make_image(
        3,
        3,
        &[
            ("B2", 0.05),
            ("B3", 0.08),
            ("B4", 0.04),
            ("B8", 0.40),
            ("B11", 0.20),
        ],
    )
}

// ---------------------------------------------------------------------------
// Pixel formulas
// ---------------------------------------------------------------------------

#[test]
fn test_normalized_difference_value() {
    assert_relative_eq!(normalized_difference(0.4, 0.1), 0.6, epsilon = 1e-6);
}

#[test]
fn test_normalized_difference_zero_denominator_is_nodata() {
    assert!(normalized_difference(0.0, 0.0).is_nan());
    assert!(normalized_difference(0.2, -0.2).is_nan());
}

#[test]
fn test_normalized_difference_nan_input_is_nodata() {
    assert!(normalized_difference(f32::NAN, 0.2).is_nan());
}

#[test]
fn test_evi_value() {
    // 2.5 * (0.4 - 0.04) / (0.4 + 0.24 - 0.375 + 1)
    let expected = 2.5 * 0.36 / 1.265;
    assert_relative_eq!(
        enhanced_vegetation_index(0.4, 0.04, 0.05),
        expected,
        epsilon = 1e-5
    );
}

#[test]
fn test_evi_zero_denominator_is_nodata() {
    // 0.5 + 0 - 1.5 + 1 == 0
    assert!(enhanced_vegetation_index(0.5, 0.0, 0.2).is_nan());
}

// ---------------------------------------------------------------------------
// add_indices
// ---------------------------------------------------------------------------

#[test]
fn test_add_indices_appends_and_keeps_originals() {
    let image = reflectance_image();
    let out = add_indices(&image, &SpectralIndex::ALL, &IndexBands::default()).unwrap();
    assert_eq!(
        out.band_names(),
        vec!["B2", "B3", "B4", "B8", "B11", "NDVI", "EVI", "NDWI", "NDBI"]
    );
    assert_eq!(out.band("B8").unwrap(), image.band("B8").unwrap());
}

#[test]
fn test_add_indices_values() {
    let out = add_indices(
        &reflectance_image(),
        &SpectralIndex::ALL,
        &IndexBands::default(),
    )
    .unwrap();
    assert_relative_eq!(out.band("NDVI").unwrap()[[1, 1]], 0.36 / 0.44, epsilon = 1e-5);
    assert_relative_eq!(out.band("NDWI").unwrap()[[0, 2]], -0.32 / 0.48, epsilon = 1e-5);
    assert_relative_eq!(out.band("NDBI").unwrap()[[2, 0]], -0.20 / 0.60, epsilon = 1e-5);
}

#[test]
fn test_add_indices_is_pure() {
    let image = reflectance_image();
    let a = add_indices(&image, &[SpectralIndex::Ndvi], &IndexBands::default()).unwrap();
    let b = add_indices(&image, &[SpectralIndex::Ndvi], &IndexBands::default()).unwrap();
    assert_eq!(a.band("NDVI").unwrap(), b.band("NDVI").unwrap());
}

#[test]
fn test_add_indices_missing_band_fails_before_computing() {
    let image = make_image(2, 2, &[("B4", 0.1), ("B8", 0.3)]);
    let err = add_indices(&image, &SpectralIndex::ALL, &IndexBands::default()).unwrap_err();
    match err {
        LandshiftError::MissingBand { band } => assert_eq!(band, "B2"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_add_indices_custom_roles() {
    let image = make_image(2, 2, &[("red", 0.1), ("nir", 0.3)]);
    let roles = IndexBands {
        red: "red".into(),
        nir: "nir".into(),
        ..IndexBands::default()
    };
    let out = add_indices(&image, &[SpectralIndex::Ndvi], &roles).unwrap();
    assert_relative_eq!(out.band("NDVI").unwrap()[[0, 0]], 0.5, epsilon = 1e-6);
}

#[test]
fn test_index_display_and_band_names() {
    assert_eq!(format!("{}", SpectralIndex::Ndvi), "NDVI");
    assert_eq!(SpectralIndex::Ndbi.band_name(), "NDBI");
}
