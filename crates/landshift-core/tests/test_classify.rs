#[allow(dead_code)]
mod common;

use ndarray::Array2;

use landshift_core::classify::{
    classify, train, validate_training_set, Classifier, ClassifierMethod, MinimumDistance,
    RandomForest, RandomForestParams,
};
use landshift_core::consts::CLASS_NODATA;
use landshift_core::error::LandshiftError;
use landshift_core::geometry::LabelGeometry;
use landshift_core::raster::{Band, RasterImage};
use landshift_core::sampling::{LabeledSample, TrainingSet};

use common::{classes, grid_transform, BARREN, BUILT_UP, FOREST};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Class centres in (ndvi, ndbi) feature space.
fn centre(class: u8) -> [f32; 2] {
    match class {
        FOREST => [0.8, -0.4],
        BARREN => [0.1, 0.2],
        _ => [0.0, 0.5],
    }
}

/// `per_class` jittered samples of each class in `classes`.
fn training_set(classes: &[u8], per_class: usize) -> TrainingSet {
    let mut set = TrainingSet::new(vec!["NDVI".into(), "NDBI".into()]);
    for &class in classes {
        let [a, b] = centre(class);
        for i in 0..per_class {
            let jitter = (i as f32 - per_class as f32 / 2.0) * 0.005;
            set.push(LabeledSample {
                class,
                features: vec![a + jitter, b - jitter],
                geometry: LabelGeometry::Point([i as f64, 0.0]),
            })
            .unwrap();
        }
    }
    set
}

fn seeded_forest(seed: u64) -> ClassifierMethod {
    ClassifierMethod::RandomForest(RandomForestParams {
        trees: 25,
        seed: Some(seed),
        bag_fraction: 1.0,
        ..RandomForestParams::default()
    })
}

/// 2x3 image whose columns hold the three class centres; (1, 2) is no-data.
fn feature_image() -> RasterImage {
    let pick = |c: usize, i: usize| centre([FOREST, BARREN, BUILT_UP][c])[i];
    let ndvi = Array2::from_shape_fn((2, 3), |(_, c)| pick(c, 0));
    let mut ndbi = Array2::from_shape_fn((2, 3), |(_, c)| pick(c, 1));
    ndbi[[1, 2]] = f32::NAN;
    RasterImage::from_bands(
        vec![Band::new("NDVI", ndvi), Band::new("NDBI", ndbi)],
        grid_transform(2),
    )
    .unwrap()
}

// ---------------------------------------------------------------------------
// Training preconditions
// ---------------------------------------------------------------------------

#[test]
fn test_missing_class_fails_with_its_name() {
    let set = training_set(&[FOREST, BARREN], 5);
    match train(&set, &classes(), &seeded_forest(1)) {
        Err(LandshiftError::EmptyTrainingClass { class }) => assert_eq!(class, "Built-up"),
        other => panic!("expected EmptyTrainingClass, got {other:?}"),
    }
}

#[test]
fn test_empty_training_set() {
    let set = TrainingSet::new(vec!["NDVI".into()]);
    assert!(matches!(
        validate_training_set(&set, &classes()),
        Err(LandshiftError::EmptyTrainingSet)
    ));
}

#[test]
fn test_push_rejects_wrong_width() {
    let mut set = TrainingSet::new(vec!["NDVI".into(), "NDBI".into()]);
    let err = set.push(LabeledSample {
        class: 1,
        features: vec![0.5],
        geometry: LabelGeometry::Point([0.0, 0.0]),
    });
    assert!(matches!(err, Err(LandshiftError::InvalidConfig(_))));
}

#[test]
fn test_unconfigured_classes_are_ignored() {
    let set = training_set(&[FOREST, BARREN, BUILT_UP, 7], 5);
    let model = train(&set, &classes(), &seeded_forest(3)).unwrap();
    assert_eq!(model.classes(), &[FOREST, BARREN, BUILT_UP]);
}

// ---------------------------------------------------------------------------
// Random forest
// ---------------------------------------------------------------------------

#[test]
fn test_random_forest_separates_classes() {
    let set = training_set(&[FOREST, BARREN, BUILT_UP], 8);
    let model = train(&set, &classes(), &seeded_forest(42)).unwrap();
    assert_eq!(model.predict(&centre(FOREST)), FOREST);
    assert_eq!(model.predict(&centre(BARREN)), BARREN);
    assert_eq!(model.predict(&centre(BUILT_UP)), BUILT_UP);
}

#[test]
fn test_seeded_forest_is_deterministic() {
    let set = training_set(&[FOREST, BARREN, BUILT_UP], 8);
    let params = RandomForestParams {
        trees: 15,
        seed: Some(7),
        ..RandomForestParams::default()
    };
    let a = RandomForest::fit(&set, &params).unwrap();
    let b = RandomForest::fit(&set, &params).unwrap();
    assert_eq!(a.seed(), 7);
    for i in 0..50 {
        let x = [i as f32 / 50.0, 0.5 - i as f32 / 50.0];
        assert_eq!(a.predict(&x), b.predict(&x));
    }
}

#[test]
fn test_unseeded_forest_records_its_seed() {
    let set = training_set(&[FOREST, BARREN], 4);
    let params = RandomForestParams {
        trees: 3,
        ..RandomForestParams::default()
    };
    let a = RandomForest::fit(&set, &params).unwrap();
    let replay = RandomForest::fit(
        &set,
        &RandomForestParams {
            seed: Some(a.seed()),
            ..params
        },
    )
    .unwrap();
    assert_eq!(replay.tree_count(), 3);
    for i in 0..20 {
        let x = [i as f32 / 20.0, 0.0];
        assert_eq!(a.predict(&x), replay.predict(&x));
    }
}

#[test]
fn test_random_forest_rejects_zero_trees() {
    let set = training_set(&[FOREST], 3);
    let params = RandomForestParams {
        trees: 0,
        ..RandomForestParams::default()
    };
    assert!(matches!(
        RandomForest::fit(&set, &params),
        Err(LandshiftError::InvalidConfig(_))
    ));
}

#[test]
fn test_single_class_forest_predicts_that_class() {
    let set = training_set(&[BARREN], 4);
    let model = RandomForest::fit(&set, &RandomForestParams::default()).unwrap();
    assert_eq!(model.predict(&[0.9, -0.9]), BARREN);
}

// ---------------------------------------------------------------------------
// Minimum distance
// ---------------------------------------------------------------------------

#[test]
fn test_minimum_distance_nearest_centroid() {
    let set = training_set(&[FOREST, BARREN, BUILT_UP], 4);
    let model = MinimumDistance::fit(&set).unwrap();
    assert_eq!(model.signatures().len(), 3);
    assert_eq!(model.predict(&[0.7, -0.3]), FOREST);
    assert_eq!(model.predict(&[0.05, 0.45]), BUILT_UP);
}

#[test]
fn test_method_display() {
    assert_eq!(
        format!("{}", ClassifierMethod::default()),
        "Random Forest (100 trees)"
    );
    assert_eq!(
        format!("{}", ClassifierMethod::MinimumDistance),
        "Minimum Distance"
    );
}

// ---------------------------------------------------------------------------
// classify
// ---------------------------------------------------------------------------

#[test]
fn test_classify_image_and_nodata() {
    let set = training_set(&[FOREST, BARREN, BUILT_UP], 8);
    let model = train(&set, &classes(), &ClassifierMethod::MinimumDistance).unwrap();
    let classified = classify(&model, &feature_image()).unwrap();
    assert_eq!(classified.dim(), (2, 3));
    assert_eq!(classified.data[[0, 0]], FOREST);
    assert_eq!(classified.data[[0, 1]], BARREN);
    assert_eq!(classified.data[[0, 2]], BUILT_UP);
    assert_eq!(classified.data[[1, 2]], CLASS_NODATA);
    assert_eq!(classified.class_at(1, 2), None);
    assert_eq!(classified.classified_pixel_count(), 5);
}

#[test]
fn test_classify_missing_feature_band() {
    let set = training_set(&[FOREST, BARREN, BUILT_UP], 4);
    let model = train(&set, &classes(), &ClassifierMethod::MinimumDistance).unwrap();
    let image = common::make_image(2, 2, &[("NDVI", 0.5)]);
    match classify(&model, &image) {
        Err(LandshiftError::MissingBand { band }) => assert_eq!(band, "NDBI"),
        other => panic!("expected MissingBand, got {other:?}"),
    }
}
