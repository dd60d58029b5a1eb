#[allow(dead_code)]
mod common;

use std::sync::{Arc, Mutex};

use approx::assert_relative_eq;

use landshift_core::accuracy::ValidationSource;
use landshift_core::archive::{write_scene, InMemoryArchive};
use landshift_core::area::PercentChange;
use landshift_core::classify::{ClassifierMethod, ModeFilterParams, RandomForestParams};
use landshift_core::error::LandshiftError;
use landshift_core::geometry::LabeledFeature;
use landshift_core::io::{save_labels, write_json, AnalysisReport};
use landshift_core::pipeline::{
    composite_period, run_analysis, run_analysis_reported, run_configured, AnalysisConfig,
    NoOpReporter, Period, PeriodConfig, PipelineStage, ProgressReporter, TrainingPeriod,
};
use landshift_core::raster::Scene;

use common::*;

const SIZE: usize = 12;

// ---------------------------------------------------------------------------
// Fixture
// ---------------------------------------------------------------------------

/// Three clear-ish scenes before the event and three after. Before, columns
/// 0..4 are forest, 4..8 barren and 8..12 built-up. The slide turns column 3
/// into barren land.
fn scenes() -> Vec<Scene> {
    let mut pre = vec![
        landscape_scene("pre-1", date(2020, 2, 1), SIZE, SIZE, stripes(4, 8)),
        landscape_scene("pre-2", date(2020, 3, 1), SIZE, SIZE, stripes(4, 8)),
        landscape_scene("pre-3", date(2020, 4, 1), SIZE, SIZE, stripes(4, 8)),
    ];
    add_cloud(&mut pre[1], 5, 5);
    add_cloud(&mut pre[2], 0, 11);

    let mut post = vec![
        landscape_scene("post-1", date(2020, 9, 1), SIZE, SIZE, stripes(3, 8)),
        landscape_scene("post-2", date(2020, 10, 1), SIZE, SIZE, stripes(3, 8)),
        landscape_scene("post-3", date(2020, 11, 1), SIZE, SIZE, stripes(3, 8)),
    ];
    add_cloud(&mut post[0], 7, 2);

    pre.extend(post);
    pre
}

fn archive() -> InMemoryArchive {
    let config = config();
    let mut archive = InMemoryArchive::new();
    for scene in scenes() {
        archive.insert(config.collection.clone(), scene);
    }
    archive
}

fn labels() -> Vec<LabeledFeature> {
    let mut labels = column_labels(SIZE, 1, FOREST);
    labels.extend(column_labels(SIZE, 6, BARREN));
    labels.extend(column_labels(SIZE, 10, BUILT_UP));
    labels
}

fn config() -> AnalysisConfig {
    AnalysisConfig {
        name: "synthetic".into(),
        region: grid_region(SIZE, SIZE),
        classifier: ClassifierMethod::RandomForest(RandomForestParams {
            trees: 25,
            seed: Some(2020),
            bag_fraction: 1.0,
            ..RandomForestParams::default()
        }),
        classes: classes(),
        ..AnalysisConfig::default()
    }
}

#[derive(Default)]
struct RecordingReporter {
    stages: Mutex<Vec<PipelineStage>>,
}

impl ProgressReporter for RecordingReporter {
    fn begin_stage(&self, stage: PipelineStage, _total_items: Option<usize>) {
        self.stages.lock().unwrap().push(stage);
    }
}

fn assert_landslide_report(report: &AnalysisReport) {
    assert_eq!(report.pre.scenes, 3);
    assert_eq!(report.post.scenes, 3);
    assert_eq!(report.training_samples, 18);

    // 48 pixels of 100 m² per class before the slide.
    for name in ["Forest", "Barren", "Built-up"] {
        assert_relative_eq!(report.pre_areas.hectares(name).unwrap(), 0.48, epsilon = 1e-9);
    }
    assert_relative_eq!(report.post_areas.hectares("Forest").unwrap(), 0.36, epsilon = 1e-9);
    assert_relative_eq!(report.post_areas.hectares("Barren").unwrap(), 0.60, epsilon = 1e-9);
    assert_relative_eq!(report.post_areas.hectares("Built-up").unwrap(), 0.48, epsilon = 1e-9);

    assert_eq!(report.change.change("Forest").unwrap().rounded(), Some(-25.0));
    assert_eq!(report.change.change("Barren").unwrap().rounded(), Some(25.0));
    assert_eq!(report.change.change("Built-up").unwrap().rounded(), Some(0.0));

    assert_eq!(report.accuracy.pre.overall, Some(1.0));
    assert_eq!(report.accuracy.post.overall, Some(1.0));
    assert_eq!(report.accuracy.combined, Some(1.0));
}

// ---------------------------------------------------------------------------
// Full runs
// ---------------------------------------------------------------------------

#[test]
fn test_landslide_change_detected() {
    let output = run_analysis(&config(), &archive(), &labels(), None).unwrap();
    assert_landslide_report(&output.report);
    assert!(output.report.accuracy.validation_is_optimistic);

    // Every pixel in the region was classified.
    assert_eq!(output.pre_classified.classified_pixel_count(), SIZE * SIZE);
    assert_eq!(output.pre_classified.class_at(5, 3), Some(FOREST));
    assert_eq!(output.post_classified.class_at(5, 3), Some(BARREN));
    assert_eq!(output.post_classified.class_at(7, 2), Some(FOREST));

    assert!(output.pre_composite.has_band("NDVI"));
    assert_eq!(output.training.feature_names.len(), 14);
}

#[test]
fn test_stages_reported_in_order() {
    let reporter = Arc::new(RecordingReporter::default());
    run_analysis_reported(&config(), &archive(), &labels(), None, reporter.clone()).unwrap();
    let stages = reporter.stages.lock().unwrap().clone();
    assert_eq!(
        stages,
        vec![
            PipelineStage::Compositing,
            PipelineStage::Sampling,
            PipelineStage::Training,
            PipelineStage::Classification,
            PipelineStage::Area,
            PipelineStage::Accuracy,
        ]
    );
}

#[test]
fn test_smoothing_keeps_clean_stripes() {
    let mut config = config();
    config.smoothing.post = Some(ModeFilterParams::default());
    let reporter = Arc::new(RecordingReporter::default());
    let output = run_analysis_reported(&config, &archive(), &labels(), None, reporter.clone())
        .unwrap();
    assert!(reporter.stages.lock().unwrap().contains(&PipelineStage::Smoothing));
    assert_landslide_report(&output.report);
}

#[test]
fn test_training_on_both_periods() {
    let mut config = config();
    config.training_period = TrainingPeriod::Both;
    let output = run_analysis(&config, &archive(), &labels(), None).unwrap();
    assert_eq!(output.report.training_samples, 36);
    assert_eq!(output.report.accuracy.combined, Some(1.0));
}

#[test]
fn test_split_validation() {
    let mut config = config();
    config.validation = ValidationSource::Split {
        test_fraction: 0.5,
        seed: 11,
    };
    let output = run_analysis(&config, &archive(), &labels(), None).unwrap();
    // 6 labels per class: 3 train, 3 test.
    assert_eq!(output.report.training_samples, 9);
    assert_eq!(output.report.accuracy.pre.matrix.total(), 9);
    assert!(!output.report.accuracy.validation_is_optimistic);
}

#[test]
fn test_held_out_validation() {
    let mut config = config();
    config.validation = ValidationSource::HeldOut {
        labels: "holdout.json".into(),
    };
    let held_out = vec![
        LabeledFeature::point(FOREST, center(SIZE, 0, 0).0, center(SIZE, 0, 0).1),
        LabeledFeature::point(BARREN, center(SIZE, 4, 3).0, center(SIZE, 4, 3).1),
    ];

    let missing = run_analysis(&config, &archive(), &labels(), None);
    assert!(matches!(missing, Err(LandshiftError::InvalidConfig(_))));

    let output = run_analysis(&config, &archive(), &labels(), Some(&held_out)).unwrap();
    // Column 3 is forest before the slide and barren after.
    assert_eq!(output.report.accuracy.pre.overall, Some(0.5));
    assert_eq!(output.report.accuracy.post.overall, Some(1.0));
    assert_eq!(output.report.accuracy.combined, Some(0.75));
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[test]
fn test_empty_post_period_is_data_unavailable() {
    let mut config = config();
    config.post = PeriodConfig::new("aftermath", date(2021, 1, 1), date(2021, 6, 1));
    match run_analysis(&config, &archive(), &labels(), None) {
        Err(LandshiftError::DataUnavailable { period }) => assert_eq!(period, "aftermath"),
        other => panic!("expected DataUnavailable, got {:?}", other.map(|o| o.report)),
    }
}

#[test]
fn test_class_without_labels_fails() {
    let labels: Vec<LabeledFeature> = labels()
        .into_iter()
        .filter(|l| l.class != BUILT_UP)
        .collect();
    match run_analysis(&config(), &archive(), &labels, None) {
        Err(LandshiftError::EmptyTrainingClass { class }) => assert_eq!(class, "Built-up"),
        other => panic!("expected EmptyTrainingClass, got {:?}", other.map(|o| o.report)),
    }
}

#[test]
fn test_cloud_masked_pixel_uses_remaining_scenes() {
    let (composite, scenes) = composite_period(&config(), &archive(), Period::Pre).unwrap();
    assert_eq!(scenes, 3);
    let b2 = composite.band("B2").unwrap();
    assert_relative_eq!(b2[[5, 5]], 0.12, epsilon = 1e-6);
    assert_relative_eq!(b2[[0, 11]], 0.18, epsilon = 1e-6);
}

// ---------------------------------------------------------------------------
// On-disk run
// ---------------------------------------------------------------------------

#[test]
fn test_run_configured_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let archive_root = dir.path().join("archive");
    let mut config = config();
    for scene in scenes() {
        write_scene(
            &archive_root,
            &config.collection,
            &scene.image,
            &scene.metadata,
            1.0,
            None,
        )
        .unwrap();
    }
    let labels_path = dir.path().join("labels.json");
    save_labels(&labels(), &labels_path).unwrap();
    config.archive = archive_root;
    config.labels = labels_path;

    let output = run_configured(&config, Arc::new(NoOpReporter)).unwrap();
    assert_landslide_report(&output.report);

    let report_path = dir.path().join("report.json");
    write_json(&output.report, &report_path).unwrap();
    let text = std::fs::read_to_string(&report_path).unwrap();
    let parsed: AnalysisReport = serde_json::from_str(&text).unwrap();
    assert_eq!(parsed.name, "synthetic");
    assert_eq!(parsed.classes, output.report.classes);
    assert_eq!(parsed.accuracy.combined, Some(1.0));
    let forest = parsed.change.change("Forest").unwrap();
    assert!(matches!(forest, PercentChange::Finite(_)));
    assert_eq!(forest.rounded(), Some(-25.0));
}
