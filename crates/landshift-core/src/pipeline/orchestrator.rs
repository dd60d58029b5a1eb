use std::sync::Arc;

use tracing::{info, warn};

use crate::accuracy::{evaluate_periods, split_labels, ValidationSource};
use crate::archive::{DirectoryArchive, RasterArchive};
use crate::area::{class_areas, percent_change};
use crate::classify::{classify, mode_filter, train};
use crate::composite::{build_composite, CompositeRequest};
use crate::error::{LandshiftError, Result};
use crate::geometry::LabeledFeature;
use crate::indices::add_indices;
use crate::io::labels::load_labels;
use crate::io::report::{AnalysisReport, PeriodSummary};
use crate::raster::RasterImage;
use crate::sampling::{sample_labels, SamplingParams, TrainingSet};

use super::config::{AnalysisConfig, Period, TrainingPeriod};
use super::types::{AnalysisOutput, NoOpReporter, PipelineStage, ProgressReporter};

/// Query, mask and composite one period, then append the index bands.
///
/// Returns the composite and the number of scenes it was built from.
pub fn composite_period(
    config: &AnalysisConfig,
    archive: &dyn RasterArchive,
    period: Period,
) -> Result<(RasterImage, usize)> {
    let period_config = config.period(period);
    let sequence = archive.query(
        &config.collection,
        &period_config.dates,
        &config.region,
        &config.scenes,
    )?;
    info!(
        period = %period_config.name,
        dates = %period_config.dates,
        scenes = sequence.len(),
        archive = archive.name(),
        "Scenes queried"
    );

    let request = CompositeRequest {
        period: &period_config.name,
        dates: &period_config.dates,
        region: &config.region,
        filter: &config.scenes,
        cloud_mask: &config.cloud_mask,
    };
    let composite = build_composite(&sequence, &request, &config.composite)?;
    let indexed = add_indices(&composite, &config.indices.indices, &config.indices.bands)?;
    Ok((indexed, sequence.len()))
}

/// Split labels into training and validation sets per the validation source.
fn resolve_labels(
    source: &ValidationSource,
    labels: &[LabeledFeature],
    held_out: Option<&[LabeledFeature]>,
) -> Result<(Vec<LabeledFeature>, Vec<LabeledFeature>)> {
    match source {
        ValidationSource::TrainingLabels => Ok((labels.to_vec(), labels.to_vec())),
        ValidationSource::HeldOut { labels: path } => {
            let held_out = held_out.ok_or_else(|| {
                LandshiftError::InvalidConfig(format!(
                    "held-out labels {} were not supplied",
                    path.display()
                ))
            })?;
            Ok((labels.to_vec(), held_out.to_vec()))
        }
        ValidationSource::Split {
            test_fraction,
            seed,
        } => split_labels(labels, *test_fraction, *seed),
    }
}

/// Run the full analysis with a thread-safe progress reporter.
///
/// `held_out` supplies validation labels when the config asks for a
/// held-out set; it is ignored otherwise.
pub fn run_analysis_reported(
    config: &AnalysisConfig,
    archive: &dyn RasterArchive,
    labels: &[LabeledFeature],
    held_out: Option<&[LabeledFeature]>,
    reporter: Arc<dyn ProgressReporter>,
) -> Result<AnalysisOutput> {
    config.validate()?;
    let (train_labels, test_labels) = resolve_labels(&config.validation, labels, held_out)?;
    info!(
        name = %config.name,
        training_labels = train_labels.len(),
        validation_labels = test_labels.len(),
        validation = %config.validation,
        "Starting analysis"
    );

    // Composites
    reporter.begin_stage(PipelineStage::Compositing, Some(2));
    let (pre_composite, pre_scenes) = composite_period(config, archive, Period::Pre)?;
    reporter.advance(1);
    let (post_composite, post_scenes) = composite_period(config, archive, Period::Post)?;
    reporter.advance(2);
    reporter.finish_stage();

    // Sampling
    reporter.begin_stage(PipelineStage::Sampling, None);
    let sampling = SamplingParams {
        mode: config.sampling.mode,
        feature_bands: config.feature_bands(),
    };
    let sample = |image: &RasterImage| {
        sample_labels(image, &train_labels, &sampling, Some(&config.region))
    };
    let training: TrainingSet = match config.training_period {
        TrainingPeriod::Pre => sample(&pre_composite)?,
        TrainingPeriod::Post => sample(&post_composite)?,
        TrainingPeriod::Both => sample(&pre_composite)?.merge(sample(&post_composite)?)?,
    };
    reporter.finish_stage();

    // Training
    reporter.begin_stage(PipelineStage::Training, None);
    let classifier = train(&training, &config.classes, &config.classifier)?;
    reporter.finish_stage();

    // Classification
    reporter.begin_stage(PipelineStage::Classification, Some(2));
    let mut pre_classified = classify(&classifier, &pre_composite)?;
    reporter.advance(1);
    let mut post_classified = classify(&classifier, &post_composite)?;
    reporter.advance(2);
    reporter.finish_stage();

    // Smoothing
    if config.smoothing.pre.is_some() || config.smoothing.post.is_some() {
        reporter.begin_stage(PipelineStage::Smoothing, None);
        if let Some(params) = &config.smoothing.pre {
            pre_classified = mode_filter(&pre_classified, params);
        }
        if let Some(params) = &config.smoothing.post {
            post_classified = mode_filter(&post_classified, params);
        }
        reporter.finish_stage();
    }

    // Area
    reporter.begin_stage(PipelineStage::Area, None);
    let pre_areas = class_areas(
        &pre_classified,
        &config.classes,
        &config.region,
        config.pixel_area_m2,
    )?;
    let post_areas = class_areas(
        &post_classified,
        &config.classes,
        &config.region,
        config.pixel_area_m2,
    )?;
    let change = percent_change(&pre_areas, &post_areas)?;
    reporter.finish_stage();

    // Accuracy
    reporter.begin_stage(PipelineStage::Accuracy, None);
    if test_labels.is_empty() {
        warn!("No validation labels; accuracy is undefined");
    }
    let accuracy = evaluate_periods(
        &pre_classified,
        &post_classified,
        &test_labels,
        &config.classes,
        &config.validation,
    );
    reporter.finish_stage();

    let report = AnalysisReport {
        name: config.name.clone(),
        pre: PeriodSummary {
            name: config.pre.name.clone(),
            dates: config.pre.dates,
            scenes: pre_scenes,
        },
        post: PeriodSummary {
            name: config.post.name.clone(),
            dates: config.post.dates,
            scenes: post_scenes,
        },
        classifier: config.classifier.to_string(),
        validation: config.validation.to_string(),
        training_samples: training.len(),
        classes: config.classes.clone(),
        pre_areas,
        post_areas,
        change,
        accuracy,
    };
    info!(
        combined_accuracy = report.accuracy.combined,
        total_pre_ha = report.pre_areas.total_hectares(),
        total_post_ha = report.post_areas.total_hectares(),
        "Analysis complete"
    );

    Ok(AnalysisOutput {
        pre_composite,
        post_composite,
        pre_classified,
        post_classified,
        training,
        report,
    })
}

/// Run the full analysis without progress reporting.
pub fn run_analysis(
    config: &AnalysisConfig,
    archive: &dyn RasterArchive,
    labels: &[LabeledFeature],
    held_out: Option<&[LabeledFeature]>,
) -> Result<AnalysisOutput> {
    let reporter = Arc::new(NoOpReporter);
    run_analysis_reported(config, archive, labels, held_out, reporter)
}

/// Run the analysis with the archive and label files named in `config`.
pub fn run_configured(
    config: &AnalysisConfig,
    reporter: Arc<dyn ProgressReporter>,
) -> Result<AnalysisOutput> {
    reporter.begin_stage(PipelineStage::Querying, None);
    let archive = DirectoryArchive::open(&config.archive)?;
    let labels = load_labels(&config.labels)?;
    let held_out = match &config.validation {
        ValidationSource::HeldOut { labels } => Some(load_labels(labels)?),
        _ => None,
    };
    reporter.finish_stage();

    run_analysis_reported(config, &archive, &labels, held_out.as_deref(), reporter)
}
