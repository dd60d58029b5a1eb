use crate::io::AnalysisReport;
use crate::raster::{ClassifiedImage, RasterImage};
use crate::sampling::TrainingSet;

/// Pipeline processing stage, used for progress reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineStage {
    Querying,
    Compositing,
    Sampling,
    Training,
    Classification,
    Smoothing,
    Area,
    Accuracy,
    Writing,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Querying => write!(f, "Querying archive"),
            Self::Compositing => write!(f, "Masking and compositing"),
            Self::Sampling => write!(f, "Sampling labels"),
            Self::Training => write!(f, "Training classifier"),
            Self::Classification => write!(f, "Classifying"),
            Self::Smoothing => write!(f, "Smoothing"),
            Self::Area => write!(f, "Aggregating area"),
            Self::Accuracy => write!(f, "Evaluating accuracy"),
            Self::Writing => write!(f, "Writing output"),
        }
    }
}

/// Everything a pipeline run produces.
#[derive(Clone, Debug)]
pub struct AnalysisOutput {
    /// Composites with index bands appended.
    pub pre_composite: RasterImage,
    pub post_composite: RasterImage,
    pub pre_classified: ClassifiedImage,
    pub post_classified: ClassifiedImage,
    pub training: TrainingSet,
    pub report: AnalysisReport,
}

/// Thread-safe progress reporting for the pipeline.
///
/// Implementors can use this to drive progress bars, logging, or any other
/// UI feedback. All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    /// A new pipeline stage has started. `total_items` is the number of
    /// work items in this stage (e.g., period count), if known.
    fn begin_stage(&self, _stage: PipelineStage, _total_items: Option<usize>) {}

    /// One work item within the current stage has completed.
    fn advance(&self, _items_done: usize) {}

    /// The current stage is finished.
    fn finish_stage(&self) {}
}

/// No-op progress reporter, used when `run_analysis` delegates.
pub struct NoOpReporter;
impl ProgressReporter for NoOpReporter {}
