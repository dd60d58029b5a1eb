pub mod config;
mod orchestrator;
mod types;

pub use config::{AnalysisConfig, Period, PeriodConfig, Preset, SmoothingConfig, TrainingPeriod};
pub use orchestrator::{
    composite_period, run_analysis, run_analysis_reported, run_configured,
};
pub use types::{AnalysisOutput, NoOpReporter, PipelineStage, ProgressReporter};
