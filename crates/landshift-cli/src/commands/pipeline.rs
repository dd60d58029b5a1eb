use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Args;
use landshift_core::classify::ClassifierMethod;
use landshift_core::io::{save_classified, write_csv, write_json};
use landshift_core::pipeline::{run_configured, AnalysisConfig, PipelineStage, ProgressReporter};

use super::{parse_bbox, PresetArg};
use crate::progress::BarReporter;
use crate::summary::{print_analysis_summary, print_change_table};

#[derive(Args)]
pub struct RunArgs {
    /// Analysis config file (TOML)
    #[arg(long, conflicts_with = "preset")]
    pub config: Option<PathBuf>,

    /// Study-site preset (needs --archive, --labels and --bbox)
    #[arg(long, value_enum)]
    pub preset: Option<PresetArg>,

    /// Archive root directory
    #[arg(long)]
    pub archive: Option<PathBuf>,

    /// Ground-truth labels (JSON)
    #[arg(long)]
    pub labels: Option<PathBuf>,

    /// Region as min_x,min_y,max_x,max_y in map units
    #[arg(long)]
    pub bbox: Option<String>,

    /// Random forest seed, for reproducible runs
    #[arg(long)]
    pub seed: Option<u64>,

    /// Output directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn run(args: &RunArgs) -> Result<()> {
    let config = build_config(args)?;
    print_analysis_summary(&config);

    std::fs::create_dir_all(&config.output)
        .with_context(|| format!("Failed to create {}", config.output.display()))?;

    let reporter = Arc::new(BarReporter::new());
    let output = run_configured(&config, reporter.clone())?;

    reporter.begin_stage(PipelineStage::Writing, Some(4));
    let out = &config.output;
    write_json(&output.report, &out.join("report.json"))?;
    reporter.advance(1);
    write_csv(&output.report.change, &out.join("report.csv"))?;
    reporter.advance(2);
    save_classified(&output.pre_classified, &out.join("pre_classified.tif"))?;
    reporter.advance(3);
    save_classified(&output.post_classified, &out.join("post_classified.tif"))?;
    reporter.advance(4);
    reporter.finish_stage();
    reporter.finish();

    print_change_table(&output.report);
    println!("\nOutput saved to {}", out.display());
    Ok(())
}

fn build_config(args: &RunArgs) -> Result<AnalysisConfig> {
    let mut config = if let Some(ref path) = args.config {
        AnalysisConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?
    } else if let Some(preset) = args.preset {
        let Some(ref bbox) = args.bbox else {
            bail!("--preset needs --bbox");
        };
        AnalysisConfig::preset(preset.into(), parse_bbox(bbox)?)
    } else {
        bail!("Either --config or --preset is required");
    };

    if let Some(ref archive) = args.archive {
        config.archive = archive.clone();
    }
    if let Some(ref labels) = args.labels {
        config.labels = labels.clone();
    }
    if let Some(ref bbox) = args.bbox {
        config.region = parse_bbox(bbox)?;
    }
    if let Some(ref output) = args.output {
        config.output = output.clone();
    }
    if let Some(seed) = args.seed {
        if let ClassifierMethod::RandomForest(ref mut params) = config.classifier {
            params.seed = Some(seed);
        }
    }
    config.validate().context("Invalid analysis config")?;
    Ok(config)
}
