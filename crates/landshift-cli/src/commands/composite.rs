use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use landshift_core::archive::DirectoryArchive;
use landshift_core::io::save_composite;
use landshift_core::pipeline::{composite_period, AnalysisConfig, Period};
use landshift_core::raster::SceneMetadata;

use super::PeriodArg;

/// Collection the composite is written under, so the output directory is
/// itself a readable archive.
const COMPOSITE_COLLECTION: &str = "composites";

#[derive(Args)]
pub struct CompositeArgs {
    /// Analysis config file (TOML)
    #[arg(long)]
    pub config: PathBuf,

    /// Period to composite
    #[arg(long, value_enum, default_value = "pre")]
    pub period: PeriodArg,

    /// Output directory
    #[arg(short, long, default_value = "composite")]
    pub output: PathBuf,
}

pub fn run(args: &CompositeArgs) -> Result<()> {
    let config = AnalysisConfig::load(&args.config)
        .with_context(|| format!("Failed to load config {}", args.config.display()))?;
    let archive = DirectoryArchive::open(&config.archive)?;
    let period = Period::from(args.period);
    let period_config = config.period(period);

    let (composite, scenes) = composite_period(&config, &archive, period)?;
    // Index bands can be negative and do not survive 16-bit scaling.
    let reflectance = composite.select(&config.composite.bands)?;

    let metadata = SceneMetadata {
        id: format!("{}-{}", config.name, period),
        date: period_config.dates.start,
        cloud_fraction: 0.0,
    };
    let dir = save_composite(
        &reflectance,
        &args.output,
        COMPOSITE_COLLECTION,
        &metadata,
        config.composite.scale,
    )?;

    println!(
        "Composite of {} scene(s) for {} ({})",
        scenes, period_config.name, period_config.dates
    );
    println!(
        "  {} bands, {}x{} px",
        reflectance.bands().len(),
        reflectance.width(),
        reflectance.height()
    );
    println!("Saved to {}", dir.display());
    Ok(())
}
