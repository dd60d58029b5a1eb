use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use landshift_core::pipeline::AnalysisConfig;

use super::{parse_bbox, PresetArg};

#[derive(Args)]
pub struct ConfigArgs {
    /// Start from a study-site preset
    #[arg(long, value_enum)]
    pub preset: Option<PresetArg>,

    /// Region as min_x,min_y,max_x,max_y in map units
    #[arg(long)]
    pub bbox: Option<String>,

    /// Write config to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Print or save a default or preset AnalysisConfig as TOML.
pub fn run(args: &ConfigArgs) -> Result<()> {
    let mut config = AnalysisConfig::default();
    if let Some(bbox) = &args.bbox {
        config.region = parse_bbox(bbox)?;
    }
    if let Some(preset) = args.preset {
        config = AnalysisConfig::preset(preset.into(), config.region);
    }
    let toml_str = config.to_toml()?;

    if let Some(ref path) = args.output {
        std::fs::write(path, &toml_str)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        println!("Config saved to {}", path.display());
    } else {
        print!("{}", toml_str);
    }

    Ok(())
}
