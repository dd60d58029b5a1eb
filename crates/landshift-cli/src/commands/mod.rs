pub mod composite;
pub mod config;
pub mod info;
pub mod pipeline;

use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use landshift_core::geometry::Region;
use landshift_core::pipeline::{Period, Preset};

#[derive(Clone, Copy, ValueEnum)]
pub enum PresetArg {
    Idukki,
    Wayanad,
}

impl From<PresetArg> for Preset {
    fn from(value: PresetArg) -> Self {
        match value {
            PresetArg::Idukki => Preset::Idukki,
            PresetArg::Wayanad => Preset::Wayanad,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum PeriodArg {
    Pre,
    Post,
}

impl From<PeriodArg> for Period {
    fn from(value: PeriodArg) -> Self {
        match value {
            PeriodArg::Pre => Period::Pre,
            PeriodArg::Post => Period::Post,
        }
    }
}

/// Parse `min_x,min_y,max_x,max_y` into a rectangular region.
pub fn parse_bbox(text: &str) -> Result<Region> {
    let values: Vec<f64> = text
        .split(',')
        .map(|s| s.trim().parse::<f64>())
        .collect::<std::result::Result<_, _>>()
        .with_context(|| format!("Invalid bounding box '{text}'"))?;
    let [min_x, min_y, max_x, max_y] = values[..] else {
        bail!("Bounding box needs 4 values, got {}", values.len());
    };
    if min_x >= max_x || min_y >= max_y {
        bail!("Bounding box '{text}' is empty");
    }
    Ok(Region::rectangle(min_x, min_y, max_x, max_y))
}
