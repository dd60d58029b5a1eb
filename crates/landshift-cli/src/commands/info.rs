use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Args;
use landshift_core::archive::{DirectoryArchive, SceneFilter};
use landshift_core::pipeline::config::DEFAULT_COLLECTION;

#[derive(Args)]
pub struct InfoArgs {
    /// Archive root directory
    pub archive: PathBuf,

    /// Scene collection
    #[arg(long, default_value = DEFAULT_COLLECTION)]
    pub collection: String,

    /// First acquisition date to list (YYYY-MM-DD)
    #[arg(long)]
    pub from: Option<NaiveDate>,

    /// List scenes acquired before this date (YYYY-MM-DD)
    #[arg(long)]
    pub to: Option<NaiveDate>,

    /// Only list scenes with a cloudy pixel percentage below this value
    #[arg(long)]
    pub max_cloud: Option<f32>,
}

pub fn run(args: &InfoArgs) -> Result<()> {
    let archive = DirectoryArchive::open(&args.archive)?;
    let scenes = archive
        .list(&args.collection)
        .with_context(|| format!("Failed to list collection '{}'", args.collection))?;
    let filter = args.max_cloud.map(|max_cloud_fraction| SceneFilter { max_cloud_fraction });

    let selected: Vec<_> = scenes
        .iter()
        .filter(|s| args.from.is_none_or(|from| s.date >= from))
        .filter(|s| args.to.is_none_or(|to| s.date < to))
        .filter(|s| filter.as_ref().is_none_or(|f| f.accepts(s)))
        .collect();

    println!("Archive:     {}", archive.root().display());
    println!("Collection:  {}", args.collection);
    println!("Scenes:      {} of {}", selected.len(), scenes.len());
    if let (Some(first), Some(last)) = (selected.first(), selected.last()) {
        println!("Dates:       {} .. {}", first.date, last.date);
    }
    println!();
    for scene in selected {
        println!(
            "  {}  {:>6.2}%  {}",
            scene.date, scene.cloud_fraction, scene.id
        );
    }

    Ok(())
}
