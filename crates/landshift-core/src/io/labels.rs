use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use tracing::debug;

use crate::error::Result;
use crate::geometry::LabeledFeature;

/// Read ground-truth labels from a JSON array of
/// `{"class": 1, "geometry": {"type": "Point", "coordinates": [x, y]}}`.
pub fn load_labels(path: &Path) -> Result<Vec<LabeledFeature>> {
    let reader = BufReader::new(File::open(path)?);
    let labels: Vec<LabeledFeature> = serde_json::from_reader(reader)?;
    debug!(path = %path.display(), labels = labels.len(), "Labels loaded");
    Ok(labels)
}

pub fn save_labels(labels: &[LabeledFeature], path: &Path) -> Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, labels)?;
    Ok(())
}
