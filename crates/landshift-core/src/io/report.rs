use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::accuracy::AccuracyReport;
use crate::archive::DateRange;
use crate::area::{AreaReport, ChangeReport};
use crate::error::Result;
use crate::raster::LandClass;

/// One compared period as it appears in the report.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PeriodSummary {
    pub name: String,
    pub dates: DateRange,
    /// Scenes that passed the date, cloud and region filters.
    pub scenes: usize,
}

/// Everything a run produces, as plain data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub name: String,
    pub pre: PeriodSummary,
    pub post: PeriodSummary,
    pub classifier: String,
    pub validation: String,
    pub training_samples: usize,
    pub classes: Vec<LandClass>,
    pub pre_areas: AreaReport,
    pub post_areas: AreaReport,
    pub change: ChangeReport,
    pub accuracy: AccuracyReport,
}

#[derive(Serialize)]
struct ChangeRow<'a> {
    class: &'a str,
    code: u8,
    pre_ha: f64,
    post_ha: f64,
    /// Empty when the change is undefined.
    change_pct: Option<f64>,
}

/// Write the full report as pretty-printed JSON.
pub fn write_json(report: &AnalysisReport, path: &Path) -> Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, report)?;
    Ok(())
}

/// Write the change table as CSV: `class,code,pre_ha,post_ha,change_pct`.
///
/// Percentages are rounded to two decimals; undefined changes are left empty.
pub fn write_csv(change: &ChangeReport, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for entry in &change.entries {
        writer.serialize(ChangeRow {
            class: &entry.name,
            code: entry.code,
            pre_ha: round2(entry.pre_hectares),
            post_ha: round2(entry.post_hectares),
            change_pct: entry.change.rounded(),
        })?;
    }
    writer.flush()?;
    Ok(())
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
