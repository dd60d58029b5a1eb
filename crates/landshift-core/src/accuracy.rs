//! Confusion matrices and accuracy of classified images against labels.

use std::collections::BTreeMap;
use std::path::PathBuf;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{LandshiftError, Result};
use crate::geometry::LabeledFeature;
use crate::raster::{ClassifiedImage, LandClass};

/// Counts indexed `[actual][predicted]` over `classes`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub classes: Vec<u8>,
    pub counts: Vec<Vec<u64>>,
}

impl ConfusionMatrix {
    pub fn new(classes: Vec<u8>) -> Self {
        let n = classes.len();
        Self {
            classes,
            counts: vec![vec![0; n]; n],
        }
    }

    fn index(&self, code: u8) -> Option<usize> {
        self.classes.iter().position(|&c| c == code)
    }

    /// Count one sample. Returns false if either code is not in the matrix.
    pub fn record(&mut self, actual: u8, predicted: u8) -> bool {
        match (self.index(actual), self.index(predicted)) {
            (Some(a), Some(p)) => {
                self.counts[a][p] += 1;
                true
            }
            _ => false,
        }
    }

    pub fn count(&self, actual: u8, predicted: u8) -> u64 {
        match (self.index(actual), self.index(predicted)) {
            (Some(a), Some(p)) => self.counts[a][p],
            _ => 0,
        }
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().flatten().sum()
    }

    pub fn correct(&self) -> u64 {
        (0..self.classes.len()).map(|i| self.counts[i][i]).sum()
    }

    /// Diagonal over total; `None` without samples.
    pub fn overall_accuracy(&self) -> Option<f64> {
        let total = self.total();
        (total > 0).then(|| self.correct() as f64 / total as f64)
    }

    /// Correct over all samples actually of `code` (recall).
    pub fn producers_accuracy(&self, code: u8) -> Option<f64> {
        let i = self.index(code)?;
        let row: u64 = self.counts[i].iter().sum();
        (row > 0).then(|| self.counts[i][i] as f64 / row as f64)
    }

    /// Correct over all samples predicted as `code` (precision).
    pub fn consumers_accuracy(&self, code: u8) -> Option<f64> {
        let j = self.index(code)?;
        let col: u64 = self.counts.iter().map(|row| row[j]).sum();
        (col > 0).then(|| self.counts[j][j] as f64 / col as f64)
    }

    /// Cohen's kappa. `None` without samples or when chance agreement is 1.
    pub fn kappa(&self) -> Option<f64> {
        let total = self.total();
        if total == 0 {
            return None;
        }
        let n = total as f64;
        let observed = self.correct() as f64 / n;
        let expected: f64 = (0..self.classes.len())
            .map(|i| {
                let row: u64 = self.counts[i].iter().sum();
                let col: u64 = self.counts.iter().map(|r| r[i]).sum();
                (row as f64 / n) * (col as f64 / n)
            })
            .sum();
        if (1.0 - expected).abs() < f64::EPSILON {
            return None;
        }
        Some((observed - expected) / (1.0 - expected))
    }
}

/// Compare `classified` against ground truth at every label location.
///
/// Points test their containing pixel, polygons every pixel centre inside.
/// No-data pixels and labels of classes outside `classes` are skipped.
pub fn confusion_matrix(
    classified: &ClassifiedImage,
    labels: &[LabeledFeature],
    classes: &[LandClass],
) -> ConfusionMatrix {
    let mut codes: Vec<u8> = classes.iter().map(|c| c.code).collect();
    codes.sort_unstable();
    codes.dedup();
    let mut matrix = ConfusionMatrix::new(codes);

    let mut skipped = 0usize;
    for label in labels {
        for (row, col) in label.geometry.pixels(&classified.transform, classified.dim()) {
            match classified.class_at(row, col) {
                Some(predicted) => {
                    if !matrix.record(label.class, predicted) {
                        skipped += 1;
                    }
                }
                None => skipped += 1,
            }
        }
    }
    if skipped > 0 {
        debug!(skipped, "Validation pixels skipped");
    }
    matrix
}

/// Where validation labels come from.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum ValidationSource {
    /// Reuse the training labels. Accuracy is optimistic.
    #[default]
    TrainingLabels,
    /// A separate label file never used for training.
    HeldOut { labels: PathBuf },
    /// Per-class random split of the labels into train and test sets.
    Split { test_fraction: f64, seed: u64 },
}

impl ValidationSource {
    pub fn is_optimistic(&self) -> bool {
        matches!(self, Self::TrainingLabels)
    }
}

impl std::fmt::Display for ValidationSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TrainingLabels => write!(f, "Training Labels"),
            Self::HeldOut { labels } => write!(f, "Held Out ({})", labels.display()),
            Self::Split { test_fraction, .. } => {
                write!(f, "Split ({:.0}% test)", test_fraction * 100.0)
            }
        }
    }
}

/// Split labels per class into disjoint `(train, test)` sets.
///
/// Each class with at least two labels keeps at least one on each side.
/// The split depends only on `seed` and the label order.
pub fn split_labels(
    labels: &[LabeledFeature],
    test_fraction: f64,
    seed: u64,
) -> Result<(Vec<LabeledFeature>, Vec<LabeledFeature>)> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(LandshiftError::InvalidConfig(format!(
            "test fraction {test_fraction} is outside (0, 1)"
        )));
    }

    let mut by_class: BTreeMap<u8, Vec<&LabeledFeature>> = BTreeMap::new();
    for label in labels {
        by_class.entry(label.class).or_default().push(label);
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::new();
    let mut test = Vec::new();
    for (_, mut group) in by_class {
        group.shuffle(&mut rng);
        let n = group.len();
        let n_test = if n < 2 {
            0
        } else {
            ((n as f64 * test_fraction).round() as usize).clamp(1, n - 1)
        };
        test.extend(group[..n_test].iter().map(|&l| l.clone()));
        train.extend(group[n_test..].iter().map(|&l| l.clone()));
    }
    Ok((train, test))
}

/// Accuracy of one classified period.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PeriodAccuracy {
    pub period: String,
    pub matrix: ConfusionMatrix,
    pub overall: Option<f64>,
    pub kappa: Option<f64>,
}

impl PeriodAccuracy {
    pub fn evaluate(
        period: impl Into<String>,
        classified: &ClassifiedImage,
        labels: &[LabeledFeature],
        classes: &[LandClass],
    ) -> Self {
        let matrix = confusion_matrix(classified, labels, classes);
        Self {
            period: period.into(),
            overall: matrix.overall_accuracy(),
            kappa: matrix.kappa(),
            matrix,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AccuracyReport {
    pub pre: PeriodAccuracy,
    pub post: PeriodAccuracy,
    /// Mean of the two overall accuracies; `None` if either is undefined.
    pub combined: Option<f64>,
    /// Validation reused the training labels.
    pub validation_is_optimistic: bool,
}

/// Evaluate both periods against the same validation labels.
pub fn evaluate_periods(
    pre: &ClassifiedImage,
    post: &ClassifiedImage,
    labels: &[LabeledFeature],
    classes: &[LandClass],
    source: &ValidationSource,
) -> AccuracyReport {
    if source.is_optimistic() {
        warn!("Validating against training labels; accuracy is optimistic");
    }
    let pre = PeriodAccuracy::evaluate("pre", pre, labels, classes);
    let post = PeriodAccuracy::evaluate("post", post, labels, classes);
    let combined = match (pre.overall, post.overall) {
        (Some(a), Some(b)) => Some((a + b) / 2.0),
        _ => None,
    };
    info!(
        pre = pre.overall,
        post = post.overall,
        combined,
        samples = pre.matrix.total(),
        "Accuracy evaluated"
    );
    AccuracyReport {
        pre,
        post,
        combined,
        validation_is_optimistic: source.is_optimistic(),
    }
}
