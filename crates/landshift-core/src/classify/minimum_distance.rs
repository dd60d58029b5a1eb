use std::collections::BTreeMap;

use crate::error::{LandshiftError, Result};
use crate::sampling::TrainingSet;

use super::Classifier;

/// Mean feature vector of one class.
#[derive(Clone, Debug, PartialEq)]
pub struct ClassSignature {
    pub class: u8,
    pub mean: Vec<f64>,
}

/// Minimum distance classifier.
///
/// Assigns each feature vector to the class with the nearest centroid
/// (Euclidean). Does not account for class variance.
#[derive(Clone, Debug)]
pub struct MinimumDistance {
    signatures: Vec<ClassSignature>,
}

impl MinimumDistance {
    pub fn fit(set: &TrainingSet) -> Result<Self> {
        if set.is_empty() {
            return Err(LandshiftError::EmptyTrainingSet);
        }
        let width = set.feature_names.len();
        let mut sums: BTreeMap<u8, (Vec<f64>, usize)> = BTreeMap::new();
        for sample in &set.samples {
            let (sum, count) = sums
                .entry(sample.class)
                .or_insert_with(|| (vec![0.0; width], 0));
            for (acc, &v) in sum.iter_mut().zip(&sample.features) {
                *acc += v as f64;
            }
            *count += 1;
        }

        let signatures = sums
            .into_iter()
            .map(|(class, (sum, count))| ClassSignature {
                class,
                mean: sum.into_iter().map(|s| s / count as f64).collect(),
            })
            .collect();
        Ok(Self { signatures })
    }

    /// Class centroids, ascending by class code.
    pub fn signatures(&self) -> &[ClassSignature] {
        &self.signatures
    }
}

impl Classifier for MinimumDistance {
    fn name(&self) -> &str {
        "Minimum Distance"
    }

    fn predict(&self, features: &[f32]) -> u8 {
        let mut best_dist = f64::INFINITY;
        let mut best_class = 0;
        for sig in &self.signatures {
            let dist: f64 = sig
                .mean
                .iter()
                .zip(features)
                .map(|(&m, &v)| {
                    let d = v as f64 - m;
                    d * d
                })
                .sum();
            if dist < best_dist {
                best_dist = dist;
                best_class = sig.class;
            }
        }
        best_class
    }
}
