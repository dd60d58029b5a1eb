pub mod minimum_distance;
pub mod mode_filter;
pub mod random_forest;

use ndarray::Array2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::consts::{CLASS_NODATA, PARALLEL_PIXEL_THRESHOLD};
use crate::error::{LandshiftError, Result};
use crate::raster::{ClassifiedImage, LandClass, RasterImage};
use crate::sampling::TrainingSet;

pub use minimum_distance::MinimumDistance;
pub use mode_filter::{mode_filter, ModeFilterParams};
pub use random_forest::{RandomForest, RandomForestParams};

/// A fitted model mapping a feature vector to a class code.
pub trait Classifier: Send + Sync {
    fn name(&self) -> &str;

    /// Predict the class of one feature vector (no `NaN` entries).
    fn predict(&self, features: &[f32]) -> u8;
}

/// Supervised classification algorithm.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ClassifierMethod {
    /// Bagged CART trees with majority vote.
    RandomForest(RandomForestParams),
    /// Nearest class centroid in feature space.
    MinimumDistance,
}

impl Default for ClassifierMethod {
    fn default() -> Self {
        Self::RandomForest(RandomForestParams::default())
    }
}

impl std::fmt::Display for ClassifierMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RandomForest(p) => write!(f, "Random Forest ({} trees)", p.trees),
            Self::MinimumDistance => write!(f, "Minimum Distance"),
        }
    }
}

/// A trained model plus the feature layout it expects.
pub struct TrainedClassifier {
    model: Box<dyn Classifier>,
    feature_names: Vec<String>,
    classes: Vec<u8>,
}

impl std::fmt::Debug for TrainedClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrainedClassifier")
            .field("model", &self.model.name())
            .field("feature_names", &self.feature_names)
            .field("classes", &self.classes)
            .finish()
    }
}

impl TrainedClassifier {
    pub fn name(&self) -> &str {
        self.model.name()
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Class codes the model was trained on, ascending.
    pub fn classes(&self) -> &[u8] {
        &self.classes
    }

    pub fn predict(&self, features: &[f32]) -> u8 {
        self.model.predict(features)
    }
}

/// Check that every requested class has at least one sample.
pub fn validate_training_set(set: &TrainingSet, classes: &[LandClass]) -> Result<()> {
    if set.is_empty() {
        return Err(LandshiftError::EmptyTrainingSet);
    }
    if set.feature_names.is_empty() {
        return Err(LandshiftError::InvalidConfig(
            "training set has no feature bands".into(),
        ));
    }
    let counts = set.class_counts();
    for class in classes {
        if counts.get(&class.code).copied().unwrap_or(0) == 0 {
            return Err(LandshiftError::EmptyTrainingClass {
                class: class.name.clone(),
            });
        }
    }
    Ok(())
}

/// Train a classifier on `set` for exactly the requested `classes`.
///
/// Samples labelled with a code outside `classes` are ignored. Training
/// fails with `EmptyTrainingClass` if any requested class has no sample.
pub fn train(
    set: &TrainingSet,
    classes: &[LandClass],
    method: &ClassifierMethod,
) -> Result<TrainedClassifier> {
    validate_training_set(set, classes)?;

    let mut codes: Vec<u8> = classes.iter().map(|c| c.code).collect();
    codes.sort_unstable();
    codes.dedup();

    let ignored = set
        .samples
        .iter()
        .filter(|s| !codes.contains(&s.class))
        .count();
    let filtered;
    let set = if ignored > 0 {
        warn!(ignored, "Ignoring samples of unconfigured classes");
        filtered = TrainingSet {
            feature_names: set.feature_names.clone(),
            samples: set
                .samples
                .iter()
                .filter(|s| codes.contains(&s.class))
                .cloned()
                .collect(),
        };
        &filtered
    } else {
        set
    };

    let model: Box<dyn Classifier> = match method {
        ClassifierMethod::RandomForest(params) => Box::new(RandomForest::fit(set, params)?),
        ClassifierMethod::MinimumDistance => Box::new(MinimumDistance::fit(set)?),
    };
    info!(
        method = %method,
        samples = set.len(),
        features = set.feature_names.len(),
        classes = codes.len(),
        "Classifier trained"
    );

    Ok(TrainedClassifier {
        model,
        feature_names: set.feature_names.clone(),
        classes: codes,
    })
}

/// Classify every pixel of `image` using the model's feature bands.
///
/// Pixels with any no-data feature are left as [`CLASS_NODATA`].
pub fn classify(classifier: &TrainedClassifier, image: &RasterImage) -> Result<ClassifiedImage> {
    let bands = classifier
        .feature_names()
        .iter()
        .map(|name| image.band(name))
        .collect::<Result<Vec<_>>>()?;
    let (h, w) = image.dim();

    let classify_row = |row: usize| -> Vec<u8> {
        let mut features = vec![0.0f32; bands.len()];
        let mut row_result = vec![CLASS_NODATA; w];
        for (col, out) in row_result.iter_mut().enumerate() {
            let mut valid = true;
            for (slot, band) in features.iter_mut().zip(&bands) {
                *slot = band[[row, col]];
                if slot.is_nan() {
                    valid = false;
                    break;
                }
            }
            if valid {
                *out = classifier.predict(&features);
            }
        }
        row_result
    };

    let rows: Vec<Vec<u8>> = if h * w >= PARALLEL_PIXEL_THRESHOLD {
        (0..h).into_par_iter().map(classify_row).collect()
    } else {
        (0..h).map(classify_row).collect()
    };
    let data = Array2::from_shape_vec((h, w), rows.into_iter().flatten().collect())
        .expect("grid size matches dimensions");

    let classified = ClassifiedImage::new(data, image.transform);
    info!(
        classified = classified.classified_pixel_count(),
        total = h * w,
        "Image classified"
    );
    Ok(classified)
}
