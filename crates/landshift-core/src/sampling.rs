use std::collections::BTreeMap;

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{LandshiftError, Result};
use crate::geometry::{LabelGeometry, LabeledFeature, Region};
use crate::raster::RasterImage;

/// How polygon labels are turned into training rows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SamplingMode {
    /// One row per polygon: per-band mean of the valid pixels inside it.
    #[default]
    RegionMean,
    /// One row per fully valid pixel inside each polygon.
    EveryPixel,
}

impl std::fmt::Display for SamplingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RegionMean => write!(f, "Region Mean"),
            Self::EveryPixel => write!(f, "Every Pixel"),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingParams {
    pub mode: SamplingMode,
    /// Feature bands, in order. Empty means every band of the image.
    pub feature_bands: Vec<String>,
}

/// A ground-truth label with the band values sampled under it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LabeledSample {
    pub class: u8,
    pub features: Vec<f32>,
    pub geometry: LabelGeometry,
}

/// Training rows sharing one feature layout.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingSet {
    pub feature_names: Vec<String>,
    pub samples: Vec<LabeledSample>,
}

impl TrainingSet {
    pub fn new(feature_names: Vec<String>) -> Self {
        Self {
            feature_names,
            samples: Vec::new(),
        }
    }

    /// Add a sample; its feature vector must match the layout.
    pub fn push(&mut self, sample: LabeledSample) -> Result<()> {
        if sample.features.len() != self.feature_names.len() {
            return Err(LandshiftError::InvalidConfig(format!(
                "sample has {} features, training set expects {}",
                sample.features.len(),
                self.feature_names.len()
            )));
        }
        self.samples.push(sample);
        Ok(())
    }

    /// Append every sample of `other`, which must share the feature layout.
    pub fn merge(mut self, other: TrainingSet) -> Result<Self> {
        if self.feature_names != other.feature_names {
            return Err(LandshiftError::InvalidConfig(
                "cannot merge training sets with different features".into(),
            ));
        }
        self.samples.extend(other.samples);
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Number of samples per class code.
    pub fn class_counts(&self) -> BTreeMap<u8, usize> {
        let mut counts = BTreeMap::new();
        for sample in &self.samples {
            *counts.entry(sample.class).or_insert(0) += 1;
        }
        counts
    }
}

/// Extract band values under each label.
///
/// Labels not touching `region` are dropped. Labels whose pixels are all
/// outside the image or all no-data yield no row; they are never zero-filled.
pub fn sample_labels(
    image: &RasterImage,
    labels: &[LabeledFeature],
    params: &SamplingParams,
    region: Option<&Region>,
) -> Result<TrainingSet> {
    let feature_names = if params.feature_bands.is_empty() {
        image.band_names()
    } else {
        params.feature_bands.clone()
    };
    let bands = feature_names
        .iter()
        .map(|name| image.band(name))
        .collect::<Result<Vec<_>>>()?;

    let mut set = TrainingSet::new(feature_names);
    let mut outside_region = 0usize;
    let mut unusable = 0usize;

    for label in labels {
        if let Some(region) = region {
            if !label.geometry.intersects_region(region) {
                outside_region += 1;
                continue;
            }
        }
        let pixels = label.geometry.pixels(&image.transform, image.dim());
        let rows = match (&label.geometry, params.mode) {
            (LabelGeometry::Polygon(_), SamplingMode::RegionMean) => {
                region_mean(&bands, &pixels).into_iter().collect()
            }
            _ => pixels
                .iter()
                .filter_map(|&(row, col)| pixel_vector(&bands, row, col))
                .collect::<Vec<_>>(),
        };
        if rows.is_empty() {
            unusable += 1;
            continue;
        }
        for features in rows {
            set.push(LabeledSample {
                class: label.class,
                features,
                geometry: label.geometry.clone(),
            })?;
        }
    }

    if unusable > 0 {
        warn!(unusable, "Labels without valid pixels were excluded");
    }
    info!(
        labels = labels.len(),
        samples = set.len(),
        outside_region,
        mode = %params.mode,
        "Sampled training labels"
    );
    Ok(set)
}

/// Band values at one pixel, `None` if any band is no-data.
fn pixel_vector(bands: &[&Array2<f32>], row: usize, col: usize) -> Option<Vec<f32>> {
    let mut values = Vec::with_capacity(bands.len());
    for band in bands {
        let v = band[[row, col]];
        if v.is_nan() {
            return None;
        }
        values.push(v);
    }
    Some(values)
}

/// Per-band mean over `pixels`, skipping no-data. `None` if any band has no
/// valid pixel.
fn region_mean(bands: &[&Array2<f32>], pixels: &[(usize, usize)]) -> Option<Vec<f32>> {
    let mut means = Vec::with_capacity(bands.len());
    for band in bands {
        let mut sum = 0.0f64;
        let mut count = 0usize;
        for &(row, col) in pixels {
            let v = band[[row, col]];
            if !v.is_nan() {
                sum += v as f64;
                count += 1;
            }
        }
        if count == 0 {
            return None;
        }
        means.push((sum / count as f64) as f32);
    }
    Some(means)
}
